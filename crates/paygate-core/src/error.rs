/// Core domain errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid reference id: {0}")]
    InvalidReferenceId(String),

    #[error("cannot parse debitor id from reference id {reference_id}: {reason}")]
    InvalidDebitorId {
        reference_id: String,
        reason: String,
    },

    #[error("unrecognized webhook payload: {0}")]
    UnrecognizedWebhook(String),

    #[error("malformed webhook payload: {0}")]
    MalformedWebhook(#[from] serde_json::Error),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}
