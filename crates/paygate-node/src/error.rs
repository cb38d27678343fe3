//! HTTP error mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use paygate_core::{CoreError, FieldErrors, PaymentSummary};
use paygate_engine::ReconcileError;
use serde::Serialize;

/// Errors surfaced by the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("paylink request body could not be parsed: {0}")]
    ParseError(String),

    #[error("paylink request failed validation")]
    InvalidData(FieldErrors),

    #[error("invalid reference id '{0}'")]
    InvalidReferenceId(String),

    #[error("reference id {0} not found")]
    NotFound(String),

    #[error("payment {reference_id} cannot be updated: {message}")]
    Conflict {
        reference_id: String,
        message: String,
        payment: Option<Box<PaymentSummary>>,
    },

    #[error("downstream error: {0}")]
    Downstream(String),

    #[error("downstream not configured: {0}")]
    NotConfigured(String),

    #[error("webhook body could not be parsed: {0}")]
    WebhookParse(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("{0}")]
    Unattributable(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ParseError(_)
            | ApiError::InvalidData(_)
            | ApiError::InvalidReferenceId(_)
            | ApiError::WebhookParse(_)
            | ApiError::Unattributable(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Downstream(_) | ApiError::NotConfigured(_) => StatusCode::BAD_GATEWAY,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::ParseError(_) => "paylink.parse.error",
            ApiError::InvalidData(_) => "paylink.data.invalid",
            ApiError::InvalidReferenceId(_) => "payment.refid.invalid",
            ApiError::NotFound(_) => "payment.refid.notfound",
            ApiError::Conflict { .. } => "payment.update.conflict",
            ApiError::Downstream(_) => "paylink.downstream.error",
            ApiError::NotConfigured(_) => "paylink.downstream.noconfig",
            ApiError::WebhookParse(_) => "webhook.parse.error",
            ApiError::Unauthorized(_) => "auth.unauthorized",
            ApiError::Unattributable(_) => "payment.refid.unattributable",
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::InvalidData(errs) => serde_json::to_value(errs).ok(),
            ApiError::Conflict {
                payment: Some(payment),
                ..
            } => serde_json::to_value(payment).ok(),
            _ => None,
        }
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        ApiError::Unauthorized(reason.into())
    }

    /// Map an engine error for a given reference id.
    pub fn from_reconcile(reference_id: &str, err: ReconcileError) -> Self {
        match err {
            ReconcileError::NotFound(_) => ApiError::NotFound(reference_id.to_string()),
            ReconcileError::Downstream(msg) => ApiError::Downstream(msg),
            ReconcileError::Validation(msg) => ApiError::Unattributable(msg),
            ReconcileError::NotConfigured(what) => ApiError::NotConfigured(what),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidReferenceId(id) => ApiError::InvalidReferenceId(id),
            CoreError::UnrecognizedWebhook(_)
            | CoreError::MalformedWebhook(_)
            | CoreError::InvalidAmount(_) => ApiError::WebhookParse(err.to_string()),
            other => ApiError::ParseError(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paygate_engine::GatewayError;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::InvalidReferenceId("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::NotConfigured("gateway".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::unauthorized("no token").error_code(),
            "auth.unauthorized"
        );
    }

    #[test]
    fn test_from_reconcile() {
        let err = ApiError::from_reconcile("REF", GatewayError::NotFound("REF".into()).into());
        assert_eq!(err.error_code(), "payment.refid.notfound");

        let err = ApiError::from_reconcile("REF", GatewayError::NotConfigured.into());
        assert_eq!(err.error_code(), "paylink.downstream.noconfig");
    }

    #[test]
    fn test_invalid_data_details() {
        let mut errs = FieldErrors::new();
        errs.add("currency", "currency must be EUR");
        let err = ApiError::InvalidData(errs);
        let details = err.details().unwrap();
        assert_eq!(details["currency"][0], "currency must be EUR");
    }

    #[test]
    fn test_webhook_parse_from_core() {
        let err: ApiError = CoreError::UnrecognizedWebhook("nope".into()).into();
        assert_eq!(err.error_code(), "webhook.parse.error");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
