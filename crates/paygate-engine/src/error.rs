/// Errors reported by a gateway client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("payment not found at gateway: {0}")]
    NotFound(String),

    #[error("gateway unavailable: {0}")]
    Downstream(String),

    #[error("no gateway configured")]
    NotConfigured,
}

/// Errors reported by a ledger client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    #[error("transaction not found: {0}")]
    NotFound(String),

    #[error("ledger unavailable: {0}")]
    Downstream(String),
}

/// Errors reported by an attendee lookup.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AttendeeError {
    #[error("attendee not found: {0}")]
    NotFound(u32),

    #[error("attendee service unavailable: {0}")]
    Downstream(String),
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

#[derive(Debug, Clone, thiserror::Error)]
#[error("audit log write failed: {0}")]
pub struct AuditError(pub String);

/// Coarse error classes, one per row of the error-handling table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Downstream,
    Validation,
    NotConfigured,
}

/// Errors returned by the engine and the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("downstream error: {0}")]
    Downstream(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not configured: {0}")]
    NotConfigured(String),
}

impl ReconcileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Downstream(_) => ErrorKind::Downstream,
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotConfigured(_) => ErrorKind::NotConfigured,
        }
    }

    /// Whether this class of failure warrants an operator escalation.
    pub fn is_escalated(&self) -> bool {
        !matches!(self.kind(), ErrorKind::NotFound | ErrorKind::Validation)
    }
}

impl From<GatewayError> for ReconcileError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound(id) => Self::NotFound(id),
            GatewayError::Downstream(msg) => Self::Downstream(msg),
            GatewayError::NotConfigured => Self::NotConfigured("gateway".into()),
        }
    }
}

impl From<LedgerError> for ReconcileError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(id) => Self::NotFound(id),
            LedgerError::Downstream(msg) => Self::Downstream(msg),
        }
    }
}

impl From<AttendeeError> for ReconcileError {
    fn from(err: AttendeeError) -> Self {
        match err {
            AttendeeError::NotFound(id) => Self::NotFound(format!("attendee {}", id)),
            AttendeeError::Downstream(msg) => Self::Downstream(msg),
        }
    }
}
