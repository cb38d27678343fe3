use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Severity class of an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditKind {
    /// Verbatim inbound or outbound payload.
    Raw,
    Success,
    Warning,
    Error,
}

impl fmt::Display for AuditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => write!(f, "raw"),
            Self::Success => write!(f, "success"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One append-only record of an externally visible decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub reference_id: String,
    /// Gateway-assigned payment id, empty if unknown.
    pub api_id: String,
    pub kind: AuditKind,
    pub message: String,
    pub details: String,
    pub request_id: String,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        ctx: &RequestContext,
        kind: AuditKind,
        reference_id: impl Into<String>,
        api_id: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            reference_id: reference_id.into(),
            api_id: api_id.into(),
            kind,
            message: message.into(),
            details: details.into(),
            request_id: ctx.request_id.clone(),
            recorded_at: Utc::now(),
        }
    }

    /// Raw payload dumps are not decisions.
    pub fn is_decision(&self) -> bool {
        self.kind != AuditKind::Raw
    }
}

/// Per-request values threaded through every call chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
}

impl RequestContext {
    /// A context with a fresh, time-ordered request id.
    pub fn new() -> Self {
        Self {
            request_id: Uuid::now_v7().to_string(),
        }
    }

    pub fn with_request_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
