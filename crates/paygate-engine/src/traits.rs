use async_trait::async_trait;
use paygate_core::{
    AuditEntry, CreatePaymentRequest, CreatedPaymentLink, GatewayPaymentState, LedgerTransaction,
    Money,
};
use serde::{Deserialize, Serialize};

use crate::error::{AttendeeError, AuditError, GatewayError, LedgerError, NotifyError};

/// Outbound capability towards the card-payment gateway.
///
/// Implemented by the HTTP client in the node and by the in-process
/// simulator. Both are injected at construction time.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Create a hosted payment page for the given request.
    async fn create_payment_link(
        &self,
        request: &CreatePaymentRequest,
    ) -> Result<CreatedPaymentLink, GatewayError>;

    /// Fetch the current state of a payment by reference id.
    ///
    /// Must return [`GatewayError::NotFound`] for unknown ids so callers can
    /// tell it apart from an unreachable gateway.
    async fn query_payment_link(&self, reference_id: &str)
        -> Result<GatewayPaymentState, GatewayError>;

    /// Cancel an open payment link. `amount` is the amount still open.
    async fn delete_payment_link(&self, reference_id: &str, amount: &Money)
        -> Result<(), GatewayError>;

    /// Short identifier for logs (e.g. "gw-http", "gw-simulator").
    fn gateway_id(&self) -> &str;
}

/// Outbound capability towards the ledger (payment service).
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn get_transaction_by_reference_id(
        &self,
        reference_id: &str,
    ) -> Result<LedgerTransaction, LedgerError>;

    async fn add_transaction(&self, tx: &LedgerTransaction) -> Result<(), LedgerError>;

    async fn update_transaction(&self, tx: &LedgerTransaction) -> Result<(), LedgerError>;
}

/// Best-effort operator notification (escalation mail).
#[async_trait]
pub trait NotificationClient: Send + Sync {
    async fn notify(
        &self,
        operation: &str,
        reference_id: &str,
        status: &str,
    ) -> Result<(), NotifyError>;
}

/// Append-only sink for decision records.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, entry: AuditEntry) -> Result<(), AuditError>;
}

/// Contact details of a debitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub id: u32,
    pub email: String,
    /// Locale such as `en-US`.
    #[serde(default)]
    pub language: String,
}

/// Lookup of debitor contact details.
#[async_trait]
pub trait AttendeeClient: Send + Sync {
    async fn get_attendee(&self, debitor_id: u32) -> Result<Attendee, AttendeeError>;
}
