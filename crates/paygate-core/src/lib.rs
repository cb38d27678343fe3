//! Paygate core types.
//!
//! Ledger transactions, gateway payment snapshots, webhook events and audit
//! entries, plus the reference-id grammar, request validation and the
//! versioned webhook-schema normalization layer. Nothing in this crate
//! performs I/O.

pub mod audit;
pub mod config;
pub mod error;
pub mod gateway;
pub mod paylink;
pub mod reference;
pub mod types;
pub mod webhook;

pub use audit::{AuditEntry, AuditKind, RequestContext};
pub use config::ReconcileConfig;
pub use error::CoreError;
pub use gateway::{CreatePaymentRequest, CreatedPaymentLink};
pub use paylink::{FieldErrors, PaymentLink, PaymentLinkRequest, PaymentSummary, VatSplit};
pub use reference::ReferenceId;
pub use types::{
    GatewayPaymentState, LedgerAmount, LedgerTransaction, Money, PaymentMethod,
    TransactionStatus, TransactionType,
};
pub use webhook::{NormalizedWebhook, SchemaVersion, WebhookEvent};
