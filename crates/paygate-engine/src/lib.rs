//! Paygate reconciliation engine.
//!
//! Decides how a gateway notification or a manual status check translates
//! into ledger mutations, and issues payment links. All outbound effects go
//! through the capability traits in [`traits`], injected via [`Collaborators`].

pub mod adapters;
pub mod clock;
pub mod engine;
pub mod error;
pub mod fakes;
pub mod orchestrator;
pub mod trail;
pub mod traits;

pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::{Collaborators, Decision, IgnoreReason, Reconciliation, ReconciliationEngine};
pub use error::{
    AttendeeError, AuditError, ErrorKind, GatewayError, LedgerError, NotifyError, ReconcileError,
};
pub use orchestrator::PaymentLinkOrchestrator;
pub use trail::DecisionTrail;
pub use traits::{Attendee, AttendeeClient, AuditLog, GatewayClient, LedgerClient, NotificationClient};
