//! Shared state handed to every HTTP handler.

use std::sync::Arc;

use paygate_engine::adapters::SimulatorGateway;
use paygate_engine::{PaymentLinkOrchestrator, ReconciliationEngine};

pub struct AppState {
    pub engine: ReconciliationEngine,
    pub orchestrator: PaymentLinkOrchestrator,
    /// Present only when no real gateway is configured.
    pub simulator: Option<Arc<SimulatorGateway>>,
    /// First token every reference id on the HTTP surface must carry.
    pub tenant_prefix: String,
    pub api_token: String,
    pub webhook_secret: String,
    /// Write raw webhook bodies to the log and the audit trail.
    pub full_requests: bool,
}
