//! The adapter service.
//!
//! Chooses a concrete implementation for every collaborator from the
//! configuration, injects them into the engine and the orchestrator, and
//! runs the HTTP API.

use anyhow::Result;
use std::sync::Arc;

use paygate_engine::adapters::{
    JsonlAuditLog, LogNotifier, MemoryAttendees, MemoryAuditLog, MemoryLedger, SimulatorGateway,
};
use paygate_engine::{
    AttendeeClient, AuditLog, Collaborators, GatewayClient, LedgerClient, NotificationClient,
    PaymentLinkOrchestrator, ReconciliationEngine, SystemClock,
};

use crate::clients::{HttpAttendees, HttpGateway, HttpLedger, MailNotifier};
use crate::config::AdapterConfig;
use crate::state::AppState;

pub struct PaygateNode {
    config: AdapterConfig,
    state: Arc<AppState>,
}

impl PaygateNode {
    pub fn new(config: AdapterConfig) -> Result<Self> {
        let state = Arc::new(build_state(&config)?);
        Ok(Self { config, state })
    }

    /// Serve the HTTP API until the listener fails.
    pub async fn run(&self) -> Result<()> {
        let listen_addr = self.config.listen_addr().parse()?;
        crate::api::start_api_server(listen_addr, self.state.clone()).await
    }
}

/// Wire collaborators according to the configuration.
///
/// Every downstream without a configured URL falls back to an in-process
/// implementation, so a bare config still yields a working simulator setup.
pub fn build_state(config: &AdapterConfig) -> Result<AppState> {
    let token = config.security.api_token.as_str();

    let mut simulator = None;
    let gateway: Arc<dyn GatewayClient> = match &config.gateway.base_url {
        Some(base_url) => {
            tracing::info!(%base_url, "using gateway");
            Arc::new(HttpGateway::new(base_url, &config.gateway)?)
        }
        None => {
            tracing::warn!("no gateway configured, using built-in simulator");
            let sim = Arc::new(SimulatorGateway::new(config.service.public_url.clone()));
            simulator = Some(sim.clone());
            sim
        }
    };

    let ledger: Arc<dyn LedgerClient> = if config.service.payment_service_url.is_empty() {
        tracing::warn!("no payment service configured, ledger is kept in memory");
        Arc::new(MemoryLedger::new())
    } else {
        Arc::new(HttpLedger::new(&config.service.payment_service_url, token)?)
    };

    let attendees: Arc<dyn AttendeeClient> = if config.service.attendee_service_url.is_empty() {
        tracing::warn!("no attendee service configured, using placeholder contacts");
        Arc::new(MemoryAttendees::new())
    } else {
        Arc::new(HttpAttendees::new(&config.service.attendee_service_url, token)?)
    };

    let notifier: Arc<dyn NotificationClient> = if config.service.mail_service_url.is_empty() {
        Arc::new(LogNotifier)
    } else {
        Arc::new(MailNotifier::new(
            &config.service.mail_service_url,
            token,
            &config.logging.error_notify_mail,
        )?)
    };

    let audit: Arc<dyn AuditLog> = match &config.audit.path {
        Some(path) => {
            tracing::info!(path = %path.display(), "audit log file");
            Arc::new(JsonlAuditLog::new(path.clone()))
        }
        None => Arc::new(MemoryAuditLog::new()),
    };

    let collaborators = Collaborators {
        gateway,
        ledger,
        notifier,
        audit,
        attendees,
        clock: Arc::new(SystemClock),
    };
    let reconcile_config = config.reconcile_config();

    Ok(AppState {
        engine: ReconciliationEngine::new(&collaborators, reconcile_config.clone()),
        orchestrator: PaymentLinkOrchestrator::new(&collaborators, reconcile_config),
        simulator,
        tenant_prefix: config.service.tenant_prefix.clone(),
        api_token: config.security.api_token.clone(),
        webhook_secret: config.security.webhook_secret.clone(),
        full_requests: config.logging.full_requests,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use paygate_core::{PaymentLinkRequest, RequestContext};
    use rust_decimal_macros::dec;

    fn config() -> AdapterConfig {
        let mut config = AdapterConfig::default();
        config.security.api_token = "api-token".into();
        config.security.webhook_secret = "s3cr3t".into();
        config.service.tenant_prefix = "EF1995".into();
        config
    }

    #[test]
    fn test_bare_config_uses_simulator() {
        let state = build_state(&config()).unwrap();
        assert!(state.simulator.is_some());
        assert_eq!(state.tenant_prefix, "EF1995");
    }

    #[test]
    fn test_configured_gateway_has_no_simulator() {
        let mut config = config();
        config.gateway.base_url = Some("https://gateway.example.com".into());
        config.gateway.merchant_id = "m".into();
        config.gateway.api_key = "k".into();
        config.service.payment_service_url = "http://localhost:9092".into();
        config.service.mail_service_url = "http://localhost:9096".into();
        let state = build_state(&config).unwrap();
        assert!(state.simulator.is_none());
    }

    #[tokio::test]
    async fn test_bare_config_creates_links() {
        let state = build_state(&config()).unwrap();
        let request = PaymentLinkRequest {
            reference_id: "EF1995-000001-221216-122218-4132".into(),
            debitor_id: 1,
            amount_due: 18500,
            currency: "EUR".into(),
            vat_rate: dec!(19),
        };

        let link = state
            .orchestrator
            .create_payment_link(&RequestContext::new(), &request)
            .await
            .unwrap();

        assert!(link.link.starts_with("http://localhost:9097/simulator/"));
        assert_eq!(state.simulator.unwrap().len(), 1);
    }
}
