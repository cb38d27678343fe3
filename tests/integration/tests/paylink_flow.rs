//! Integration test: payment link lifecycle against the in-process simulator.
//!
//! Orchestrator creates a link, the simulator plays the payer and the gateway,
//! and the engine reconciles the resulting webhook into the memory ledger.

use std::sync::Arc;

use paygate_core::{
    AuditKind, NormalizedWebhook, PaymentLinkRequest, ReconcileConfig, RequestContext,
    TransactionStatus,
};
use paygate_engine::adapters::{LogNotifier, MemoryAttendees, MemoryAuditLog, MemoryLedger, SimulatorGateway};
use paygate_engine::{
    Attendee, Collaborators, Decision, ErrorKind, FixedClock, IgnoreReason,
    PaymentLinkOrchestrator, ReconciliationEngine,
};
use paygate_integration_tests::{ledger_tx, today, REF, TENANT};
use rust_decimal_macros::dec;

struct Deployment {
    simulator: Arc<SimulatorGateway>,
    ledger: Arc<MemoryLedger>,
    audit: Arc<MemoryAuditLog>,
    orchestrator: PaymentLinkOrchestrator,
    engine: ReconciliationEngine,
}

/// The wiring a node uses when no gateway or downstream service is configured,
/// except that status checks are allowed against the simulator.
fn deployment() -> Deployment {
    let simulator = Arc::new(SimulatorGateway::new("http://localhost:9097"));
    let ledger = Arc::new(MemoryLedger::new());
    let audit = Arc::new(MemoryAuditLog::new());
    let attendees = Arc::new(MemoryAttendees::new());
    attendees.insert(Attendee {
        id: 1,
        email: "jsquirrel@example.com".into(),
        language: "en-US".into(),
    });

    let collaborators = Collaborators {
        gateway: simulator.clone(),
        ledger: ledger.clone(),
        notifier: Arc::new(LogNotifier),
        audit: audit.clone(),
        attendees,
        clock: Arc::new(FixedClock(today())),
    };
    let config = ReconcileConfig {
        tenant_prefix: TENANT.into(),
        gateway_configured: true,
        webhook_url: "http://localhost:9097/api/rest/v1/webhook/s3cr3t".into(),
        ..ReconcileConfig::default()
    };

    Deployment {
        orchestrator: PaymentLinkOrchestrator::new(&collaborators, config.clone()),
        engine: ReconciliationEngine::new(&collaborators, config),
        simulator,
        ledger,
        audit,
    }
}

fn request() -> PaymentLinkRequest {
    PaymentLinkRequest {
        reference_id: REF.into(),
        debitor_id: 1,
        amount_due: 18500,
        currency: "EUR".into(),
        vat_rate: dec!(19),
    }
}

#[tokio::test]
async fn test_link_paid_and_reconciled() {
    let d = deployment();
    let ctx = RequestContext::with_request_id("it-flow-1");
    d.ledger.insert(ledger_tx(REF, 18500, TransactionStatus::Tentative));

    let link = d.orchestrator.create_payment_link(&ctx, &request()).await.unwrap();
    assert_eq!(link.link, format!("http://localhost:9097/simulator/{}", REF));
    assert_eq!(link.amount_paid, 0);

    let event = d.simulator.complete(REF).unwrap();
    let result = d
        .engine
        .handle_normalized(&ctx, NormalizedWebhook::Payment(event))
        .await
        .unwrap();

    assert!(matches!(
        result.decision,
        Decision::Updated {
            status: TransactionStatus::Valid,
            ..
        }
    ));
    let tx = d.ledger.get(REF).unwrap();
    assert_eq!(tx.status, TransactionStatus::Valid);
    assert!(tx.comment.contains("mock-"));

    let summary = d.orchestrator.get_payment(&ctx, REF).await.unwrap();
    assert_eq!(summary.status, "OK");
    assert_eq!(summary.amount_paid, 18500);

    let trail = d.audit.for_reference(REF);
    assert!(trail.iter().all(|e| e.request_id == "it-flow-1"));
    assert!(trail.iter().all(|e| e.kind != AuditKind::Error));
}

#[tokio::test]
async fn test_status_check_recovers_lost_transaction() {
    let d = deployment();
    let ctx = RequestContext::new();

    d.orchestrator.create_payment_link(&ctx, &request()).await.unwrap();
    d.simulator.complete(REF).unwrap();

    // webhook never arrived and the ledger has no record either
    let result = d.engine.check_payment_status(&ctx, REF).await.unwrap();

    assert_eq!(result.decision, Decision::Recovered);
    let tx = d.ledger.get(REF).unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert_eq!(tx.amount.gross_cent, 18500);
    assert_eq!(tx.debitor_id, 1);
}

#[tokio::test]
async fn test_cancelled_link_is_not_reconciled() {
    let d = deployment();
    let ctx = RequestContext::new();
    d.ledger.insert(ledger_tx(REF, 18500, TransactionStatus::Tentative));

    d.orchestrator.create_payment_link(&ctx, &request()).await.unwrap();
    d.orchestrator.cancel_payment_link(&ctx, REF).await.unwrap();

    let result = d.engine.check_payment_status(&ctx, REF).await.unwrap();

    assert!(matches!(
        result.decision,
        Decision::Ignored(IgnoreReason::UnsupportedStatus(_))
    ));
    assert_eq!(d.ledger.get(REF).unwrap().status, TransactionStatus::Tentative);
}

#[tokio::test]
async fn test_invalid_request_never_reaches_gateway() {
    let d = deployment();
    let ctx = RequestContext::new();
    let mut bad = request();
    bad.currency = "USD".into();
    bad.reference_id = "XY2000-000001-221216-122218-4132".into();

    let errs = d.orchestrator.validate_request(&bad).unwrap();
    assert!(errs.contains("currency"));
    assert!(errs.contains("reference_id"));

    let err = d.orchestrator.create_payment_link(&ctx, &bad).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(d.simulator.is_empty());
    assert!(d.audit.entries().is_empty());
}

#[tokio::test]
async fn test_unknown_reference_is_not_found() {
    let d = deployment();
    let ctx = RequestContext::new();

    let err = d.orchestrator.get_payment(&ctx, REF).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = d.engine.check_payment_status(&ctx, REF).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(d.ledger.is_empty());
}
