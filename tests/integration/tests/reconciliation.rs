//! Integration test: webhook bodies and status checks through the engine.
//!
//! Raw bodies are normalized with paygate-core and dispatched through
//! paygate-engine against the in-process fakes.

use paygate_core::webhook::{normalize, EVENT_CHECKOUT_COMPLETED, EVENT_PAYMENT_CREATED};
use paygate_core::{AuditKind, RequestContext, TransactionStatus};
use paygate_engine::fakes::{GatewayOp, LedgerOp};
use paygate_engine::{Decision, IgnoreReason, ReconcileError};
use paygate_integration_tests::*;

fn ctx() -> RequestContext {
    RequestContext::with_request_id("it-0001")
}

async fn deliver(
    engine: &paygate_engine::ReconciliationEngine,
    body: &[u8],
) -> Result<paygate_engine::Reconciliation, ReconcileError> {
    let webhook = normalize(body).expect("body should normalize");
    engine.handle_normalized(&ctx(), webhook).await
}

// =========================================================================
// Worked examples
// =========================================================================

#[tokio::test]
async fn test_matching_webhook_settles_pending_transaction() {
    let (fakes, engine) = engine(false);
    fakes.ledger.insert(ledger_tx(REF, 18500, TransactionStatus::Pending));

    let result = deliver(&engine, &session_webhook(REF, "OK", 18500))
        .await
        .unwrap();

    assert!(matches!(
        result.decision,
        Decision::Updated {
            status: TransactionStatus::Valid,
            amount_mismatch: false,
            status_unsettled: false
        }
    ));
    let tx = fakes.ledger.get(REF).unwrap();
    assert_eq!(tx.status, TransactionStatus::Valid);
    assert!(tx.comment.contains(PAY_ID));
    assert_eq!(tx.effective_date, today());
    assert_eq!(fakes.audit.count(AuditKind::Success), 1);
    assert_eq!(fakes.audit.count(AuditKind::Warning), 0);
    assert!(fakes.notifier.calls().is_empty());
}

#[tokio::test]
async fn test_amount_difference_overwrites_and_keeps_pending() {
    let (fakes, engine) = engine(false);
    fakes.ledger.insert(ledger_tx(REF, 22500, TransactionStatus::Pending));

    let result = deliver(&engine, &session_webhook(REF, "OK", 18500))
        .await
        .unwrap();

    assert!(result.decision.is_conflict());
    let tx = fakes.ledger.get(REF).unwrap();
    assert_eq!(tx.amount.gross_cent, 18500);
    assert_eq!(tx.amount.currency, "EUR");
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert_eq!(fakes.audit.count(AuditKind::Warning), 1);
    assert_eq!(
        fakes.notifier.statuses(),
        vec!["amount-difference-kept-pending-please-check".to_string()]
    );
}

#[tokio::test]
async fn test_status_check_on_settled_transaction_changes_nothing() {
    let (fakes, engine) = engine(true);
    let before = ledger_tx(REF, 18500, TransactionStatus::Valid);
    fakes.ledger.insert(before.clone());
    fakes.gateway.insert(gateway_state(REF, "OK", 18500));

    let result = engine.check_payment_status(&ctx(), REF).await.unwrap();

    assert_eq!(
        result.decision,
        Decision::AlreadySettled {
            status: TransactionStatus::Valid
        }
    );
    let payment = result.payment.expect("status check echoes the gateway state");
    assert_eq!(payment.status, "OK");
    assert_eq!(payment.amount_paid, 18500);

    assert_eq!(fakes.ledger.calls(), vec![(LedgerOp::Get, REF.to_string())]);
    assert_eq!(fakes.ledger.get(REF).unwrap(), before);
    assert_eq!(fakes.audit.count(AuditKind::Warning), 1);
    assert_eq!(fakes.notifier.calls().len(), 1);
}

// =========================================================================
// Properties
// =========================================================================

#[tokio::test]
async fn test_second_delivery_is_a_warning_not_an_error() {
    let (fakes, engine) = engine(false);
    fakes.ledger.insert(ledger_tx(REF, 18500, TransactionStatus::Pending));
    let body = session_webhook(REF, "OK", 18500);

    deliver(&engine, &body).await.unwrap();
    let after_first = fakes.ledger.get(REF).unwrap();
    let second = deliver(&engine, &body).await.unwrap();

    assert!(matches!(second.decision, Decision::AlreadySettled { .. }));
    assert_eq!(fakes.ledger.get(REF).unwrap(), after_first);
    assert_eq!(fakes.ledger.writes(), 1);
    assert_eq!(fakes.audit.count(AuditKind::Error), 0);
    assert_eq!(fakes.audit.count(AuditKind::Warning), 1);
}

#[tokio::test]
async fn test_mismatch_never_settles() {
    let pairs = [(18500, 22500), (22500, 18500), (1, 0), (100, 101)];
    for (ledger_cents, gateway_cents) in pairs {
        let (fakes, engine) = engine(false);
        fakes
            .ledger
            .insert(ledger_tx(REF, ledger_cents, TransactionStatus::Pending));

        deliver(&engine, &session_webhook(REF, "OK", gateway_cents))
            .await
            .unwrap();

        let tx = fakes.ledger.get(REF).unwrap();
        assert_eq!(
            tx.status,
            TransactionStatus::Pending,
            "ledger {} vs gateway {}",
            ledger_cents,
            gateway_cents
        );
        assert_eq!(tx.amount.gross_cent, gateway_cents);
    }
}

#[tokio::test]
async fn test_valid_is_never_rewritten() {
    for status in ["OK", "AUTHORIZED"] {
        let (fakes, engine) = engine(false);
        fakes.ledger.insert(ledger_tx(REF, 22500, TransactionStatus::Valid));

        deliver(&engine, &session_webhook(REF, status, 18500))
            .await
            .unwrap();

        let tx = fakes.ledger.get(REF).unwrap();
        assert_eq!(tx.status, TransactionStatus::Valid);
        assert_eq!(tx.amount.gross_cent, 22500);
        assert_eq!(fakes.ledger.writes(), 0);
    }
}

#[tokio::test]
async fn test_authorized_payment_stays_pending() {
    let (fakes, engine) = engine(true);
    fakes.ledger.insert(ledger_tx(REF, 18500, TransactionStatus::Tentative));
    fakes.gateway.insert(gateway_state(REF, "AUTHORIZED", 18500));

    deliver(&engine, &session_webhook(REF, "OK", 18500))
        .await
        .unwrap();

    assert_eq!(fakes.ledger.get(REF).unwrap().status, TransactionStatus::Pending);
    assert_eq!(
        fakes.notifier.statuses(),
        vec!["upstream-status-not-OK-kept-pending-please-check".to_string()]
    );
}

#[tokio::test]
async fn test_webhook_claims_are_checked_against_gateway() {
    let (fakes, engine) = engine(true);
    fakes.ledger.insert(ledger_tx(REF, 18500, TransactionStatus::Pending));
    // the body claims the full amount, the gateway only knows a smaller one
    fakes.gateway.insert(gateway_state(REF, "OK", 100));

    deliver(&engine, &session_webhook(REF, "OK", 18500))
        .await
        .unwrap();

    assert_eq!(fakes.gateway.call_count(GatewayOp::Query), 1);
    let tx = fakes.ledger.get(REF).unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert_eq!(tx.amount.gross_cent, 100);
}

#[tokio::test]
async fn test_forged_ok_is_not_trusted_over_gateway() {
    let (fakes, engine) = engine(true);
    fakes.ledger.insert(ledger_tx(REF, 18500, TransactionStatus::Pending));
    fakes.gateway.insert(gateway_state(REF, "CANCELLED", 18500));

    let result = deliver(&engine, &session_webhook(REF, "OK", 18500))
        .await
        .unwrap();

    assert_eq!(
        result.decision,
        Decision::Ignored(IgnoreReason::UnsupportedStatus("CANCELLED".into()))
    );
    assert!(fakes.ledger.calls().is_empty());
    assert_eq!(fakes.ledger.writes(), 0);
    assert_eq!(
        fakes.notifier.statuses(),
        vec!["unexpected-status-CANCELLED".to_string()]
    );
}

#[tokio::test]
async fn test_status_check_without_capture_never_settles() {
    let (fakes, engine) = engine(true);
    fakes.ledger.insert(ledger_tx(REF, 18500, TransactionStatus::Pending));
    let mut state = gateway_state(REF, "OK", 18500);
    state.response_code = "99999999".into();
    state.captured = None;
    fakes.gateway.insert(state);

    let result = engine.check_payment_status(&ctx(), REF).await.unwrap();

    assert!(result.decision.is_conflict());
    let tx = fakes.ledger.get(REF).unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert_eq!(tx.amount.gross_cent, 18500);
    let payment = result.payment.expect("status check echoes the gateway state");
    assert_eq!(payment.amount_paid, 0);
}

// =========================================================================
// Recovery
// =========================================================================

#[tokio::test]
async fn test_missing_transaction_is_recovered_as_pending() {
    let (fakes, engine) = engine(false);

    let result = deliver(&engine, &session_webhook(REF, "OK", 18500))
        .await
        .unwrap();

    assert_eq!(result.decision, Decision::Recovered);
    assert_eq!(fakes.ledger.len(), 1);
    let tx = fakes.ledger.get(REF).unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert_eq!(tx.debitor_id, 1);
    assert_eq!(tx.amount.gross_cent, 18500);
    assert_eq!(fakes.notifier.calls().len(), 1);
}

#[tokio::test]
async fn test_unattributable_payment_creates_nothing() {
    let (fakes, engine) = engine(false);
    let reference_id = "EF1995-ABC-221216-122218-4132";

    let result = deliver(&engine, &session_webhook(reference_id, "OK", 18500))
        .await
        .unwrap();

    assert_eq!(result.decision, Decision::Unattributable);
    assert!(fakes.ledger.is_empty());
    assert_eq!(fakes.audit.count(AuditKind::Error), 1);
    assert_eq!(
        fakes.notifier.statuses(),
        vec!["parse-refid-err".to_string()]
    );
}

// =========================================================================
// Gates and schema variants
// =========================================================================

#[tokio::test]
async fn test_foreign_tenant_is_ignored() {
    let (fakes, engine) = engine(false);
    let foreign = "XY2000-000001-221216-122218-4132";

    let result = deliver(&engine, &session_webhook(foreign, "OK", 18500))
        .await
        .unwrap();

    assert_eq!(result.decision, Decision::Ignored(IgnoreReason::TenantMismatch));
    assert!(fakes.ledger.calls().is_empty());
    assert_eq!(fakes.notifier.statuses(), vec!["ref-id-prefix-mismatch".to_string()]);
}

#[tokio::test]
async fn test_checkout_completion_settles_transaction() {
    let (fakes, engine) = engine(false);
    fakes.ledger.insert(ledger_tx(REF, 18500, TransactionStatus::Pending));

    deliver(&engine, &checkout_webhook(EVENT_CHECKOUT_COMPLETED, REF, "18500"))
        .await
        .unwrap();

    assert_eq!(fakes.ledger.get(REF).unwrap().status, TransactionStatus::Valid);
}

#[tokio::test]
async fn test_checkout_notice_only_audits() {
    let (fakes, engine) = engine(false);
    fakes.ledger.insert(ledger_tx(REF, 18500, TransactionStatus::Pending));

    let result = deliver(&engine, &checkout_webhook(EVENT_PAYMENT_CREATED, REF, "18500"))
        .await
        .unwrap();

    assert!(matches!(
        result.decision,
        Decision::Ignored(IgnoreReason::Notice(_))
    ));
    assert!(fakes.ledger.calls().is_empty());
    assert_eq!(fakes.audit.count(AuditKind::Success), 1);
    assert!(fakes.notifier.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_checkout_event_escalates() {
    let (fakes, engine) = engine(false);

    let result = deliver(&engine, &checkout_webhook("payment.refund.completed", REF, "18500"))
        .await
        .unwrap();

    assert!(matches!(
        result.decision,
        Decision::Ignored(IgnoreReason::UnexpectedEvent(_))
    ));
    assert!(fakes.ledger.calls().is_empty());
    assert_eq!(fakes.notifier.statuses(), vec!["unexpected-event".to_string()]);
}

#[tokio::test]
async fn test_malformed_body_is_rejected_before_engine() {
    assert!(normalize(b"{not json").is_err());
    assert!(normalize(br#"{"event": 7}"#).is_err());
}
