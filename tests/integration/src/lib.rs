//! Fixtures shared by the cross-crate tests in `tests/`.

use chrono::NaiveDate;
use paygate_core::{
    GatewayPaymentState, LedgerAmount, LedgerTransaction, Money, PaymentMethod, ReconcileConfig,
    TransactionStatus, TransactionType,
};
use paygate_engine::fakes::Fakes;
use paygate_engine::ReconciliationEngine;
use rust_decimal::Decimal;

pub const TENANT: &str = "EF1995";
pub const REF: &str = "EF1995-000001-221216-122218-4132";
pub const PAY_ID: &str = "pay-18500";

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 8).unwrap_or_default()
}

pub fn config(gateway_configured: bool) -> ReconcileConfig {
    ReconcileConfig {
        tenant_prefix: TENANT.into(),
        gateway_configured,
        ..ReconcileConfig::default()
    }
}

/// Fresh fakes plus an engine wired to them.
pub fn engine(gateway_configured: bool) -> (Fakes, ReconciliationEngine) {
    let fakes = Fakes::new(today());
    let engine = ReconciliationEngine::new(&fakes.collaborators(), config(gateway_configured));
    (fakes, engine)
}

pub fn ledger_tx(reference_id: &str, gross_cent: i64, status: TransactionStatus) -> LedgerTransaction {
    let booked = NaiveDate::from_ymd_opt(2022, 12, 16).unwrap_or_default();
    LedgerTransaction {
        id: reference_id.into(),
        debitor_id: 1,
        kind: TransactionType::Payment,
        method: PaymentMethod::Credit,
        amount: LedgerAmount {
            gross_cent,
            currency: "EUR".into(),
            vat_rate: Decimal::new(19, 0),
        },
        comment: String::new(),
        status,
        effective_date: booked,
        due_date: booked,
    }
}

pub fn gateway_state(reference_id: &str, status: &str, value: i64) -> GatewayPaymentState {
    GatewayPaymentState {
        pay_id: PAY_ID.into(),
        trans_id: reference_id.into(),
        status: status.into(),
        response_code: "00000000".into(),
        response_description: String::new(),
        amount: Money::new(value, "EUR"),
        captured: Some(value),
        payment_method: "CARD".into(),
    }
}

/// A webhook body in the session schema.
pub fn session_webhook(reference_id: &str, status: &str, value: i64) -> Vec<u8> {
    serde_json::json!({
        "payId": PAY_ID,
        "transId": reference_id,
        "status": status,
        "responseCode": "00000000",
        "responseDescription": "",
        "amount": {"value": value, "currency": "EUR"},
        "paymentMethods": {"type": "CARD"},
        "creationDate": "2023-01-08T10:00:00Z",
        "someFieldWeDoNotKnow": true
    })
    .to_string()
    .into_bytes()
}

/// A webhook body in the checkout-envelope schema; amounts arrive as strings.
pub fn checkout_webhook(event: &str, reference_id: &str, amount: &str) -> Vec<u8> {
    serde_json::json!({
        "id": "wh-0001",
        "event": event,
        "timestamp": "2023-01-08T10:00:00Z",
        "data": {
            "paymentId": PAY_ID,
            "order": {
                "reference": reference_id,
                "amount": {"amount": amount, "currency": "EUR"}
            }
        }
    })
    .to_string()
    .into_bytes()
}
