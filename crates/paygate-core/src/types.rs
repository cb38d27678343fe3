use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Gateway status reported for a fully settled payment.
pub const STATUS_OK: &str = "OK";
/// Gateway status reported for an authorized but not yet settled payment.
pub const STATUS_AUTHORIZED: &str = "AUTHORIZED";
/// Placeholder status used when the gateway could not be asked.
pub const STATUS_UNKNOWN: &str = "UNKNOWN";
/// Gateway response code of a successfully processed payment.
pub const RESPONSE_CODE_OK: &str = "00000000";

/// Whether a gateway status is one the engine knows how to reconcile.
pub fn is_recognized_status(status: &str) -> bool {
    status == STATUS_OK || status == STATUS_AUTHORIZED
}

/// Whether a gateway status allows promoting a ledger transaction to `valid`.
pub fn is_settled_status(status: &str) -> bool {
    status == STATUS_OK
}

/// An amount in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Value in the smallest unit of the currency (cents).
    pub value: i64,
    /// ISO 4217 currency code.
    pub currency: String,
}

impl Money {
    pub fn new(value: i64, currency: impl Into<String>) -> Self {
        Self {
            value,
            currency: currency.into(),
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.currency)
    }
}

/// Lifecycle status of a ledger transaction.
///
/// `Valid` is terminal for reconciliation: nothing in the engine demotes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Tentative,
    Valid,
}

impl TransactionStatus {
    /// Whether a reconciliation may still write to a transaction in this status.
    pub fn is_updatable(&self) -> bool {
        matches!(self, Self::Pending | Self::Tentative)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Tentative => write!(f, "tentative"),
            Self::Valid => write!(f, "valid"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    #[default]
    Payment,
    Due,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Credit,
    Paypal,
    Transfer,
    Internal,
    Gift,
}

/// Amount block of a ledger transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerAmount {
    pub gross_cent: i64,
    pub currency: String,
    /// VAT rate in percent.
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub vat_rate: Decimal,
}

impl LedgerAmount {
    /// Whether gross value and currency equal the given money.
    pub fn matches(&self, money: &Money) -> bool {
        self.gross_cent == money.value && self.currency == money.currency
    }
}

/// A financial transaction as owned by the ledger (payment service).
///
/// The reference id doubles as the correlation key with the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    #[serde(rename = "transaction_identifier")]
    pub id: String,
    pub debitor_id: u32,
    #[serde(rename = "transaction_type", default)]
    pub kind: TransactionType,
    #[serde(default)]
    pub method: PaymentMethod,
    pub amount: LedgerAmount,
    #[serde(default)]
    pub comment: String,
    pub status: TransactionStatus,
    pub effective_date: NaiveDate,
    pub due_date: NaiveDate,
}

impl LedgerTransaction {
    /// Append a line to the free-text comment.
    pub fn append_comment(&mut self, line: &str) {
        if self.comment.is_empty() {
            self.comment = line.to_string();
        } else {
            self.comment = format!("{}; {}", self.comment, line);
        }
    }
}

/// Point-in-time view of a payment as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayPaymentState {
    /// Gateway-assigned payment id.
    pub pay_id: String,
    /// Our reference id.
    pub trans_id: String,
    pub status: String,
    #[serde(default)]
    pub response_code: String,
    #[serde(default)]
    pub response_description: String,
    /// Verified amount.
    pub amount: Money,
    /// Amount actually captured, if the gateway reports it.
    #[serde(default)]
    pub captured: Option<i64>,
    #[serde(default)]
    pub payment_method: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tx(status: TransactionStatus) -> LedgerTransaction {
        LedgerTransaction {
            id: "EF1995-000001-221216-122218-4132".into(),
            debitor_id: 1,
            kind: TransactionType::Payment,
            method: PaymentMethod::Credit,
            amount: LedgerAmount {
                gross_cent: 18500,
                currency: "EUR".into(),
                vat_rate: dec!(19.0),
            },
            comment: String::new(),
            status,
            effective_date: NaiveDate::from_ymd_opt(2022, 12, 10).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2022, 12, 10).unwrap(),
        }
    }

    #[test]
    fn test_status_recognition() {
        assert!(is_recognized_status("OK"));
        assert!(is_recognized_status("AUTHORIZED"));
        assert!(!is_recognized_status("FAILED"));
        assert!(!is_recognized_status("ok"));
        assert!(is_settled_status("OK"));
        assert!(!is_settled_status("AUTHORIZED"));
        assert!(!is_settled_status(STATUS_UNKNOWN));
    }

    #[test]
    fn test_updatable_statuses() {
        assert!(TransactionStatus::Pending.is_updatable());
        assert!(TransactionStatus::Tentative.is_updatable());
        assert!(!TransactionStatus::Valid.is_updatable());
    }

    #[test]
    fn test_append_comment() {
        let mut t = tx(TransactionStatus::Pending);
        t.append_comment("CC paymentId abc - status OK");
        assert_eq!(t.comment, "CC paymentId abc - status OK");
        t.append_comment("CC paymentId def - status OK");
        assert_eq!(
            t.comment,
            "CC paymentId abc - status OK; CC paymentId def - status OK"
        );
    }

    #[test]
    fn test_ledger_json_shape() {
        let json = serde_json::to_value(tx(TransactionStatus::Tentative)).unwrap();
        assert_eq!(json["transaction_identifier"], "EF1995-000001-221216-122218-4132");
        assert_eq!(json["transaction_type"], "payment");
        assert_eq!(json["status"], "tentative");
        assert_eq!(json["amount"]["vat_rate"], 19.0);
        assert_eq!(json["effective_date"], "2022-12-10");
    }

    #[test]
    fn test_ledger_amount_matches() {
        let t = tx(TransactionStatus::Pending);
        assert!(t.amount.matches(&Money::new(18500, "EUR")));
        assert!(!t.amount.matches(&Money::new(18500, "USD")));
        assert!(!t.amount.matches(&Money::new(22500, "EUR")));
    }
}
