//! Payment link requests: validation and mapping to and from the gateway.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::ReconcileConfig;
use crate::gateway::{
    CallbackUrls, CreateAmount, CreatePaymentRequest, CustomerInfo, Order, OrderItem,
};
use crate::reference::{debitor_id_of, has_tenant_prefix, ReferenceId};
use crate::types::GatewayPaymentState;

/// The only currency this deployment bills in.
pub const SUPPORTED_CURRENCY: &str = "EUR";
/// Highest accepted VAT rate in percent.
pub const MAX_VAT_PERCENT: i64 = 50;

/// Caller input for creating a payment link. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentLinkRequest {
    /// Caller-chosen reference id, stable before the gateway responds.
    pub reference_id: String,
    pub debitor_id: i64,
    /// Gross amount in cents.
    pub amount_due: i64,
    pub currency: String,
    /// VAT rate in percent.
    pub vat_rate: Decimal,
}

/// Per-field validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Validate a payment link request. Returns `None` when it is acceptable.
pub fn validate_request(data: &PaymentLinkRequest, tenant_prefix: &str) -> Option<FieldErrors> {
    let mut errs = FieldErrors::new();

    if data.debitor_id <= 0 {
        errs.add(
            "debitor_id",
            "field must be a positive integer (the badge number to bill for)",
        );
    }
    if data.amount_due <= 0 {
        errs.add("amount_due", "must be a positive integer (the amount to bill)");
    }
    if data.currency != SUPPORTED_CURRENCY {
        errs.add("currency", "right now, only EUR is supported");
    }
    if data.vat_rate < Decimal::ZERO || data.vat_rate > Decimal::from(MAX_VAT_PERCENT) {
        errs.add(
            "vat_rate",
            "vat rate should be provided in percent and must be between 0.0 and 50.0",
        );
    }

    match ReferenceId::parse(&data.reference_id) {
        Err(_) => errs.add("reference_id", "reference id has invalid format"),
        Ok(id) => {
            if !has_tenant_prefix(id.as_str(), tenant_prefix) {
                errs.add("reference_id", "reference id belongs to a different tenant");
            }
            match debitor_id_of(id.as_str()) {
                Err(_) => errs.add("reference_id", "reference id does not contain a debitor id"),
                Ok(debitor) if i64::from(debitor) != data.debitor_id && data.debitor_id > 0 => {
                    errs.add("reference_id", "reference id names a different debitor")
                }
                Ok(_) => {}
            }
        }
    }

    for field in errs.fields() {
        tracing::debug!(field, "paylink request failed validation");
    }

    if errs.is_empty() {
        None
    } else {
        Some(errs)
    }
}

/// Net / tax split of a gross amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VatSplit {
    pub gross: i64,
    pub net: i64,
    pub tax: i64,
}

impl VatSplit {
    /// Split `gross` (cents) at `vat_rate` percent. The net part is rounded
    /// half away from zero; the tax part takes the remainder so that
    /// `net + tax == gross` always holds.
    pub fn from_gross(gross: i64, vat_rate: Decimal) -> Self {
        let divisor = Decimal::ONE_HUNDRED + vat_rate;
        let net = if divisor <= Decimal::ZERO {
            gross
        } else {
            (Decimal::from(gross) * Decimal::ONE_HUNDRED / divisor)
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_i64()
                .unwrap_or(gross)
        };
        Self {
            gross,
            net,
            tax: gross - net,
        }
    }
}

/// VAT percent to the gateway's basis-point encoding.
pub fn vat_basis_points(vat_rate: Decimal) -> i64 {
    (vat_rate * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or_default()
}

/// Assemble the gateway create call for a validated request.
pub fn build_create_request(
    data: &PaymentLinkRequest,
    email: &str,
    language: &str,
    config: &ReconcileConfig,
) -> CreatePaymentRequest {
    let split = VatSplit::from_gross(data.amount_due, data.vat_rate);
    CreatePaymentRequest {
        trans_id: data.reference_id.clone(),
        amount: CreateAmount {
            value: split.gross,
            currency: data.currency.clone(),
            tax_total: split.tax,
            net_item_total: split.net,
        },
        language: gateway_language(language),
        urls: CallbackUrls {
            return_url: config.success_redirect.clone(),
            cancel: config.failure_redirect.clone(),
            webhook: config.webhook_url.clone(),
        },
        order: Order {
            items: vec![OrderItem {
                name: config.invoice_title.clone(),
                quantity: 1,
                tax_rate: vat_basis_points(data.vat_rate),
                net_price: split.net,
                gross_price: split.gross,
                tax_amount: split.tax,
            }],
        },
        customer_info: CustomerInfo {
            email: email.to_string(),
            merchant_customer_id: data.debitor_id.to_string(),
        },
        channel: "PAYBYLINK".into(),
    }
}

/// Reduce a locale like `en-US` to the two-letter code the hosted page
/// understands. Unknown or empty locales fall back to English.
fn gateway_language(locale: &str) -> String {
    let lang = locale.split(['-', '_']).next().unwrap_or_default();
    if lang.len() == 2 && lang.chars().all(|c| c.is_ascii_alphabetic()) {
        lang.to_ascii_lowercase()
    } else {
        "en".into()
    }
}

/// A created payment link as returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentLink {
    pub title: String,
    pub description: String,
    pub reference_id: String,
    pub purpose: String,
    pub amount_due: i64,
    pub amount_paid: i64,
    pub currency: String,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub vat_rate: Decimal,
    pub link: String,
}

impl PaymentLink {
    pub fn from_created(data: &PaymentLinkRequest, link: String, config: &ReconcileConfig) -> Self {
        Self {
            title: config.invoice_title.clone(),
            description: config.invoice_description.clone(),
            reference_id: data.reference_id.clone(),
            purpose: config.invoice_purpose.clone(),
            amount_due: data.amount_due,
            amount_paid: 0,
            currency: data.currency.clone(),
            vat_rate: data.vat_rate,
            link,
        }
    }
}

/// Flattened view of a gateway payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub id: String,
    pub reference_id: String,
    pub amount_due: i64,
    pub amount_paid: i64,
    pub currency: String,
    pub status: String,
    pub response_code: String,
    pub payment_method: String,
}

impl PaymentSummary {
    pub fn from_state(reference_id: &str, state: &GatewayPaymentState) -> Self {
        Self {
            id: state.pay_id.clone(),
            reference_id: reference_id.to_string(),
            amount_due: state.amount.value,
            amount_paid: state.captured.unwrap_or_default(),
            currency: state.amount.currency.clone(),
            status: state.status.clone(),
            response_code: state.response_code.clone(),
            payment_method: state.payment_method.clone(),
        }
    }
}
