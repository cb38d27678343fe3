//! Inbound webhook normalization.
//!
//! The gateway has delivered webhooks in more than one payload shape over
//! time. Each shape gets a small wire struct here, selected once by a
//! discriminant (the presence of an `event` field) and converted into the
//! single [`WebhookEvent`] the engine works with. Nothing downstream of
//! [`normalize`] ever sees a wire struct.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::types::{Money, STATUS_OK};

/// Checkout completed: the payer finished the hosted page.
pub const EVENT_CHECKOUT_COMPLETED: &str = "payment.checkout.completed";
/// Payment object created, no money moved yet.
pub const EVENT_PAYMENT_CREATED: &str = "payment.created";
/// Charge created. Checkout completion is used for reconciliation instead.
pub const EVENT_CHARGE_CREATED_V2: &str = "payment.charge.created.v2";

/// Stable internal shape of a payment notification. Untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub pay_id: String,
    /// Our reference id as echoed by the gateway.
    pub trans_id: String,
    pub status: String,
    pub response_code: String,
    pub response_description: String,
    pub amount: Money,
    pub payment_method: String,
    pub creation_date: String,
}

/// Which historical payload shape a body was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    /// `{id, event, timestamp, data}` envelope.
    V1Checkout,
    /// Flat `{payId, transId, status, amount, ...}` body.
    V2Session,
}

impl SchemaVersion {
    pub fn detect(body: &Value) -> Option<Self> {
        let obj = body.as_object()?;
        if obj.contains_key("event") {
            Some(Self::V1Checkout)
        } else if obj.contains_key("transId") || obj.contains_key("payId") {
            Some(Self::V2Session)
        } else {
            None
        }
    }
}

/// Outcome of normalizing one webhook body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedWebhook {
    /// A payment notification to reconcile.
    Payment(WebhookEvent),
    /// Known event that carries nothing to reconcile.
    Notice {
        event: String,
        reference_id: String,
        api_id: String,
        details: String,
    },
    /// Event type we do not handle.
    Unexpected { event: String, webhook_id: String },
}

/// Parse and normalize a raw webhook body.
pub fn normalize(body: &[u8]) -> Result<NormalizedWebhook, CoreError> {
    let value: Value = serde_json::from_slice(body)?;
    match SchemaVersion::detect(&value) {
        Some(SchemaVersion::V2Session) => {
            let wire: SessionWebhook = serde_json::from_value(value)?;
            Ok(NormalizedWebhook::Payment(wire.into()))
        }
        Some(SchemaVersion::V1Checkout) => {
            let envelope: CheckoutEnvelope = serde_json::from_value(value)?;
            envelope.normalize()
        }
        None => Err(CoreError::UnrecognizedWebhook(
            "body matches no known webhook schema".into(),
        )),
    }
}

// --- v2 session shape -----------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionWebhook {
    #[serde(default)]
    pay_id: String,
    #[serde(default)]
    trans_id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    response_code: String,
    #[serde(default)]
    response_description: String,
    #[serde(default)]
    amount: SessionAmount,
    #[serde(default)]
    payment_methods: Option<SessionPaymentMethods>,
    #[serde(default)]
    creation_date: String,
}

#[derive(Debug, Default, Deserialize)]
struct SessionAmount {
    #[serde(default)]
    value: i64,
    #[serde(default)]
    currency: String,
}

#[derive(Debug, Deserialize)]
struct SessionPaymentMethod {
    #[serde(rename = "type", default)]
    kind: String,
}

/// Older deliveries send a list, newer ones a single object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SessionPaymentMethods {
    One(SessionPaymentMethod),
    Many(Vec<SessionPaymentMethod>),
}

impl SessionPaymentMethods {
    fn first(self) -> String {
        match self {
            Self::One(m) => m.kind,
            Self::Many(list) => list.into_iter().next().map(|m| m.kind).unwrap_or_default(),
        }
    }
}

impl From<SessionWebhook> for WebhookEvent {
    fn from(w: SessionWebhook) -> Self {
        Self {
            pay_id: w.pay_id,
            trans_id: w.trans_id,
            status: w.status,
            response_code: w.response_code,
            response_description: w.response_description,
            amount: Money::new(w.amount.value, w.amount.currency),
            payment_method: w.payment_methods.map(SessionPaymentMethods::first).unwrap_or_default(),
            creation_date: w.creation_date,
        }
    }
}

// --- v1 checkout envelope -------------------------------------------------

#[derive(Debug, Deserialize)]
struct CheckoutEnvelope {
    #[serde(default)]
    id: String,
    event: String,
    #[serde(default)]
    timestamp: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutData {
    #[serde(default)]
    payment_id: String,
    #[serde(default)]
    order: CheckoutOrder,
    #[serde(default)]
    payment_type: String,
}

#[derive(Debug, Default, Deserialize)]
struct CheckoutOrder {
    #[serde(default)]
    amount: CheckoutAmount,
    #[serde(default)]
    reference: String,
}

#[derive(Debug, Default, Deserialize)]
struct CheckoutAmount {
    #[serde(default)]
    amount: Option<NumericString>,
    #[serde(default)]
    currency: String,
}

/// Amounts are documented as strings but arrive as numbers too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumericString {
    Number(i64),
    Text(String),
}

impl NumericString {
    fn to_cents(&self) -> Result<i64, CoreError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| CoreError::InvalidAmount(s.clone())),
        }
    }
}

impl CheckoutEnvelope {
    fn normalize(self) -> Result<NormalizedWebhook, CoreError> {
        match self.event.as_str() {
            EVENT_CHECKOUT_COMPLETED => {
                let data: CheckoutData = serde_json::from_value(self.data)?;
                let value = match &data.order.amount.amount {
                    Some(a) => a.to_cents()?,
                    None => 0,
                };
                Ok(NormalizedWebhook::Payment(WebhookEvent {
                    pay_id: data.payment_id,
                    trans_id: data.order.reference,
                    // checkout completion means the gateway accepted the payment
                    status: STATUS_OK.into(),
                    response_code: String::new(),
                    response_description: self.event,
                    amount: Money::new(value, data.order.amount.currency),
                    payment_method: data.payment_type,
                    creation_date: self.timestamp,
                }))
            }
            EVENT_PAYMENT_CREATED | EVENT_CHARGE_CREATED_V2 => {
                let details = self.data.to_string();
                let data: CheckoutData = serde_json::from_value(self.data).unwrap_or_default();
                Ok(NormalizedWebhook::Notice {
                    event: self.event,
                    reference_id: data.order.reference,
                    api_id: data.payment_id,
                    details,
                })
            }
            _ => Ok(NormalizedWebhook::Unexpected {
                event: self.event,
                webhook_id: self.id,
            }),
        }
    }
}
