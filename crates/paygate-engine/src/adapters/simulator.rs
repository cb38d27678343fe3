use async_trait::async_trait;
use dashmap::DashMap;
use paygate_core::{
    CreatePaymentRequest, CreatedPaymentLink, GatewayPaymentState, Money, WebhookEvent,
};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::GatewayError;
use crate::traits::GatewayClient;

const STATUS_CREATED: &str = "CREATED";
const STATUS_CANCELLED: &str = "CANCELLED";

/// In-process stand-in for the card-payment gateway.
///
/// Used when no gateway base URL is configured. Links point back at this
/// service's own `/simulator/{refid}` route; visiting one marks the payment
/// as paid and yields the webhook the real gateway would have sent.
pub struct SimulatorGateway {
    /// Simulated payments keyed by reference id.
    payments: DashMap<String, GatewayPaymentState>,
    public_url: String,
    sequence: AtomicU32,
}

impl SimulatorGateway {
    pub fn new(public_url: impl Into<String>) -> Self {
        Self {
            payments: DashMap::new(),
            public_url: public_url.into(),
            sequence: AtomicU32::new(100),
        }
    }

    fn link_for(&self, reference_id: &str) -> String {
        if self.public_url.is_empty() {
            format!("http://localhost:1111/simulator/{}", reference_id)
        } else {
            format!("{}/simulator/{}", self.public_url, reference_id)
        }
    }

    /// Mark a simulated payment as paid and build the matching webhook.
    pub fn complete(&self, reference_id: &str) -> Result<WebhookEvent, GatewayError> {
        let mut entry = self
            .payments
            .get_mut(reference_id)
            .ok_or_else(|| GatewayError::NotFound(reference_id.to_string()))?;

        let state = entry.value_mut();
        state.status = paygate_core::types::STATUS_OK.into();
        state.response_code = paygate_core::types::RESPONSE_CODE_OK.into();
        state.response_description = "simulated payment".into();
        state.captured = Some(state.amount.value);

        tracing::info!(
            reference_id,
            pay_id = %state.pay_id,
            amount = %state.amount,
            "Simulator payment completed"
        );

        Ok(WebhookEvent {
            pay_id: state.pay_id.clone(),
            trans_id: state.trans_id.clone(),
            status: state.status.clone(),
            response_code: state.response_code.clone(),
            response_description: state.response_description.clone(),
            amount: state.amount.clone(),
            payment_method: state.payment_method.clone(),
            creation_date: chrono::Utc::now().to_rfc3339(),
        })
    }

    pub fn len(&self) -> usize {
        self.payments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payments.is_empty()
    }
}

#[async_trait]
impl GatewayClient for SimulatorGateway {
    async fn create_payment_link(
        &self,
        request: &CreatePaymentRequest,
    ) -> Result<CreatedPaymentLink, GatewayError> {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let pay_id = format!("mock-{}", seq);

        self.payments.insert(
            request.trans_id.clone(),
            GatewayPaymentState {
                pay_id: pay_id.clone(),
                trans_id: request.trans_id.clone(),
                status: STATUS_CREATED.into(),
                response_code: String::new(),
                response_description: String::new(),
                amount: Money::new(request.amount.value, request.amount.currency.clone()),
                captured: None,
                payment_method: "CARD".into(),
            },
        );

        tracing::info!(
            reference_id = %request.trans_id,
            pay_id = %pay_id,
            amount = request.amount.value,
            currency = %request.amount.currency,
            "Simulator payment link created"
        );

        Ok(CreatedPaymentLink {
            pay_id,
            link: self.link_for(&request.trans_id),
        })
    }

    async fn query_payment_link(
        &self,
        reference_id: &str,
    ) -> Result<GatewayPaymentState, GatewayError> {
        self.payments
            .get(reference_id)
            .map(|s| s.clone())
            .ok_or_else(|| GatewayError::NotFound(reference_id.to_string()))
    }

    async fn delete_payment_link(
        &self,
        reference_id: &str,
        _amount: &Money,
    ) -> Result<(), GatewayError> {
        let mut entry = self
            .payments
            .get_mut(reference_id)
            .ok_or_else(|| GatewayError::NotFound(reference_id.to_string()))?;
        entry.status = STATUS_CANCELLED.into();
        tracing::info!(reference_id, "Simulator payment link cancelled");
        Ok(())
    }

    fn gateway_id(&self) -> &str {
        "gw-simulator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paygate_core::gateway::{CallbackUrls, CreateAmount, CustomerInfo, Order};

    fn request(reference_id: &str) -> CreatePaymentRequest {
        CreatePaymentRequest {
            trans_id: reference_id.into(),
            amount: CreateAmount {
                value: 18500,
                currency: "EUR".into(),
                tax_total: 2954,
                net_item_total: 15546,
            },
            language: "en".into(),
            urls: CallbackUrls {
                return_url: String::new(),
                cancel: String::new(),
                webhook: String::new(),
            },
            order: Order { items: vec![] },
            customer_info: CustomerInfo {
                email: "a@example.com".into(),
                merchant_customer_id: "1".into(),
            },
            channel: "PAYBYLINK".into(),
        }
    }

    #[tokio::test]
    async fn test_create_and_query() {
        let sim = SimulatorGateway::new("https://pay.example.com");
        let created = sim.create_payment_link(&request("EF1995-000001-A-B-C")).await.unwrap();
        assert_eq!(created.link, "https://pay.example.com/simulator/EF1995-000001-A-B-C");
        assert_eq!(created.pay_id, "mock-101");

        let state = sim.query_payment_link("EF1995-000001-A-B-C").await.unwrap();
        assert_eq!(state.status, STATUS_CREATED);
        assert_eq!(state.amount, Money::new(18500, "EUR"));
    }

    #[tokio::test]
    async fn test_complete_yields_webhook() {
        let sim = SimulatorGateway::new("");
        sim.create_payment_link(&request("REF-1")).await.unwrap();

        let event = sim.complete("REF-1").unwrap();
        assert_eq!(event.status, "OK");
        assert_eq!(event.trans_id, "REF-1");
        assert_eq!(event.amount.value, 18500);

        let state = sim.query_payment_link("REF-1").await.unwrap();
        assert_eq!(state.captured, Some(18500));
    }

    #[tokio::test]
    async fn test_unknown_reference() {
        let sim = SimulatorGateway::new("");
        assert!(matches!(sim.complete("NOPE"), Err(GatewayError::NotFound(_))));
        assert!(matches!(
            sim.query_payment_link("NOPE").await,
            Err(GatewayError::NotFound(_))
        ));
        assert!(matches!(
            sim.delete_payment_link("NOPE", &Money::new(1, "EUR")).await,
            Err(GatewayError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel() {
        let sim = SimulatorGateway::new("");
        sim.create_payment_link(&request("REF-2")).await.unwrap();
        sim.delete_payment_link("REF-2", &Money::new(18500, "EUR")).await.unwrap();
        let state = sim.query_payment_link("REF-2").await.unwrap();
        assert_eq!(state.status, STATUS_CANCELLED);
    }
}
