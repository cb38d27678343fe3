//! HTTP client for the card-payment gateway.
//!
//! Create goes through the session endpoint (`POST /v2/payments/sessions`),
//! query and cancel through the v1 payment resource. The gateway addresses
//! payments by its own id; ids seen on create are remembered so later calls
//! by reference id can be translated. Unknown ids are sent as-is.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use dashmap::DashMap;
use paygate_core::{CreatePaymentRequest, CreatedPaymentLink, GatewayPaymentState, Money};
use paygate_engine::{GatewayClient, GatewayError};
use reqwest::{header::AUTHORIZATION, Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::config::{GatewayAuth, GatewayConfig};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateResponse {
    payment_id: String,
    hosted_payment_page_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AmountResponse {
    #[serde(default)]
    value: i64,
    #[serde(default)]
    currency: String,
    #[serde(default)]
    captured_value: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct PaymentMethodResponse {
    #[serde(default, rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
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
    amount: AmountResponse,
    #[serde(default)]
    payment_methods: Option<PaymentMethodResponse>,
}

impl QueryResponse {
    fn into_state(self, reference_id: &str) -> GatewayPaymentState {
        GatewayPaymentState {
            pay_id: self.pay_id,
            trans_id: if self.trans_id.is_empty() {
                reference_id.to_string()
            } else {
                self.trans_id
            },
            status: self.status,
            response_code: self.response_code,
            response_description: self.response_description,
            amount: Money::new(self.amount.value, self.amount.currency),
            captured: self.amount.captured_value,
            payment_method: self.payment_methods.map(|m| m.kind).unwrap_or_default(),
        }
    }
}

pub struct HttpGateway {
    client: Client,
    base_url: String,
    authorization: String,
    /// reference id -> gateway payment id
    pay_ids: DashMap<String, String>,
}

impl HttpGateway {
    pub fn new(base_url: &str, config: &GatewayConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            authorization: authorization_header(config),
            pay_ids: DashMap::new(),
        })
    }

    fn gateway_id_for(&self, reference_id: &str) -> String {
        self.pay_ids
            .get(reference_id)
            .map(|id| id.clone())
            .unwrap_or_else(|| reference_id.to_string())
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        if self.authorization.is_empty() {
            builder
        } else {
            builder.header(AUTHORIZATION, &self.authorization)
        }
    }
}

fn authorization_header(config: &GatewayConfig) -> String {
    match config.auth {
        GatewayAuth::Basic => {
            if config.merchant_id.is_empty() || config.api_key.is_empty() {
                String::new()
            } else {
                let credentials = format!("{}:{}", config.merchant_id, config.api_key);
                format!("Basic {}", STANDARD.encode(credentials))
            }
        }
        GatewayAuth::Bearer => format!("Bearer {}", config.bearer_token),
    }
}

fn downstream(err: reqwest::Error) -> GatewayError {
    GatewayError::Downstream(err.to_string())
}

fn check_status(status: StatusCode, id: &str) -> Result<(), GatewayError> {
    if status == StatusCode::NOT_FOUND {
        Err(GatewayError::NotFound(id.to_string()))
    } else if !status.is_success() {
        Err(GatewayError::Downstream(format!(
            "unexpected response status {}",
            status.as_u16()
        )))
    } else {
        Ok(())
    }
}

#[async_trait]
impl GatewayClient for HttpGateway {
    async fn create_payment_link(
        &self,
        request: &CreatePaymentRequest,
    ) -> Result<CreatedPaymentLink, GatewayError> {
        let url = format!("{}/v2/payments/sessions", self.base_url);
        let response = self
            .authorized(self.client.post(&url))
            .json(request)
            .send()
            .await
            .map_err(downstream)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                reference_id = %request.trans_id,
                status = status.as_u16(),
                body = %body,
                "gateway create failed"
            );
            return Err(GatewayError::Downstream(format!(
                "unexpected response status {}",
                status.as_u16()
            )));
        }

        let created: CreateResponse = response.json().await.map_err(downstream)?;
        self.pay_ids
            .insert(request.trans_id.clone(), created.payment_id.clone());
        Ok(CreatedPaymentLink {
            pay_id: created.payment_id,
            link: created.hosted_payment_page_url,
        })
    }

    async fn query_payment_link(
        &self,
        reference_id: &str,
    ) -> Result<GatewayPaymentState, GatewayError> {
        let id = self.gateway_id_for(reference_id);
        let url = format!("{}/v1/payments/{}", self.base_url, id);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(downstream)?;
        check_status(response.status(), reference_id)?;

        let body: QueryResponse = response.json().await.map_err(downstream)?;
        Ok(body.into_state(reference_id))
    }

    async fn delete_payment_link(
        &self,
        reference_id: &str,
        amount: &Money,
    ) -> Result<(), GatewayError> {
        let id = self.gateway_id_for(reference_id);
        let url = format!("{}/v1/payments/{}/cancels", self.base_url, id);
        let response = self
            .authorized(self.client.post(&url))
            .json(&serde_json::json!({ "amount": amount.value }))
            .send()
            .await
            .map_err(downstream)?;
        check_status(response.status(), reference_id)
    }

    fn gateway_id(&self) -> &str {
        "gw-http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_authorization() {
        let config = GatewayConfig {
            merchant_id: "demo".into(),
            api_key: "secret".into(),
            ..GatewayConfig::default()
        };
        assert_eq!(authorization_header(&config), "Basic ZGVtbzpzZWNyZXQ=");

        let anonymous = GatewayConfig::default();
        assert_eq!(authorization_header(&anonymous), "");
    }

    #[test]
    fn test_bearer_authorization() {
        let config = GatewayConfig {
            auth: GatewayAuth::Bearer,
            bearer_token: "tok".into(),
            ..GatewayConfig::default()
        };
        assert_eq!(authorization_header(&config), "Bearer tok");
    }

    #[test]
    fn test_query_response_mapping() {
        let body = r#"{
            "payId": "pay-1",
            "status": "OK",
            "responseCode": "00000000",
            "amount": {"value": 18500, "currency": "EUR", "capturedValue": 18500},
            "paymentMethods": {"type": "CARD"},
            "language": "de"
        }"#;
        let parsed: QueryResponse = serde_json::from_str(body).unwrap();
        let state = parsed.into_state("EF1995-000001-221216-122218-4132");
        assert_eq!(state.trans_id, "EF1995-000001-221216-122218-4132");
        assert_eq!(state.amount, Money::new(18500, "EUR"));
        assert_eq!(state.captured, Some(18500));
        assert_eq!(state.payment_method, "CARD");
    }

    #[test]
    fn test_check_status() {
        assert!(matches!(
            check_status(StatusCode::NOT_FOUND, "X"),
            Err(GatewayError::NotFound(_))
        ));
        assert!(matches!(
            check_status(StatusCode::BAD_GATEWAY, "X"),
            Err(GatewayError::Downstream(_))
        ));
        assert!(check_status(StatusCode::NO_CONTENT, "X").is_ok());
    }

    #[test]
    fn test_pay_id_translation() {
        let gw = HttpGateway::new("https://gateway.example.com/", &GatewayConfig::default()).unwrap();
        assert_eq!(gw.base_url, "https://gateway.example.com");
        assert_eq!(gw.gateway_id_for("REF"), "REF");
        gw.pay_ids.insert("REF".into(), "pay-7".into());
        assert_eq!(gw.gateway_id_for("REF"), "pay-7");
    }
}
