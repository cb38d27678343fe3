//! Escalation mails through the mail service.

use async_trait::async_trait;
use paygate_engine::{NotificationClient, NotifyError};
use reqwest::Client;
use serde::Serialize;
use std::collections::BTreeMap;

use super::{service_client, API_KEY_HEADER};

/// Mail template used for every escalation.
pub const ERROR_TEMPLATE: &str = "payment-paygate-adapter-error";

#[derive(Debug, Serialize)]
struct MailRequest {
    cid: String,
    lang: String,
    to: Vec<String>,
    variables: BTreeMap<String, String>,
}

fn build_mail(recipient: &str, operation: &str, reference_id: &str, status: &str) -> MailRequest {
    let mut variables = BTreeMap::new();
    variables.insert("operation".to_string(), operation.to_string());
    variables.insert("referenceId".to_string(), reference_id.to_string());
    variables.insert("status".to_string(), status.to_string());
    MailRequest {
        cid: ERROR_TEMPLATE.to_string(),
        lang: "en-US".to_string(),
        to: vec![recipient.to_string()],
        variables,
    }
}

pub struct MailNotifier {
    client: Client,
    base_url: String,
    api_token: String,
    recipient: String,
}

impl MailNotifier {
    pub fn new(base_url: &str, api_token: &str, recipient: &str) -> anyhow::Result<Self> {
        Ok(Self {
            client: service_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
            recipient: recipient.to_string(),
        })
    }
}

#[async_trait]
impl NotificationClient for MailNotifier {
    async fn notify(
        &self,
        operation: &str,
        reference_id: &str,
        status: &str,
    ) -> Result<(), NotifyError> {
        if self.recipient.is_empty() {
            tracing::warn!(operation, reference_id, status, "escalation (no recipient configured)");
            return Ok(());
        }
        let url = format!("{}/api/v1/mail", self.base_url);
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_token)
            .json(&build_mail(&self.recipient, operation, reference_id, status))
            .send()
            .await
            .map_err(|e| NotifyError(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(NotifyError(format!(
                "unexpected response status {}",
                response.status().as_u16()
            )))
        }
    }
}
