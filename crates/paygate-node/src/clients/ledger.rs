//! Ledger (payment service) client.

use async_trait::async_trait;
use paygate_core::LedgerTransaction;
use paygate_engine::{LedgerClient, LedgerError};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{service_client, API_KEY_HEADER};

#[derive(Debug, Serialize, Deserialize)]
struct TransactionList {
    #[serde(default)]
    payload: Vec<LedgerTransaction>,
}

pub struct HttpLedger {
    client: Client,
    base_url: String,
    api_token: String,
}

impl HttpLedger {
    pub fn new(base_url: &str, api_token: &str) -> anyhow::Result<Self> {
        Ok(Self {
            client: service_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
        })
    }

    fn transactions_url(&self) -> String {
        format!("{}/api/rest/v1/transactions", self.base_url)
    }
}

fn downstream(err: reqwest::Error) -> LedgerError {
    LedgerError::Downstream(err.to_string())
}

fn check_status(status: StatusCode, reference_id: &str) -> Result<(), LedgerError> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::NOT_FOUND => Err(LedgerError::NotFound(reference_id.to_string())),
        s => Err(LedgerError::Downstream(format!(
            "unexpected response status {}",
            s.as_u16()
        ))),
    }
}

/// Exactly one transaction must match a reference id.
fn single(list: TransactionList, reference_id: &str) -> Result<LedgerTransaction, LedgerError> {
    let mut payload = list.payload;
    match payload.len() {
        0 => Err(LedgerError::NotFound(reference_id.to_string())),
        1 => Ok(payload.remove(0)),
        n => Err(LedgerError::Downstream(format!(
            "{} transactions share reference id {}",
            n, reference_id
        ))),
    }
}

#[async_trait]
impl LedgerClient for HttpLedger {
    async fn get_transaction_by_reference_id(
        &self,
        reference_id: &str,
    ) -> Result<LedgerTransaction, LedgerError> {
        let response = self
            .client
            .get(self.transactions_url())
            .query(&[("transaction_identifier", reference_id)])
            .header(API_KEY_HEADER, &self.api_token)
            .send()
            .await
            .map_err(downstream)?;
        check_status(response.status(), reference_id)?;

        let list: TransactionList = response.json().await.map_err(downstream)?;
        single(list, reference_id)
    }

    async fn add_transaction(&self, tx: &LedgerTransaction) -> Result<(), LedgerError> {
        let response = self
            .client
            .post(self.transactions_url())
            .header(API_KEY_HEADER, &self.api_token)
            .json(tx)
            .send()
            .await
            .map_err(downstream)?;
        // a 404 on create means the debitor is unknown, which is not a lookup miss
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(LedgerError::Downstream(format!(
                "unexpected response status {}",
                status.as_u16()
            )))
        }
    }

    async fn update_transaction(&self, tx: &LedgerTransaction) -> Result<(), LedgerError> {
        let url = format!("{}/{}", self.transactions_url(), tx.id);
        let response = self
            .client
            .put(url)
            .header(API_KEY_HEADER, &self.api_token)
            .json(tx)
            .send()
            .await
            .map_err(downstream)?;
        check_status(response.status(), &tx.id)
    }
}
