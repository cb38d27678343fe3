//! Attendee service client, used to address payment links.

use async_trait::async_trait;
use paygate_engine::{Attendee, AttendeeClient, AttendeeError};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::{service_client, API_KEY_HEADER};

/// Subset of the attendee record we care about.
#[derive(Debug, Deserialize)]
struct AttendeeResponse {
    id: u32,
    #[serde(default)]
    email: String,
    #[serde(default)]
    registration_language: String,
}

impl From<AttendeeResponse> for Attendee {
    fn from(r: AttendeeResponse) -> Self {
        Attendee {
            id: r.id,
            email: r.email,
            language: r.registration_language,
        }
    }
}

pub struct HttpAttendees {
    client: Client,
    base_url: String,
    api_token: String,
}

impl HttpAttendees {
    pub fn new(base_url: &str, api_token: &str) -> anyhow::Result<Self> {
        Ok(Self {
            client: service_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
        })
    }
}

#[async_trait]
impl AttendeeClient for HttpAttendees {
    async fn get_attendee(&self, debitor_id: u32) -> Result<Attendee, AttendeeError> {
        let url = format!("{}/api/rest/v1/attendees/{}", self.base_url, debitor_id);
        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &self.api_token)
            .send()
            .await
            .map_err(|e| AttendeeError::Downstream(e.to_string()))?;

        match response.status() {
            s if s.is_success() => {
                let body: AttendeeResponse = response
                    .json()
                    .await
                    .map_err(|e| AttendeeError::Downstream(e.to_string()))?;
                Ok(body.into())
            }
            StatusCode::NOT_FOUND => Err(AttendeeError::NotFound(debitor_id)),
            s => Err(AttendeeError::Downstream(format!(
                "unexpected response status {}",
                s.as_u16()
            ))),
        }
    }
}
