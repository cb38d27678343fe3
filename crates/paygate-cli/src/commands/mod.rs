pub mod cancel;
pub mod check;
pub mod create;
pub mod get;
pub mod init;

use clap::Args;
use serde::Deserialize;

/// Where the adapter runs and how to authenticate.
#[derive(Args, Debug, Clone)]
pub struct NodeArgs {
    /// Base URL of the adapter.
    #[arg(short, long, default_value = "http://127.0.0.1:9097")]
    pub endpoint: String,

    /// API token configured in `[security].api_token`.
    #[arg(short, long)]
    pub token: String,
}

impl NodeArgs {
    pub fn paylinks_url(&self) -> String {
        format!("{}/api/rest/v1/paylinks", self.endpoint.trim_end_matches('/'))
    }

    pub fn paylink_url(&self, reference_id: &str) -> String {
        format!("{}/{}", self.paylinks_url(), reference_id)
    }

    pub fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        reqwest::Client::new()
            .request(method, url)
            .header("X-Api-Key", &self.token)
    }
}

#[derive(Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

/// Turn a non-success response into an error that names the adapter's error code.
pub async fn fail(what: &str, response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    match response.json::<ErrorResponse>().await {
        Ok(err) => {
            if let Some(details) = err.details {
                eprintln!("Details: {}", details);
            }
            anyhow::anyhow!("{} failed (HTTP {}): {} ({})", what, status, err.message, err.code)
        }
        Err(_) => anyhow::anyhow!("{} failed (HTTP {})", what, status),
    }
}

/// Print an amount in cents as `185.00 EUR`.
pub fn format_cents(value: i64, currency: &str) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    format!("{}{}.{:02} {}", sign, abs / 100, abs % 100, currency)
}
