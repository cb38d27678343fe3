//! reqwest-backed implementations of the engine's capability traits.

pub mod attendee;
pub mod gateway;
pub mod ledger;
pub mod mail;

pub use attendee::HttpAttendees;
pub use gateway::HttpGateway;
pub use ledger::HttpLedger;
pub use mail::MailNotifier;

use reqwest::Client;
use std::time::Duration;

/// Header carrying the shared service token on calls between our services.
pub const API_KEY_HEADER: &str = "X-Api-Key";

const DOWNSTREAM_TIMEOUT: Duration = Duration::from_secs(15);

/// A plain JSON client for the internal services.
pub(crate) fn service_client() -> anyhow::Result<Client> {
    Ok(Client::builder().timeout(DOWNSTREAM_TIMEOUT).build()?)
}
