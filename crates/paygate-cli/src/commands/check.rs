//! `paygate check`: Trigger a status check for one payment.

use clap::Args;
use paygate_core::PaymentSummary;
use reqwest::{Method, StatusCode};

use super::get::print_summary;
use super::{fail, ErrorResponse, NodeArgs};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Reference id of the payment.
    pub reference_id: String,

    #[command(flatten)]
    pub node: NodeArgs,
}

pub async fn run(args: &CheckArgs) -> anyhow::Result<()> {
    let url = format!("{}/status-check", args.node.paylink_url(&args.reference_id));
    let response = args.node.request(Method::POST, &url).send().await?;

    match response.status() {
        s if s.is_success() => {
            let payment: PaymentSummary = response.json().await?;
            println!("Ledger reconciled with gateway.");
            print_summary(&payment);
            Ok(())
        }
        StatusCode::CONFLICT => {
            // the ledger was left alone or kept pending; operators need the gateway view
            let err: ErrorResponse = response.json().await?;
            println!("Needs review: {}", err.message);
            if let Some(details) = err.details {
                if let Ok(payment) = serde_json::from_value::<PaymentSummary>(details) {
                    print_summary(&payment);
                }
            }
            anyhow::bail!("status check reported a conflict ({})", err.code)
        }
        _ => Err(fail("status check", response).await),
    }
}
