//! `paygate get`: Show a payment as the gateway sees it.

use clap::Args;
use paygate_core::PaymentSummary;
use reqwest::Method;

use super::{fail, format_cents, NodeArgs};

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Reference id of the payment.
    pub reference_id: String,

    /// Print the raw JSON response.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub node: NodeArgs,
}

pub fn print_summary(payment: &PaymentSummary) {
    println!("Payment {}", payment.reference_id);
    println!("  Gateway id: {}", payment.id);
    println!("  Status:     {} ({})", payment.status, payment.response_code);
    println!("  Due:        {}", format_cents(payment.amount_due, &payment.currency));
    println!("  Paid:       {}", format_cents(payment.amount_paid, &payment.currency));
    if !payment.payment_method.is_empty() {
        println!("  Method:     {}", payment.payment_method);
    }
}

pub async fn run(args: &GetArgs) -> anyhow::Result<()> {
    let response = args
        .node
        .request(Method::GET, &args.node.paylink_url(&args.reference_id))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(fail("get", response).await);
    }

    let payment: PaymentSummary = response.json().await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&payment)?);
    } else {
        print_summary(&payment);
    }
    Ok(())
}
