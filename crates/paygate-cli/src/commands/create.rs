//! `paygate create`: Create a payment link.

use clap::Args;
use paygate_core::{PaymentLink, PaymentLinkRequest};
use reqwest::Method;
use rust_decimal::Decimal;

use super::{fail, format_cents, NodeArgs};

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Reference id, e.g. EF1995-000042-221216-122218-4132.
    #[arg(short, long)]
    pub reference_id: String,

    /// Debitor (badge) number to bill.
    #[arg(short, long)]
    pub debitor_id: i64,

    /// Gross amount in cents.
    #[arg(short, long)]
    pub amount: i64,

    /// Currency code.
    #[arg(short, long, default_value = "EUR")]
    pub currency: String,

    /// VAT rate in percent.
    #[arg(long, default_value = "19")]
    pub vat_rate: Decimal,

    #[command(flatten)]
    pub node: NodeArgs,
}

pub async fn run(args: &CreateArgs) -> anyhow::Result<()> {
    let body = PaymentLinkRequest {
        reference_id: args.reference_id.clone(),
        debitor_id: args.debitor_id,
        amount_due: args.amount,
        currency: args.currency.clone(),
        vat_rate: args.vat_rate,
    };

    println!("Creating payment link...");
    println!("  Reference: {}", args.reference_id);
    println!("  Amount:    {}", format_cents(args.amount, &args.currency));
    println!();

    let response = args
        .node
        .request(Method::POST, &args.node.paylinks_url())
        .json(&body)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(fail("create", response).await);
    }

    let link: PaymentLink = response.json().await?;
    println!("Payment link created:");
    println!("  Link:      {}", link.link);
    println!("  Title:     {}", link.title);
    println!("  VAT:       {}%", link.vat_rate);
    Ok(())
}
