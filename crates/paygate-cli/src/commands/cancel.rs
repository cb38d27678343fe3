//! `paygate cancel`: Cancel an open payment link.

use clap::Args;
use reqwest::Method;

use super::{fail, NodeArgs};

#[derive(Args, Debug)]
pub struct CancelArgs {
    /// Reference id of the payment link.
    pub reference_id: String,

    #[command(flatten)]
    pub node: NodeArgs,
}

pub async fn run(args: &CancelArgs) -> anyhow::Result<()> {
    let response = args
        .node
        .request(Method::DELETE, &args.node.paylink_url(&args.reference_id))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(fail("cancel", response).await);
    }

    println!("Payment link {} cancelled.", args.reference_id);
    Ok(())
}
