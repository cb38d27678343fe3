//! Paygate CLI: talks to a running adapter over its HTTP API.
//!
//! Subcommands: init, create, get, check, cancel.

mod commands;

use clap::{Parser, Subcommand};

/// Paygate: payment links and reconciliation for operators.
#[derive(Parser, Debug)]
#[command(name = "paygate", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default adapter configuration.
    Init(commands::init::InitArgs),
    /// Create a payment link.
    Create(commands::create::CreateArgs),
    /// Show a payment as the gateway sees it.
    Get(commands::get::GetArgs),
    /// Re-query the gateway and reconcile the ledger.
    Check(commands::check::CheckArgs),
    /// Cancel an open payment link.
    Cancel(commands::cancel::CancelArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Init(args) => commands::init::run(args),
        Commands::Create(args) => commands::create::run(args).await,
        Commands::Get(args) => commands::get::run(args).await,
        Commands::Check(args) => commands::check::run(args).await,
        Commands::Cancel(args) => commands::cancel::run(args).await,
    }
}
