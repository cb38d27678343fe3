//! Paygate adapter service entry point.
//!
//! Loads the TOML configuration, validates it, wires the reconciliation
//! engine to its collaborators and serves the HTTP API.

mod api;
mod auth;
mod clients;
mod config;
mod error;
mod node;
mod state;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use config::AdapterConfig;
use node::PaygateNode;

/// Paygate adapter service
#[derive(Parser, Debug)]
#[command(name = "paygate-node", version, about = "Payment gateway adapter service")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "paygate.toml")]
    config: PathBuf,

    /// Override the HTTP port.
    #[arg(long)]
    port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Generate a default config file and exit.
    #[arg(long)]
    init: bool,
}

fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.init {
        init_tracing("info", "text");
        let config = AdapterConfig::default();
        config.save(&args.config)?;
        tracing::info!(path = %args.config.display(), "wrote default config");
        return Ok(());
    }

    let mut config = AdapterConfig::load(&args.config)?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    init_tracing(&config.logging.level, &config.logging.format);

    if let Err(problems) = config.validate() {
        for problem in &problems {
            tracing::error!(%problem, "invalid configuration");
        }
        anyhow::bail!(
            "configuration {} has {} problem(s)",
            args.config.display(),
            problems.len()
        );
    }

    tracing::info!("Paygate adapter v{}", env!("CARGO_PKG_VERSION"));

    let node = PaygateNode::new(config)?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        tracing::info!("received shutdown signal");
    };

    tokio::select! {
        result = node.run() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server error");
                return Err(e);
            }
        }
        _ = shutdown => {
            tracing::info!("initiating graceful shutdown");
        }
    }

    tracing::info!("Paygate adapter exited cleanly");
    Ok(())
}
