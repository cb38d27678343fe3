//! `paygate init`: Write a default adapter configuration.

use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (defaults to current directory).
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Tenant prefix of the reference ids this deployment handles.
    #[arg(long, default_value = "")]
    pub tenant_prefix: String,
}

fn default_config(tenant_prefix: &str) -> String {
    format!(
        r#"# Paygate adapter configuration

[server]
listen_addr = "127.0.0.1"
port = 9097

[service]
public_url = "http://localhost:9097"
tenant_prefix = "{tenant_prefix}"
success_redirect = ""
failure_redirect = ""
# leave empty to keep transactions in memory
payment_service_url = ""
attendee_service_url = ""
mail_service_url = ""

# without base_url the built-in simulator is used
[gateway]
auth = "basic"
merchant_id = ""
api_key = ""
bearer_token = ""
timeout_secs = 30

[security]
api_token = ""
webhook_secret = ""

[invoice]
title = "Registration"
description = "Registration fees"
purpose = "registration"
default_vat_rate = 19.0

[logging]
level = "info"
format = "text"
full_requests = false
error_notify_mail = ""
"#
    )
}

pub fn run(args: &InitArgs) -> anyhow::Result<()> {
    let config_path = args.dir.join("paygate.toml");

    if config_path.exists() {
        anyhow::bail!("configuration file already exists at {}", config_path.display());
    }

    std::fs::create_dir_all(&args.dir)?;
    std::fs::write(&config_path, default_config(&args.tenant_prefix))?;

    println!("Wrote {}", config_path.display());
    println!("Set [security].api_token and [security].webhook_secret before starting paygate-node.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let text = default_config("EF1995");
        let value: toml::Value = toml::from_str(&text).unwrap();
        assert_eq!(value["service"]["tenant_prefix"].as_str(), Some("EF1995"));
        assert_eq!(value["server"]["port"].as_integer(), Some(9097));
    }
}
