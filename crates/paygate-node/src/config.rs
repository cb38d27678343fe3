//! Adapter configuration loading and validation.

use paygate_core::ReconcileConfig;
use reqwest::Url;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Full configuration for the adapter service.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdapterConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Our own identity and the URLs of the services we talk to.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Card-payment gateway. Without a base URL the built-in simulator is used.
    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub security: SecurityConfig,

    #[serde(default)]
    pub invoice: InvoiceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Externally reachable base URL of this service, no trailing slash.
    #[serde(default = "default_public_url")]
    pub public_url: String,
    /// First token of every reference id this deployment owns.
    #[serde(default)]
    pub tenant_prefix: String,
    #[serde(default)]
    pub success_redirect: String,
    #[serde(default)]
    pub failure_redirect: String,
    /// Ledger (payment service). Empty keeps transactions in memory.
    #[serde(default)]
    pub payment_service_url: String,
    /// Empty falls back to an in-memory directory.
    #[serde(default)]
    pub attendee_service_url: String,
    /// Empty sends escalations to the log only.
    #[serde(default)]
    pub mail_service_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatewayAuth {
    /// HTTP basic auth with merchant id and api key.
    #[default]
    Basic,
    Bearer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub auth: GatewayAuth,
    #[serde(default)]
    pub merchant_id: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub bearer_token: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecurityConfig {
    /// Token required on paylink routes.
    #[serde(default)]
    pub api_token: String,
    /// Path segment that authenticates the webhook endpoint.
    #[serde(default)]
    pub webhook_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceConfig {
    #[serde(default = "default_invoice_title")]
    pub title: String,
    #[serde(default = "default_invoice_description")]
    pub description: String,
    #[serde(default = "default_invoice_purpose")]
    pub purpose: String,
    /// VAT in percent for transactions created during recovery.
    #[serde(default = "default_vat_rate", with = "rust_decimal::serde::float")]
    pub default_vat_rate: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Log and audit raw webhook bodies.
    #[serde(default)]
    pub full_requests: bool,
    /// Recipient of escalation mails.
    #[serde(default)]
    pub error_notify_mail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuditConfig {
    /// JSON-lines file. Absent keeps the audit log in memory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_listen_addr() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    9097
}
fn default_public_url() -> String {
    "http://localhost:9097".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_invoice_title() -> String {
    "Registration".into()
}
fn default_invoice_description() -> String {
    "Registration fees".into()
}
fn default_invoice_purpose() -> String {
    "registration".into()
}
fn default_vat_rate() -> Decimal {
    Decimal::new(19, 0)
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            public_url: default_public_url(),
            tenant_prefix: String::new(),
            success_redirect: String::new(),
            failure_redirect: String::new(),
            payment_service_url: String::new(),
            attendee_service_url: String::new(),
            mail_service_url: String::new(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            auth: GatewayAuth::Basic,
            merchant_id: String::new(),
            api_key: String::new(),
            bearer_token: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for InvoiceConfig {
    fn default() -> Self {
        Self {
            title: default_invoice_title(),
            description: default_invoice_description(),
            purpose: default_invoice_purpose(),
            default_vat_rate: default_vat_rate(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            full_requests: false,
            error_notify_mail: String::new(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["text", "json"];

/// Absolute http(s) URL without a trailing slash.
fn check_base_url(field: &str, value: &str, problems: &mut Vec<String>) {
    match Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
            if value.ends_with('/') {
                problems.push(format!("{} must not end with a slash", field));
            }
        }
        Ok(_) => problems.push(format!("{} must be an http(s) url", field)),
        Err(e) => problems.push(format!("{} is not a valid url: {}", field, e)),
    }
}

impl AdapterConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: AdapterConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Check everything, returning every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();

        if self.server.port == 0 {
            problems.push("server.port must not be 0".to_string());
        }
        check_base_url("service.public_url", &self.service.public_url, &mut problems);
        for (field, value) in [
            ("service.payment_service_url", &self.service.payment_service_url),
            ("service.attendee_service_url", &self.service.attendee_service_url),
            ("service.mail_service_url", &self.service.mail_service_url),
        ] {
            if !value.is_empty() {
                check_base_url(field, value, &mut problems);
            }
        }
        if let Some(base) = &self.gateway.base_url {
            check_base_url("gateway.base_url", base, &mut problems);
            match self.gateway.auth {
                GatewayAuth::Basic => {
                    if self.gateway.merchant_id.is_empty() || self.gateway.api_key.is_empty() {
                        problems.push(
                            "gateway.merchant_id and gateway.api_key are required for basic auth"
                                .to_string(),
                        );
                    }
                }
                GatewayAuth::Bearer => {
                    if self.gateway.bearer_token.is_empty() {
                        problems.push("gateway.bearer_token is required for bearer auth".to_string());
                    }
                }
            }
        }
        if self.security.api_token.is_empty() {
            problems.push("security.api_token must not be empty".to_string());
        }
        if self.security.webhook_secret.is_empty() {
            problems.push("security.webhook_secret must not be empty".to_string());
        }
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            problems.push(format!(
                "logging.level must be one of {}",
                LOG_LEVELS.join(", ")
            ));
        }
        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            problems.push(format!(
                "logging.format must be one of {}",
                LOG_FORMATS.join(", ")
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.listen_addr, self.server.port)
    }

    pub fn gateway_configured(&self) -> bool {
        self.gateway.base_url.is_some()
    }

    /// Absolute URL of our webhook endpoint, secret included.
    pub fn webhook_url(&self) -> String {
        format!(
            "{}/api/rest/v1/webhook/{}",
            self.service.public_url, self.security.webhook_secret
        )
    }

    /// The subset the engine and orchestrator need.
    pub fn reconcile_config(&self) -> ReconcileConfig {
        ReconcileConfig {
            tenant_prefix: self.service.tenant_prefix.clone(),
            gateway_configured: self.gateway_configured(),
            default_vat_rate: self.invoice.default_vat_rate,
            invoice_title: self.invoice.title.clone(),
            invoice_description: self.invoice.description.clone(),
            invoice_purpose: self.invoice.purpose.clone(),
            success_redirect: self.service.success_redirect.clone(),
            failure_redirect: self.service.failure_redirect.clone(),
            webhook_url: self.webhook_url(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn valid() -> AdapterConfig {
        let mut config = AdapterConfig::default();
        config.security.api_token = "api-token".into();
        config.security.webhook_secret = "s3cr3t".into();
        config.service.tenant_prefix = "EF1995".into();
        config
    }

    #[test]
    fn test_default_config() {
        let config = AdapterConfig::default();
        assert_eq!(config.server.port, 9097);
        assert_eq!(config.logging.level, "info");
        assert!(config.gateway.base_url.is_none());
        assert!(config.audit.path.is_none());
        assert_eq!(config.invoice.default_vat_rate, dec!(19));
    }

    #[test]
    fn test_default_is_not_startable() {
        let problems = AdapterConfig::default().validate().unwrap_err();
        assert!(problems.iter().any(|p| p.contains("api_token")));
        assert!(problems.iter().any(|p| p.contains("webhook_secret")));
    }

    #[test]
    fn test_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validation_lists_every_problem() {
        let mut config = valid();
        config.server.port = 0;
        config.service.public_url = "http://localhost:9097/".into();
        config.service.payment_service_url = "not a url".into();
        config.logging.level = "loud".into();
        config.logging.format = "xml".into();
        config.gateway.base_url = Some("ftp://gateway.example.com".into());

        let problems = config.validate().unwrap_err();
        assert_eq!(problems.len(), 7, "{:?}", problems);
    }

    #[test]
    fn test_bearer_gateway() {
        let mut config = valid();
        config.gateway.base_url = Some("https://gateway.example.com".into());
        config.gateway.auth = GatewayAuth::Bearer;
        assert!(config.validate().is_err());
        config.gateway.bearer_token = "tok".into();
        assert!(config.validate().is_ok());
        assert!(config.reconcile_config().gateway_configured);
    }

    #[test]
    fn test_reconcile_config() {
        let rc = valid().reconcile_config();
        assert_eq!(rc.tenant_prefix, "EF1995");
        assert!(!rc.gateway_configured);
        assert_eq!(rc.webhook_url, "http://localhost:9097/api/rest/v1/webhook/s3cr3t");
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = valid();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let decoded: AdapterConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(decoded.server.port, config.server.port);
        assert_eq!(decoded.security.api_token, "api-token");
        assert_eq!(decoded.invoice.default_vat_rate, dec!(19));
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let config = AdapterConfig::load(Path::new("/nonexistent/paygate.toml")).unwrap();
        assert_eq!(config.server.port, 9097);
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paygate.toml");
        valid().save(&path).unwrap();
        let loaded = AdapterConfig::load(&path).unwrap();
        assert_eq!(loaded.service.tenant_prefix, "EF1995");
    }

    #[test]
    fn test_config_from_toml_partial() {
        let toml_str = r#"
[service]
tenant_prefix = "EF2024"

[gateway]
base_url = "https://gateway.example.com"
auth = "bearer"
bearer_token = "t"

[invoice]
default_vat_rate = 7.0
"#;
        let config: AdapterConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.service.tenant_prefix, "EF2024");
        assert_eq!(config.gateway.auth, GatewayAuth::Bearer);
        assert_eq!(config.invoice.default_vat_rate, dec!(7));
        assert_eq!(config.server.port, 9097);
    }
}
