use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Settings the engine and the orchestrator need at decision time.
///
/// Built by the node from its file configuration; tests construct it directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// First token every reference id handled by this deployment must carry.
    /// Empty disables the tenant gate.
    pub tenant_prefix: String,
    /// Whether a real gateway base URL is configured. When false, webhook
    /// claims are trusted as canonical and status checks are refused.
    pub gateway_configured: bool,
    /// VAT rate in percent for transactions synthesized during recovery.
    pub default_vat_rate: Decimal,
    pub invoice_title: String,
    pub invoice_description: String,
    pub invoice_purpose: String,
    /// Where the hosted payment page sends the payer after success.
    pub success_redirect: String,
    /// Where the hosted payment page sends the payer after cancelling.
    pub failure_redirect: String,
    /// Absolute URL of our own webhook endpoint, secret included.
    pub webhook_url: String,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            tenant_prefix: String::new(),
            gateway_configured: false,
            default_vat_rate: Decimal::new(19, 0),
            invoice_title: "Registration".into(),
            invoice_description: "Registration fees".into(),
            invoice_purpose: "registration".into(),
            success_redirect: String::new(),
            failure_redirect: String::new(),
            webhook_url: String::new(),
        }
    }
}
