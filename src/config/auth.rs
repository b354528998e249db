use serde::{Deserialize, Serialize};

/// Authentication configuration for the webhook surface.
///
/// Both checks are off by default so local development works without
/// secrets. Secrets are normally injected via `${VAR}` expansion in the
/// config file rather than written inline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Require a bearer API key on `/calculate`.
    #[serde(default)]
    pub require_api_key: bool,

    /// The expected API key. Must be set when `require_api_key` is enabled.
    #[serde(default)]
    pub api_key: Option<String>,

    /// HMAC webhook signature verification.
    #[serde(default)]
    pub webhook_signature: WebhookSignatureConfig,
}

/// HMAC-SHA256 webhook signature configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookSignatureConfig {
    /// Verify the `X-Webhook-Signature` header on `/calculate`.
    #[serde(default)]
    pub enabled: bool,

    /// Shared secret for the HMAC. Must be set when `enabled` is true.
    #[serde(default)]
    pub secret: Option<String>,
}
