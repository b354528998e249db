use std::net::{IpAddr, Ipv4Addr};

use http::{HeaderName, Method};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request body size limit in bytes.
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,

    /// CORS configuration.
    #[serde(default)]
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
            cors: CorsConfig::default(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8000
}

fn default_body_limit() -> usize {
    64 * 1024
}

/// CORS configuration.
///
/// The defaults admit the Make.com webhook origins this service is built
/// to integrate with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    /// Enable CORS.
    #[serde(default = "default_cors_enabled")]
    pub enabled: bool,

    /// Allowed origins. Use ["*"] for any origin (not recommended).
    #[serde(default = "default_cors_origins")]
    pub allowed_origins: Vec<String>,

    /// Allowed HTTP methods.
    #[serde(default = "default_cors_methods")]
    pub allowed_methods: Vec<String>,

    /// Allowed headers.
    #[serde(default = "default_cors_headers")]
    pub allowed_headers: Vec<String>,

    /// Whether to allow credentials.
    #[serde(default)]
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: default_cors_enabled(),
            allowed_origins: default_cors_origins(),
            allowed_methods: default_cors_methods(),
            allowed_headers: default_cors_headers(),
            allow_credentials: false,
        }
    }
}

fn default_cors_enabled() -> bool {
    true
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "https://hook.eu1.make.com".to_string(),
        "https://hook.us1.make.com".to_string(),
    ]
}

fn default_cors_methods() -> Vec<String> {
    vec!["POST".to_string()]
}

fn default_cors_headers() -> Vec<String> {
    vec!["Content-Type".to_string(), "Authorization".to_string()]
}

impl CorsConfig {
    /// Build a CorsLayer from the configuration.
    ///
    /// Returns None if CORS is disabled. An empty origin list rejects all
    /// cross-origin requests; `["*"]` allows any origin and logs a warning.
    pub fn into_layer(self) -> Option<CorsLayer> {
        if !self.enabled {
            tracing::debug!("CORS is disabled");
            return None;
        }

        let allow_origin = if self.allowed_origins.is_empty() {
            AllowOrigin::list(std::iter::empty::<http::HeaderValue>())
        } else if self.allowed_origins.len() == 1 && self.allowed_origins[0] == "*" {
            tracing::warn!(
                "CORS: allowing any origin (allowed_origins = [\"*\"]). \
                 Specify allowed origins explicitly for production."
            );
            AllowOrigin::any()
        } else {
            let origins: Vec<http::HeaderValue> = self
                .allowed_origins
                .iter()
                .filter_map(|origin| {
                    origin.parse().ok().or_else(|| {
                        tracing::warn!(origin = %origin, "Invalid CORS origin, skipping");
                        None
                    })
                })
                .collect();
            AllowOrigin::list(origins)
        };

        let methods: Vec<Method> = self
            .allowed_methods
            .iter()
            .filter_map(|m| {
                m.parse().ok().or_else(|| {
                    tracing::warn!(method = %m, "Invalid CORS method, skipping");
                    None
                })
            })
            .collect();

        let headers: Vec<HeaderName> = self
            .allowed_headers
            .iter()
            .filter_map(|h| {
                h.parse().ok().or_else(|| {
                    tracing::warn!(header = %h, "Invalid CORS header, skipping");
                    None
                })
            })
            .collect();

        let mut layer = CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(AllowMethods::list(methods))
            .allow_headers(AllowHeaders::list(headers));

        if self.allow_credentials {
            layer = layer.allow_credentials(true);
        }

        Some(layer)
    }
}
