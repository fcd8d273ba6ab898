//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the login relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Upstream identity provider endpoints and cookie names.
    pub provider: ProviderConfig,

    /// Inbound route paths.
    pub routes: RoutesConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Hosted identity provider the relay drives.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    /// Login entry point (first hop of the initiate flow).
    pub login_url: String,

    /// Completion endpoint (only hop of the complete flow).
    pub complete_url: String,

    /// Appended to the caller's `user` to form the login hint.
    pub login_hint_domain: String,

    /// `prompt` value replaced by the login hint.
    pub account_chooser_prompt: String,

    /// Inbound cookies forwarded to the completion hop, in priority order.
    pub session_cookies: Vec<String>,

    /// Cookies expired on the client once login completes.
    pub cleared_cookies: Vec<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            login_url: "https://swa.azurestaticapps.net/.auth/login/aad".to_string(),
            complete_url: "https://swa.azurestaticapps.net/.auth/complete".to_string(),
            login_hint_domain: "contoso.com".to_string(),
            account_chooser_prompt: "select_account".to_string(),
            session_cookies: vec![
                "StaticWebAppsAuthContextCookie".to_string(),
                "AppServiceAuthSession1".to_string(),
                "AppServiceAuthSession".to_string(),
            ],
            cleared_cookies: vec![
                "StaticWebAppsAuthContextCookie".to_string(),
                "Nonce".to_string(),
            ],
        }
    }
}

/// Inbound paths served by the relay.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RoutesConfig {
    /// Test endpoint returning a fixed JSON body.
    pub message_path: String,

    /// Starts a login.
    pub initiate_path: String,

    /// Provider returns here after login; also written into the rewritten state.
    pub completion_path: String,

    /// Where the browser lands once login completes.
    pub completion_redirect: String,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            message_path: "/api/message".to_string(),
            initiate_path: "/api/login-aad".to_string(),
            completion_path: "/api/login-aad-complete".to_string(),
            completion_redirect: "/login-aad-complete/".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connect + TLS + HTTP/2 handshake timeout in seconds.
    pub connect_secs: u64,

    /// Per-hop timeout (request sent to body drained) in seconds.
    pub hop_secs: u64,

    /// Whole inbound request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            hop_secs: 15,
            request_secs: 60,
        }
    }
}

/// Size limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum drained upstream body per hop.
    pub max_hop_body_bytes: usize,

    /// Maximum inbound request body.
    pub max_request_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_hop_body_bytes: 1024 * 1024,
            max_request_body_bytes: 64 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
