//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.
//! Every field has a default, so an empty file (or no file) reproduces the
//! reference behavior.

use serde::{Deserialize, Serialize};

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Outbound and shutdown timeouts.
    pub timeouts: TimeoutConfig,

    /// Session-data facility settings.
    pub session: SessionConfig,

    /// Request limits.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Maximum concurrently handled requests (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
            max_connections: 10_000,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Outbound connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Total outbound request timeout in seconds. Unset means no relay-imposed
    /// deadline.
    pub request_secs: Option<u64>,

    /// How long in-flight requests may keep running after a shutdown signal.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            request_secs: None,
            shutdown_grace_secs: 10,
        }
    }
}

/// Where session blobs live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    /// The blob is carried by the caller in a cookie.
    #[default]
    Cookie,
    /// The blob is kept server-side, keyed by a session-id cookie.
    Memory,
}

impl SessionBackend {
    /// Cookie name used when none is configured.
    pub fn default_cookie_name(self) -> &'static str {
        match self {
            SessionBackend::Cookie => "userdata",
            SessionBackend::Memory => "relay_sid",
        }
    }
}

/// Session-data facility configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Storage backend.
    pub backend: SessionBackend,

    /// Cookie carrying the blob (cookie backend) or the session id (memory
    /// backend). Defaults to `userdata` and `relay_sid` respectively.
    pub cookie_name: Option<String>,

    /// Lifetime of a stored blob in seconds.
    pub ttl_secs: u64,

    /// Issue `SameSite=None; Secure` cookies. Disable only when served over
    /// plain HTTP.
    pub secure: bool,

    /// Interval of the expired-entry sweep (memory backend).
    pub sweep_interval_secs: u64,

    /// Snapshot file loaded at startup and written at shutdown (memory backend).
    pub persistence_path: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::Cookie,
            cookie_name: None,
            ttl_secs: 86_400,
            secure: true,
            sweep_interval_secs: 300,
            persistence_path: None,
        }
    }
}

impl SessionConfig {
    /// The cookie name in effect for the configured backend.
    pub fn cookie_name(&self) -> &str {
        self.cookie_name
            .as_deref()
            .unwrap_or_else(|| self.backend.default_cookie_name())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes accepted by the session facility.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}
