//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway
//! control plane. All types derive Serde traits for deserialization from
//! config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Admin API transport settings.
    pub admin: AdminConfig,

    /// API group registry settings.
    pub registry: RegistryConfig,

    /// Subsystem supervision settings.
    pub lifecycle: LifecycleConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Bind address (e.g., "127.0.0.1:2381").
    pub bind_address: String,

    /// Prefix every registered endpoint is mounted under.
    pub api_prefix: String,

    /// Bearer token required on every admin request, if set.
    pub api_key: Option<String>,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:2381".to_string(),
            api_prefix: "/apis/v1".to_string(),
            api_key: None,
            request_timeout_secs: 30,
            tls: None,
        }
    }
}

/// TLS configuration for the admin listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// What a registry mutation does when the change queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Wait for the consumer to free a slot. A stalled consumer stalls
    /// every registering subsystem.
    Block,
    /// Discard the event and count it.
    #[default]
    Drop,
}

/// Registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Capacity of the change event queue.
    pub notify_capacity: usize,

    /// Behaviour when the change event queue is full.
    pub overflow: OverflowPolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            notify_capacity: 10,
            overflow: OverflowPolicy::default(),
        }
    }
}

/// Lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Upper bound for each `stop`/`close` call in seconds; 0 waits forever.
    pub stop_timeout_secs: u64,
}

impl LifecycleConfig {
    pub fn stop_timeout(&self) -> Option<Duration> {
        (self.stop_timeout_secs > 0).then(|| Duration::from_secs(self.stop_timeout_secs))
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            stop_timeout_secs: 30,
        }
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
            log_format: LogFormat::default(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
