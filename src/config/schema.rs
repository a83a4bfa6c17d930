//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.
//!
//! Scopes nest as global → server → location. The `removeip` directive and the
//! access lists may appear at every level; unset values inherit from the
//! enclosing scope when the scope tree is compiled.

use serde::{Deserialize, Serialize};

use crate::masking::{Toggle, DEFAULT_PLACEHOLDER};
use crate::security::AccessRules;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoveIpConfig {
    /// Global `removeip` directive.
    pub removeip: Toggle,

    /// Address literal shown instead of the client address.
    pub placeholder: String,

    /// Global access rules.
    pub access: AccessRules,

    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Virtual servers.
    pub servers: Vec<ServerConfig>,
}

impl Default for RemoveIpConfig {
    fn default() -> Self {
        Self {
            removeip: Toggle::Unset,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            access: AccessRules::default(),
            listener: ListenerConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
            servers: Vec::new(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// A virtual server scope.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server identifier for logging/metrics.
    pub name: String,

    /// Host header to match (exact, case-insensitive). `None` marks a default server.
    pub host: Option<String>,

    /// `removeip` directive for this server.
    #[serde(skip_serializing_if = "Toggle::is_unset")]
    pub removeip: Toggle,

    pub access: AccessRules,

    pub locations: Vec<LocationConfig>,
}

/// A path scope inside a server.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Path prefix to match. Longest match wins.
    pub path_prefix: String,

    #[serde(skip_serializing_if = "Toggle::is_unset")]
    pub removeip: Toggle,

    pub access: AccessRules,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
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
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: RemoveIpConfig = toml::from_str("").unwrap();
        assert_eq!(config.removeip, Toggle::Unset);
        assert_eq!(config.placeholder, "0.0.0.0");
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert!(config.servers.is_empty());
    }

    #[test]
    fn nested_scopes_parse() {
        let config: RemoveIpConfig = toml::from_str(
            r#"
            removeip = "on"

            [access]
            deny = ["198.51.100.9"]

            [[servers]]
            name = "site"
            host = "example.com"
            removeip = "off"

            [[servers.locations]]
            path_prefix = "/private"
            removeip = "on"

            [[servers.locations]]
            path_prefix = "/static"
            "#,
        )
        .unwrap();

        assert_eq!(config.removeip, Toggle::On);
        assert_eq!(config.access.deny.len(), 1);
        let server = &config.servers[0];
        assert_eq!(server.host.as_deref(), Some("example.com"));
        assert_eq!(server.removeip, Toggle::Off);
        assert_eq!(server.locations[0].removeip, Toggle::On);
        assert_eq!(server.locations[1].removeip, Toggle::Unset);
    }
}
