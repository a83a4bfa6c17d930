//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, connection limit > 0)
//! - Check the placeholder and bind addresses parse
//! - Detect duplicate server names and location prefixes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RemoveIpConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::RemoveIpConfig;
use crate::masking::Placeholder;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("placeholder {0:?} is not an IP address")]
    Placeholder(String),

    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("listener.max_connections must be greater than zero")]
    MaxConnections,

    #[error("timeouts.request_secs must be greater than zero")]
    RequestTimeout,

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),

    #[error("duplicate server name {0:?}")]
    DuplicateServer(String),

    #[error("server {server:?}: location prefix {prefix:?} must start with '/'")]
    LocationPrefix { server: String, prefix: String },

    #[error("server {server:?}: duplicate location prefix {prefix:?}")]
    DuplicateLocation { server: String, prefix: String },
}

/// Render a list of errors on one line.
pub fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validate a parsed configuration.
pub fn validate_config(config: &RemoveIpConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if Placeholder::parse(&config.placeholder).is_err() {
        errors.push(ValidationError::Placeholder(config.placeholder.clone()));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::MaxConnections);
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::RequestTimeout);
    }
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    let mut names = HashSet::new();
    for server in &config.servers {
        if !names.insert(server.name.as_str()) {
            errors.push(ValidationError::DuplicateServer(server.name.clone()));
        }

        let mut prefixes = HashSet::new();
        for location in &server.locations {
            if !location.path_prefix.starts_with('/') {
                errors.push(ValidationError::LocationPrefix {
                    server: server.name.clone(),
                    prefix: location.path_prefix.clone(),
                });
            }
            if !prefixes.insert(location.path_prefix.as_str()) {
                errors.push(ValidationError::DuplicateLocation {
                    server: server.name.clone(),
                    prefix: location.path_prefix.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
