//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and address formats
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("admin.api_prefix must start with '/' and not end with '/', got {0:?}")]
    InvalidPrefix(String),

    #[error("registry.notify_capacity must be greater than zero")]
    ZeroCapacity,

    #[error("admin.request_timeout_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("admin.tls.{0} must not be empty")]
    EmptyTlsPath(&'static str),

    #[error("admin and metrics listeners share address {0}")]
    AddressConflict(String),
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let admin_addr = check_address(
        "admin.bind_address",
        &config.admin.bind_address,
        &mut errors,
    );

    let prefix = &config.admin.api_prefix;
    if !prefix.is_empty() && (!prefix.starts_with('/') || prefix.ends_with('/')) {
        errors.push(ValidationError::InvalidPrefix(prefix.clone()));
    }

    if config.admin.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if let Some(tls) = &config.admin.tls {
        if tls.cert_path.is_empty() {
            errors.push(ValidationError::EmptyTlsPath("cert_path"));
        }
        if tls.key_path.is_empty() {
            errors.push(ValidationError::EmptyTlsPath("key_path"));
        }
    }

    if config.registry.notify_capacity == 0 {
        errors.push(ValidationError::ZeroCapacity);
    }

    if config.observability.metrics_enabled {
        let metrics_addr = check_address(
            "observability.metrics_address",
            &config.observability.metrics_address,
            &mut errors,
        );
        if let (Some(a), Some(m)) = (admin_addr, metrics_addr) {
            if a == m {
                errors.push(ValidationError::AddressConflict(a.to_string()));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(
    field: &'static str,
    value: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<SocketAddr> {
    match value.parse() {
        Ok(addr) => Some(addr),
        Err(_) => {
            errors.push(ValidationError::InvalidAddress {
                field,
                value: value.to_string(),
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::TlsConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GatewayConfig::default();
        config.admin.bind_address = "not-an-address".into();
        config.admin.api_prefix = "apis/".into();
        config.registry.notify_capacity = 0;
        config.admin.tls = Some(TlsConfig {
            cert_path: String::new(),
            key_path: "key.pem".into(),
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::ZeroCapacity));
        assert!(errors.contains(&ValidationError::EmptyTlsPath("cert_path")));
    }

    #[test]
    fn test_empty_prefix_allowed() {
        let mut config = GatewayConfig::default();
        config.admin.api_prefix = String::new();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_metrics_address_conflict() {
        let mut config = GatewayConfig::default();
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = config.admin.bind_address.clone();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::AddressConflict("127.0.0.1:2381".into())]
        );
    }
}
