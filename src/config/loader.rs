//! Configuration loading from disk.

use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {0}")]
    Validation(ValidationFailures),
}

/// Every semantic error found in one validation pass.
#[derive(Debug)]
pub struct ValidationFailures(pub Vec<ValidationError>);

impl fmt::Display for ValidationFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigFileError> {
    let content = fs::read_to_string(path)?;
    let config: GatewayConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(|errors| ConfigFileError::Validation(ValidationFailures(errors)))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::FailurePolicy;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [spnego]
            target_host_segment = 1
            keytab_path = "/etc/gateway.keytab"

            [spnego.spn_overrides]
            "foo.com:12345" = "HTTP/foo.example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.spnego.target_host_segment, 1);
        assert_eq!(config.spnego.failure_policy, FailurePolicy::FailOpen);
        assert_eq!(
            config.spnego.spn_overrides.get("foo.com:12345").map(String::as_str),
            Some("HTTP/foo.example.com")
        );
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn failure_policy_round_trips() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [spnego]
            failure_policy = "fail_closed"
            "#,
        )
        .unwrap();
        assert_eq!(config.spnego.failure_policy, FailurePolicy::FailClosed);
    }
}
