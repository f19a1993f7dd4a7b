//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Catch contradictory credential sources before startup
//! - Validate value formats (scheme, bind address)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - A *missing* credential source passes validation; the gateway starts,
//!   forwards unsigned, and the refresh path reports the problem

use axum::http::uri::Scheme;
use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("keytab_path and ccache_path are mutually exclusive")]
    ConflictingCredentialSources,

    #[error("scheme {0:?} is not a valid URI scheme")]
    InvalidScheme(String),

    #[error("bind_address {0:?} is not a valid socket address")]
    InvalidBindAddress(String),

    #[error("spn override for host {0:?} maps to an empty SPN")]
    EmptySpnOverride(String),
}

/// Validate the full gateway configuration, collecting every error.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let spnego = &config.spnego;

    if spnego.keytab_path.is_some() && spnego.ccache_path.is_some() {
        errors.push(ValidationError::ConflictingCredentialSources);
    }

    if let Some(scheme) = spnego.scheme.as_deref() {
        if !scheme.is_empty() && scheme.parse::<Scheme>().is_err() {
            errors.push(ValidationError::InvalidScheme(scheme.to_string()));
        }
    }

    for (host, spn) in &spnego.spn_overrides {
        if spn.is_empty() {
            errors.push(ValidationError::EmptySpnOverride(host.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
