//! SPN resolution and header signing.
//!
//! # Responsibilities
//! - Pick the service principal name for the request's destination host
//! - Ask the toolkit to compute and attach the authentication header
//!
//! # Design Decisions
//! - SPN lookup is an exact match on the rewritten host (including port);
//!   hosts not in the override map get a toolkit-derived SPN
//! - Headers only, never the body

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::header::HOST;
use axum::http::Request;

use crate::auth::toolkit::{Credential, SigningError, SpnegoToolkit};

/// Attaches the SPNEGO header for a given credential and destination.
pub struct AuthHeaderSigner {
    toolkit: Arc<dyn SpnegoToolkit>,
    spn_overrides: HashMap<String, String>,
}

impl AuthHeaderSigner {
    pub fn new(toolkit: Arc<dyn SpnegoToolkit>, spn_overrides: HashMap<String, String>) -> Self {
        Self {
            toolkit,
            spn_overrides,
        }
    }

    /// The SPN override for `host`, if one is configured.
    pub fn resolve_spn(&self, host: &str) -> Option<&str> {
        self.spn_overrides.get(host).map(String::as_str)
    }

    /// Sign `req` for its current destination host with `credential`.
    pub fn sign<B>(&self, credential: &Credential, req: &mut Request<B>) -> Result<(), SigningError> {
        let host = request_host(req)
            .ok_or(SigningError::NoTargetHost)?
            .to_string();
        let spn = self.resolve_spn(&host);
        self.toolkit
            .apply_header(credential, spn, &host, req.headers_mut())
    }
}

/// The destination the request will be forwarded to: the URI authority when
/// rewritten, else whatever the Host header says.
fn request_host<B>(req: &Request<B>) -> Option<&str> {
    req.uri()
        .authority()
        .map(|authority| authority.as_str())
        .or_else(|| req.headers().get(HOST).and_then(|value| value.to_str().ok()))
}
