//! The external Kerberos toolkit behind a trait seam.
//!
//! # Responsibilities
//! - Define the two operations the gateway needs from a Kerberos library:
//!   build a credential from configured material, and attach a SPNEGO
//!   header computed from that credential
//! - Keep the credential opaque so backends can store whatever they need
//!
//! # Design Decisions
//! - Trait object (`Arc<dyn SpnegoToolkit>`) rather than generics: the
//!   backend is chosen at startup from configuration/features, and tests
//!   substitute a scripted fake
//! - A rejected `apply_header` call is the only way staleness surfaces;
//!   the toolkit never exposes an expiry

use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::HeaderMap;
use thiserror::Error;

use crate::auth::realm::{RealmConfig, RealmConfigError, ResolvedIdentity};

/// Where the credential material comes from. Exactly one is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Long-term keys; the toolkit authenticates as the resolved principal.
    Keytab(PathBuf),
    /// A previously obtained ticket; the principal comes from the cache.
    Ccache(PathBuf),
}

impl CredentialSource {
    pub fn path(&self) -> &Path {
        match self {
            CredentialSource::Keytab(path) | CredentialSource::Ccache(path) => path,
        }
    }
}

/// Everything one refresh resolved before asking the toolkit for a credential.
#[derive(Debug, Clone)]
pub struct AcquireContext {
    pub source: CredentialSource,
    pub identity: ResolvedIdentity,
    pub realm_config: RealmConfig,
}

/// Failure to turn configured material into a usable credential.
#[derive(Debug, Error)]
pub enum CredentialLoadError {
    #[error(transparent)]
    RealmConfig(#[from] RealmConfigError),

    #[error("credential source {path} is unusable: {reason}")]
    Source { path: PathBuf, reason: String },

    #[error("kerberos toolkit rejected the credential material: {0}")]
    Toolkit(String),
}

/// Failure to compute or attach the authentication header.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("no credential available")]
    NoCredential,

    #[error("request has no destination host to sign for")]
    NoTargetHost,

    #[error("kerberos toolkit rejected the credential: {0}")]
    Rejected(String),

    #[error("computed token is not a valid header value")]
    InvalidHeader,
}

/// An opaque, replace-wholesale authentication handle.
///
/// Only the toolkit that produced the credential understands its handle;
/// everything else treats the value as immutable and swaps the whole thing.
pub struct Credential {
    principal: String,
    realm: String,
    handle: Arc<dyn Any + Send + Sync>,
}

impl Credential {
    pub fn new(
        principal: impl Into<String>,
        realm: impl Into<String>,
        handle: Arc<dyn Any + Send + Sync>,
    ) -> Self {
        Self {
            principal: principal.into(),
            realm: realm.into(),
            handle,
        }
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Toolkit-side accessor. Returns `None` when the handle was produced
    /// by a different toolkit implementation.
    pub fn handle<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.handle.downcast_ref()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // the handle may wrap key material; never print it
        f.debug_struct("Credential")
            .field("principal", &self.principal)
            .field("realm", &self.realm)
            .finish_non_exhaustive()
    }
}

/// The seam to the external Kerberos library.
pub trait SpnegoToolkit: Send + Sync {
    /// Build a fresh credential from the resolved context.
    fn acquire(&self, ctx: &AcquireContext) -> Result<Credential, CredentialLoadError>;

    /// Compute the SPNEGO token for `host` (or the explicit `spn` override)
    /// and attach it to `headers`. Mutates headers only.
    fn apply_header(
        &self,
        credential: &Credential,
        spn: Option<&str>,
        host: &str,
        headers: &mut HeaderMap,
    ) -> Result<(), SigningError>;
}

/// Placeholder backend used when the crate is built without `gssapi`.
///
/// Keeps the binary runnable for rewrite-only deployments; every signing
/// attempt degrades to an unsigned forward under the failure policy.
pub struct UnconfiguredToolkit;

impl SpnegoToolkit for UnconfiguredToolkit {
    fn acquire(&self, _ctx: &AcquireContext) -> Result<Credential, CredentialLoadError> {
        Err(CredentialLoadError::Toolkit(
            "built without the gssapi feature".into(),
        ))
    }

    fn apply_header(
        &self,
        _credential: &Credential,
        _spn: Option<&str>,
        _host: &str,
        _headers: &mut HeaderMap,
    ) -> Result<(), SigningError> {
        Err(SigningError::Rejected("built without the gssapi feature".into()))
    }
}
