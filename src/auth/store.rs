//! Credential lifecycle: build, share, refresh.
//!
//! # Responsibilities
//! - Hold the one live credential shared by all in-flight requests
//! - Rebuild it on demand from {config, realm config, environment}
//! - Serialize refreshes and coalesce the ones racing on the same failure
//!
//! # Design Decisions
//! - `arc-swap` for the live handle: readers never block, a reader can
//!   never observe a partially built credential
//! - One mutex guards the rebuild only; it is never held on the signing
//!   or forwarding path
//! - A failed refresh leaves the previous credential and generation in
//!   place; the store never trades a working credential for nothing
//! - The realm config file is re-read on every refresh, never cached

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwapOption;
use thiserror::Error;

use crate::auth::realm::{resolve_identity, EnvSnapshot, RealmConfig, DEFAULT_REALM_CONFIG_PATH};
use crate::auth::toolkit::{
    AcquireContext, Credential, CredentialLoadError, CredentialSource, SpnegoToolkit,
};
use crate::config::schema::SpnegoOutConfig;

/// Missing or contradictory configuration. Not retryable without an
/// operator fixing the config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("either keytab_path or ccache_path must be configured")]
    MissingCredentialSource,

    #[error("keytab_path and ccache_path are mutually exclusive")]
    ConflictingCredentialSources,

    #[error("no principal configured and none derivable from the environment")]
    MissingPrincipal,

    #[error("no realm configured and no default_realm in {0}")]
    MissingRealm(PathBuf),
}

/// Why a refresh attempt failed. The previous credential survives either way.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Load(#[from] CredentialLoadError),
}

/// Owns the lifecycle of one shared credential.
pub struct CredentialStore {
    toolkit: Arc<dyn SpnegoToolkit>,
    config: SpnegoOutConfig,
    current: ArcSwapOption<Credential>,
    refresh_gate: Mutex<()>,
    generation: AtomicU64,
}

impl CredentialStore {
    /// Create an empty store. No credential is acquired until `refresh`.
    pub fn new(config: SpnegoOutConfig, toolkit: Arc<dyn SpnegoToolkit>) -> Self {
        Self {
            toolkit,
            config,
            current: ArcSwapOption::empty(),
            refresh_gate: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Lock-free read of the live credential.
    pub fn current(&self) -> Option<Arc<Credential>> {
        self.current.load_full()
    }

    /// Monotonic counter, bumped once per successful refresh. Readers pair
    /// it with `current()` to detect that someone else already refreshed.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Unconditionally rebuild the credential.
    pub fn refresh(&self) -> Result<(), RefreshError> {
        let gate = self.lock_gate();
        self.rebuild(&gate)
    }

    /// Rebuild only if no refresh has completed since `observed` was read.
    /// Requests racing on the same stale credential collapse into one
    /// rebuild; the latecomers return immediately and re-try signing.
    pub fn refresh_if_current(&self, observed: u64) -> Result<(), RefreshError> {
        let gate = self.lock_gate();
        if self.generation.load(Ordering::Acquire) != observed {
            return Ok(());
        }
        self.rebuild(&gate)
    }

    fn lock_gate(&self) -> MutexGuard<'_, ()> {
        // a panic mid-refresh leaves no partial state to be poisoned by
        self.refresh_gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn rebuild(&self, _gate: &MutexGuard<'_, ()>) -> Result<(), RefreshError> {
        let source = self.credential_source()?;

        let realm_path = self
            .config
            .krb_conf_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REALM_CONFIG_PATH));
        let realm_config = RealmConfig::load(&realm_path).map_err(CredentialLoadError::from)?;

        let identity = resolve_identity(
            self.config.principal.as_deref(),
            self.config.realm.as_deref(),
            &EnvSnapshot::capture(),
            &realm_config,
        );

        // a keytab is anonymous key material; it needs a full client identity.
        // a ccache carries its own principal and realm.
        if matches!(source, CredentialSource::Keytab(_)) {
            if identity.principal.is_none() {
                return Err(ConfigError::MissingPrincipal.into());
            }
            if identity.realm.is_none() {
                return Err(ConfigError::MissingRealm(realm_path).into());
            }
        }

        let ctx = AcquireContext {
            source,
            identity,
            realm_config,
        };
        let credential = self.toolkit.acquire(&ctx)?;

        tracing::debug!(
            principal = credential.principal(),
            realm = credential.realm(),
            "credential refreshed"
        );
        self.current.store(Some(Arc::new(credential)));
        self.generation.fetch_add(1, Ordering::Release);
        Ok(())
    }

    fn credential_source(&self) -> Result<CredentialSource, ConfigError> {
        let keytab = self.config.keytab_path.as_ref().filter(|p| !p.as_os_str().is_empty());
        let ccache = self.config.ccache_path.as_ref().filter(|p| !p.as_os_str().is_empty());
        match (keytab, ccache) {
            (Some(path), None) => Ok(CredentialSource::Keytab(path.clone())),
            (None, Some(path)) => Ok(CredentialSource::Ccache(path.clone())),
            (Some(_), Some(_)) => Err(ConfigError::ConflictingCredentialSources),
            (None, None) => Err(ConfigError::MissingCredentialSource),
        }
    }
}
