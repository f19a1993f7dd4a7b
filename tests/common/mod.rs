//! Shared test utilities: a scriptable fake Kerberos toolkit and config builders.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderValue};
use spnego_gateway::auth::toolkit::{
    AcquireContext, Credential, CredentialLoadError, SigningError, SpnegoToolkit,
};
use spnego_gateway::config::schema::SpnegoOutConfig;

/// Opaque handle the fake toolkit hands out; the id makes successive
/// credentials distinguishable.
pub struct FakeHandle {
    pub id: usize,
}

/// Scriptable stand-in for the Kerberos library.
#[derive(Default)]
pub struct FakeToolkit {
    pub acquire_calls: AtomicUsize,
    pub sign_calls: AtomicUsize,
    /// Number of upcoming sign attempts to reject.
    reject_signs: AtomicUsize,
    /// When set, every acquire fails.
    pub fail_acquire: AtomicBool,
    /// SPN (None = toolkit-derived) each sign attempt was asked to use.
    pub seen_spns: Mutex<Vec<Option<String>>>,
}

impl FakeToolkit {
    pub fn reject_next_signs(&self, n: usize) {
        self.reject_signs.store(n, Ordering::SeqCst);
    }
}

impl SpnegoToolkit for FakeToolkit {
    fn acquire(&self, ctx: &AcquireContext) -> Result<Credential, CredentialLoadError> {
        let id = self.acquire_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_acquire.load(Ordering::SeqCst) {
            return Err(CredentialLoadError::Toolkit("scripted acquire failure".into()));
        }
        Ok(Credential::new(
            ctx.identity.principal.clone().unwrap_or_else(|| "anonymous".into()),
            ctx.identity.realm.clone().unwrap_or_default(),
            Arc::new(FakeHandle { id }),
        ))
    }

    fn apply_header(
        &self,
        credential: &Credential,
        spn: Option<&str>,
        _host: &str,
        headers: &mut HeaderMap,
    ) -> Result<(), SigningError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_spns.lock().unwrap().push(spn.map(str::to_owned));

        let remaining = self.reject_signs.load(Ordering::SeqCst);
        if remaining > 0 {
            self.reject_signs.store(remaining - 1, Ordering::SeqCst);
            return Err(SigningError::Rejected("scripted rejection".into()));
        }

        let id = credential.handle::<FakeHandle>().map(|h| h.id).unwrap_or(usize::MAX);
        let value = HeaderValue::from_str(&format!("Negotiate fake-token-{id}")).unwrap();
        headers.insert(AUTHORIZATION, value);
        Ok(())
    }
}

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Serializes tests that read or mutate process environment variables.
pub fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

fn scratch_path(name: &str, suffix: &str) -> PathBuf {
    std::env::temp_dir().join(format!("spnego-gateway-{name}-{}.{suffix}", std::process::id()))
}

/// Write a minimal krb5.conf declaring `default_realm` and return its path.
pub fn write_realm_config(name: &str, default_realm: &str) -> PathBuf {
    let path = scratch_path(name, "conf");
    std::fs::write(
        &path,
        format!("[libdefaults]\n  default_realm = {default_realm}\n"),
    )
    .unwrap();
    path
}

/// A keytab-sourced config with an explicit principal and a readable realm
/// config, rewriting from segment 1.
pub fn keytab_config(name: &str) -> SpnegoOutConfig {
    let keytab = scratch_path(name, "keytab");
    std::fs::write(&keytab, [0x05, 0x02]).unwrap();

    SpnegoOutConfig {
        target_host_segment: 1,
        krb_conf_path: Some(write_realm_config(name, "EXAMPLE.COM")),
        keytab_path: Some(keytab),
        principal: Some("svc/gateway".into()),
        ..Default::default()
    }
}
