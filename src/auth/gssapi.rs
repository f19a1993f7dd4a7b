//! Real SPNEGO tokens via the platform Kerberos library.
//!
//! # Responsibilities
//! - Point the library at the configured keytab/ccache
//! - Produce the initial SPNEGO token and emit `Authorization: Negotiate`
//!
//! # Design Decisions
//! - `cross-krb5` wraps GSSAPI on unix and SSPI on windows behind one API
//! - Selection of credential material goes through the library's standard
//!   environment variables; that is process-global, which matches the
//!   one-store-per-process deployment this backend is intended for. The
//!   variables are written during the startup acquisition only; later
//!   refreshes see them already current and leave the environment alone,
//!   keeping `set_var` away from concurrent request threads
//! - HTTP SPNEGO needs only the first context token; the server's reply
//!   token (if any) is not consumed

use std::fs;
use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderValue};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cross_krb5::{ClientCtx, InitiateFlags};

use crate::auth::toolkit::{
    AcquireContext, Credential, CredentialLoadError, CredentialSource, SigningError, SpnegoToolkit,
};

/// `SpnegoToolkit` backed by the system Kerberos library.
pub struct CrossKrb5Toolkit;

struct Krb5Handle {
    principal: Option<String>,
}

/// Point the Kerberos library at the credential source through its standard
/// environment variables. Returns whether anything was written; a value that
/// is already current is not rewritten.
fn export_source(source: &CredentialSource) -> bool {
    let (key, path) = match source {
        CredentialSource::Keytab(path) => ("KRB5_CLIENT_KTNAME", path),
        CredentialSource::Ccache(path) => ("KRB5CCNAME", path),
    };
    if std::env::var_os(key).as_deref() == Some(path.as_os_str()) {
        return false;
    }
    std::env::set_var(key, path);
    true
}

impl SpnegoToolkit for CrossKrb5Toolkit {
    fn acquire(&self, ctx: &AcquireContext) -> Result<Credential, CredentialLoadError> {
        let path = ctx.source.path();
        fs::metadata(path).map_err(|e| CredentialLoadError::Source {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        export_source(&ctx.source);

        let principal = match (&ctx.identity.principal, &ctx.identity.realm) {
            (Some(principal), Some(realm)) => Some(format!("{principal}@{realm}")),
            (Some(principal), None) => Some(principal.clone()),
            (None, _) => None,
        };

        Ok(Credential::new(
            ctx.identity.principal.clone().unwrap_or_default(),
            ctx.identity.realm.clone().unwrap_or_default(),
            Arc::new(Krb5Handle { principal }),
        ))
    }

    fn apply_header(
        &self,
        credential: &Credential,
        spn: Option<&str>,
        host: &str,
        headers: &mut HeaderMap,
    ) -> Result<(), SigningError> {
        let handle = credential.handle::<Krb5Handle>().ok_or_else(|| {
            SigningError::Rejected("credential was not produced by this toolkit".into())
        })?;

        let spn = match spn {
            Some(spn) => spn.to_string(),
            // SPN convention strips the port
            None => format!("HTTP/{}", host.split(':').next().unwrap_or(host)),
        };

        let (_pending, token) =
            ClientCtx::new(InitiateFlags::empty(), handle.principal.as_deref(), &spn, None)
                .map_err(|e| SigningError::Rejected(e.to_string()))?;

        let value = format!("Negotiate {}", STANDARD.encode(&*token));
        let value = HeaderValue::from_str(&value).map_err(|_| SigningError::InvalidHeader)?;
        headers.insert(AUTHORIZATION, value);
        Ok(())
    }
}
