//! Realm configuration and identity resolution.
//!
//! # Responsibilities
//! - Parse the subset of krb5.conf the gateway needs (default_realm)
//! - Snapshot the process environment once per refresh
//! - Resolve {principal, realm} from config, environment and realm config
//!
//! # Design Decisions
//! - The file is re-read on every refresh so realm rotations are picked up
//!   without a restart; nothing here is cached
//! - Unknown sections and directives are skipped, not rejected: the gateway
//!   only owns a few keys of a file shared with the whole host
//! - Resolution is a pure function; ambient `std::env` access is confined
//!   to `EnvSnapshot::capture`

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Well-known system location of the realm configuration.
pub const DEFAULT_REALM_CONFIG_PATH: &str = "/etc/krb5.conf";

/// Errors reading or parsing the realm configuration file.
#[derive(Debug, Error)]
pub enum RealmConfigError {
    #[error("failed to read realm config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unterminated section header at {path}:{line}")]
    UnterminatedSection { path: PathBuf, line: usize },
}

/// The realm defaults the gateway cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RealmConfig {
    /// `default_realm` from `[libdefaults]`, if declared.
    pub default_realm: Option<String>,
}

impl RealmConfig {
    /// Read and parse the file at `path`.
    pub fn load(path: &Path) -> Result<Self, RealmConfigError> {
        let text = fs::read_to_string(path).map_err(|source| RealmConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    fn parse(text: &str, path: &Path) -> Result<Self, RealmConfigError> {
        let mut section = String::new();
        let mut default_realm = None;

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(rest) = line.strip_prefix('[') {
                match rest.strip_suffix(']') {
                    Some(name) => section = name.trim().to_ascii_lowercase(),
                    None => {
                        return Err(RealmConfigError::UnterminatedSection {
                            path: path.to_path_buf(),
                            line: idx + 1,
                        })
                    }
                }
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                if section == "libdefaults" && key.trim().eq_ignore_ascii_case("default_realm") {
                    let value = value.trim();
                    if !value.is_empty() {
                        default_realm = Some(value.to_string());
                    }
                }
            }
            // anything else (brace blocks, include directives) is not ours
        }

        Ok(Self { default_realm })
    }
}

/// Environment values consulted when no explicit principal is configured.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    pub user: Option<String>,
    pub hostname: Option<String>,
}

impl EnvSnapshot {
    /// Capture the relevant variables from the process environment.
    pub fn capture() -> Self {
        Self {
            user: std::env::var("USER").ok().filter(|v| !v.is_empty()),
            hostname: std::env::var("HOSTNAME").ok().filter(|v| !v.is_empty()),
        }
    }
}

/// The principal/realm pair a refresh will authenticate as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub principal: Option<String>,
    pub realm: Option<String>,
}

/// Resolve the identity for one refresh. Explicit configuration wins; the
/// environment-derived principal keeps the legacy "USER/HOSTNAME" shape.
pub fn resolve_identity(
    explicit_principal: Option<&str>,
    explicit_realm: Option<&str>,
    env: &EnvSnapshot,
    realm_config: &RealmConfig,
) -> ResolvedIdentity {
    let principal = explicit_principal
        .filter(|p| !p.is_empty())
        .map(str::to_owned)
        .or_else(|| {
            env.user
                .as_deref()
                .map(|user| format!("{}/{}", user, env.hostname.as_deref().unwrap_or_default()))
        });

    let realm = explicit_realm
        .filter(|r| !r.is_empty())
        .map(str::to_owned)
        .or_else(|| realm_config.default_realm.clone());

    ResolvedIdentity { principal, realm }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r"
# system-wide kerberos configuration
[libdefaults]
  default_realm = EXAMPLE.COM
  dns_lookup_kdc = false

[realms]
  EXAMPLE.COM = {
    kdc = kdc1.example.com
    admin_server = kdc1.example.com
  }
";

    #[test]
    fn parses_default_realm() {
        let config = RealmConfig::parse(SAMPLE, Path::new("krb5.conf")).unwrap();
        assert_eq!(config.default_realm.as_deref(), Some("EXAMPLE.COM"));
    }

    #[test]
    fn realm_block_keys_do_not_leak_into_defaults() {
        let text = "[realms]\n  default_realm = WRONG.COM\n";
        let config = RealmConfig::parse(text, Path::new("krb5.conf")).unwrap();
        assert_eq!(config.default_realm, None);
    }

    #[test]
    fn unterminated_section_is_rejected() {
        let err = RealmConfig::parse("[libdefaults\n", Path::new("krb5.conf")).unwrap_err();
        assert!(matches!(err, RealmConfigError::UnterminatedSection { line: 1, .. }));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = RealmConfig::load(Path::new("/nonexistent/krb5.conf")).unwrap_err();
        assert!(matches!(err, RealmConfigError::Read { .. }));
    }

    #[test]
    fn explicit_identity_wins() {
        let env = EnvSnapshot {
            user: Some("alice".into()),
            hostname: Some("box1".into()),
        };
        let realm_config = RealmConfig {
            default_realm: Some("EXAMPLE.COM".into()),
        };
        let identity = resolve_identity(Some("svc/gateway"), Some("OTHER.ORG"), &env, &realm_config);
        assert_eq!(identity.principal.as_deref(), Some("svc/gateway"));
        assert_eq!(identity.realm.as_deref(), Some("OTHER.ORG"));
    }

    #[test]
    fn environment_fallback_uses_user_slash_hostname() {
        let env = EnvSnapshot {
            user: Some("alice".into()),
            hostname: Some("box1".into()),
        };
        let identity = resolve_identity(None, None, &env, &RealmConfig::default());
        assert_eq!(identity.principal.as_deref(), Some("alice/box1"));
        assert_eq!(identity.realm, None);
    }

    #[test]
    fn no_user_means_no_principal() {
        let identity = resolve_identity(None, None, &EnvSnapshot::default(), &RealmConfig::default());
        assert_eq!(identity.principal, None);
    }
}
