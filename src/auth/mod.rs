//! Outbound authentication subsystem.
//!
//! # Data Flow
//! ```text
//! refresh:
//!     realm.rs (read krb5.conf, snapshot environment)
//!         → resolve {principal, realm}
//!         → toolkit.rs acquire() (keytab or ccache)
//!         → store.rs atomic swap of the live credential
//!
//! per request:
//!     store.rs current()
//!         → signer.rs (SPN override lookup)
//!         → toolkit.rs apply_header()
//! ```
//!
//! # Design Decisions
//! - The Kerberos library is a black box behind the `SpnegoToolkit` trait;
//!   a rejected sign attempt is the only staleness signal we get
//! - The live credential is an immutable value swapped wholesale; readers
//!   never take the refresh lock
//! - Identity resolution is a pure function of {config, env snapshot,
//!   realm config}, evaluated once per refresh

pub mod realm;
pub mod signer;
pub mod store;
pub mod toolkit;

#[cfg(feature = "gssapi")]
pub mod gssapi;

pub use signer::AuthHeaderSigner;
pub use store::{ConfigError, CredentialStore, RefreshError};
pub use toolkit::{Credential, CredentialLoadError, SigningError, SpnegoToolkit};
