//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Root configuration for the SPNEGO gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, connection limits).
    pub listener: ListenerConfig,

    /// Outbound rewrite + signing settings.
    pub spnego: SpnegoOutConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum in-flight requests; excess requests queue until a slot frees.
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Per-instance rewrite and signing configuration.
///
/// Exactly one of `keytab_path` / `ccache_path` should be set; the credential
/// store refuses to build a credential otherwise.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SpnegoOutConfig {
    /// Scheme applied to rewritten requests. Empty or absent means plain http.
    pub scheme: Option<String>,

    /// 1-based index of the path segment carrying the destination host.
    /// 0 disables rewriting (signing-only mode, e.g. behind a load balancer).
    pub target_host_segment: usize,

    /// Realm configuration file; defaults to /etc/krb5.conf.
    pub krb_conf_path: Option<PathBuf>,

    /// Keytab holding long-term keys for the client principal.
    pub keytab_path: Option<PathBuf>,

    /// Credential cache holding a previously obtained ticket.
    pub ccache_path: Option<PathBuf>,

    /// Explicit client principal. For keytab sources this falls back to
    /// "USER/HOSTNAME" derived from the process environment.
    pub principal: Option<String>,

    /// Explicit realm; falls back to default_realm from the realm config.
    pub realm: Option<String>,

    /// Destination host → service principal name used when signing for that
    /// host. Hosts not listed here get a toolkit-derived SPN.
    pub spn_overrides: HashMap<String, String>,

    /// What to do with a request that could not be routed or signed.
    pub failure_policy: FailurePolicy,
}

/// Policy for requests that could not be rewritten or signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Forward the request anyway, unrouted/unsigned. This matches the
    /// legacy behavior: an authentication problem must never become an
    /// outage of the pipeline.
    #[default]
    FailOpen,

    /// Respond 502 instead of forwarding an unrouted or unsigned request.
    FailClosed,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
