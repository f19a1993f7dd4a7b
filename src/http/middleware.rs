//! Outbound SPNEGO middleware.
//!
//! # Responsibilities
//! - Per-request orchestration: ROUTE → SIGN → (SUCCESS | REFRESH_RETRY) → FORWARD
//! - Bounded self-healing: exactly one refresh and at most two sign
//!   attempts per request, so a stale-credential storm adds bounded
//!   latency instead of unbounded retries
//! - Apply the configured failure policy before handing off
//!
//! # Design Decisions
//! - Every error class is handled here; under fail-open nothing this
//!   middleware does can fail the pipeline
//! - The generation observed before the first sign attempt is what lets
//!   concurrent failures coalesce into a single refresh
//! - Forwarding happens in the axum `Next` chain, outside any lock

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::auth::signer::AuthHeaderSigner;
use crate::auth::store::CredentialStore;
use crate::auth::toolkit::{SigningError, SpnegoToolkit};
use crate::config::schema::{FailurePolicy, SpnegoOutConfig};
use crate::observability::metrics;
use crate::routing::segment::{RoutingError, SegmentRouter};

/// Per-request outcome, consumed by the failure policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayReport {
    pub routed: bool,
    pub signed: bool,
}

impl GatewayReport {
    fn ok(&self) -> bool {
        self.routed && self.signed
    }
}

/// One middleware instance: router + credential store + signer.
pub struct SpnegoGateway {
    router: SegmentRouter,
    store: Arc<CredentialStore>,
    signer: AuthHeaderSigner,
    policy: FailurePolicy,
}

impl SpnegoGateway {
    /// Build the gateway and eagerly attempt the first credential
    /// acquisition. An acquisition failure is logged, not fatal: the
    /// gateway starts anyway and degrades to unsigned forwarding until a
    /// per-request refresh succeeds.
    pub fn new(config: SpnegoOutConfig, toolkit: Arc<dyn SpnegoToolkit>) -> Result<Self, RoutingError> {
        let router = SegmentRouter::new(config.target_host_segment, config.scheme.as_deref())?;
        let signer = AuthHeaderSigner::new(toolkit.clone(), config.spn_overrides.clone());
        let policy = config.failure_policy;
        let store = Arc::new(CredentialStore::new(config, toolkit));

        if let Err(error) = store.refresh() {
            tracing::warn!(%error, "initial credential acquisition failed; forwarding unsigned until refresh succeeds");
        }

        Ok(Self {
            router,
            store,
            signer,
            policy,
        })
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// The shared credential store (exposed for operational probes).
    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Rewrite and sign `req` in place. Never fails; the report says what
    /// actually happened so the caller can apply the failure policy.
    pub fn prepare<B>(&self, req: &mut Request<B>) -> GatewayReport {
        let routed = match self.router.rewrite(req) {
            Ok(()) => {
                if self.router.is_enabled() {
                    metrics::record_rewrite();
                    tracing::debug!(
                        host = req.uri().authority().map(|a| a.as_str()).unwrap_or_default(),
                        path = req.uri().path(),
                        "request target rewritten"
                    );
                }
                true
            }
            Err(error) => {
                metrics::record_routing_error();
                tracing::warn!(%error, path = req.uri().path(), "segment rewrite failed; forwarding request unmodified");
                false
            }
        };

        let signed = self.sign_with_retry(req);
        GatewayReport { routed, signed }
    }

    /// SIGN → on failure: one coalesced refresh → one more SIGN.
    fn sign_with_retry<B>(&self, req: &mut Request<B>) -> bool {
        let observed = self.store.generation();

        match self.attempt_sign(req) {
            Ok(()) => {
                metrics::record_sign(true);
                return true;
            }
            Err(error) => {
                metrics::record_sign(false);
                tracing::warn!(%error, "signing failed; refreshing credential");
            }
        }

        match self.store.refresh_if_current(observed) {
            Ok(()) => metrics::record_refresh(true),
            Err(error) => {
                metrics::record_refresh(false);
                tracing::warn!(%error, "credential refresh failed");
            }
        }

        // retry exactly once, whatever the refresh outcome was
        match self.attempt_sign(req) {
            Ok(()) => {
                metrics::record_sign(true);
                true
            }
            Err(error) => {
                metrics::record_sign(false);
                tracing::warn!(%error, "signing failed after refresh; forwarding unsigned");
                false
            }
        }
    }

    fn attempt_sign<B>(&self, req: &mut Request<B>) -> Result<(), SigningError> {
        let credential = self.store.current().ok_or(SigningError::NoCredential)?;
        self.signer.sign(&credential, req)
    }
}

/// Axum middleware wrapping [`SpnegoGateway::prepare`] around the rest of
/// the handler chain.
pub async fn spnego_out_middleware(
    State(gateway): State<Arc<SpnegoGateway>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let report = gateway.prepare(&mut req);

    if gateway.policy() == FailurePolicy::FailClosed && !report.ok() {
        return (
            StatusCode::BAD_GATEWAY,
            "request could not be routed and signed",
        )
            .into_response();
    }

    next.run(req).await
}
