//! HTTP server setup and forwarding.
//!
//! # Responsibilities
//! - Create the Axum router with the SPNEGO middleware layered in
//! - Forward rewritten requests to their upstream target
//! - Wire up tracing, request timeout, and concurrency limit layers
//! - Bind server to listener, serve with graceful shutdown
//!
//! # Design Decisions
//! - The forward handler trusts the URI the middleware produced; a request
//!   that still has no authority has nowhere to go and gets a 502
//! - The body streams through untouched in both directions
//! - `listener.max_connections` caps in-flight requests with one semaphore
//!   shared across connections; excess requests queue inside the request
//!   timeout rather than being rejected

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::auth::toolkit::SpnegoToolkit;
use crate::config::GatewayConfig;
use crate::http::middleware::{spnego_out_middleware, SpnegoGateway};
use crate::routing::segment::RoutingError;

/// State injected into the forward handler.
#[derive(Clone)]
pub struct AppState {
    pub client: Client<HttpConnector, Body>,
}

/// HTTP server for the SPNEGO gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a new server with the given configuration and toolkit.
    pub fn new(config: GatewayConfig, toolkit: Arc<dyn SpnegoToolkit>) -> Result<Self, RoutingError> {
        let gateway = Arc::new(SpnegoGateway::new(config.spnego.clone(), toolkit)?);

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let state = AppState { client };

        let router = Router::new()
            .route("/{*path}", any(forward_handler))
            .route("/", any(forward_handler))
            .with_state(state)
            .layer(middleware::from_fn_with_state(gateway, spnego_out_middleware))
            .layer(connection_limit(config.listener.max_connections))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http());

        Ok(Self { router, config })
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Request cap shared by every connection the server accepts.
fn connection_limit(max_connections: usize) -> GlobalConcurrencyLimitLayer {
    GlobalConcurrencyLimitLayer::new(max_connections)
}

/// Forward the (rewritten, signed) request to its upstream target.
async fn forward_handler(State(state): State<AppState>, req: Request<Body>) -> Response {
    let Some(authority) = req.uri().authority() else {
        // segment 0 or a failed rewrite: this deployment has no upstream
        tracing::warn!(path = req.uri().path(), "request has no upstream target");
        return (StatusCode::BAD_GATEWAY, "no upstream target in request").into_response();
    };
    let upstream = authority.to_string();

    match state.client.request(req).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(error) => {
            tracing::error!(%error, upstream = %upstream, "upstream request failed");
            (StatusCode::BAD_GATEWAY, "upstream request failed").into_response()
        }
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("failed to install Ctrl+C handler");
        return;
    }
    tracing::info!("shutdown signal received");
}
