//! Outbound SPNEGO signing gateway.
//!
//! A request-path component for a reverse-proxy pipeline that rewrites an
//! inbound request's target from an embedded path segment and signs the
//! outbound request with a Kerberos/SPNEGO header, transparently refreshing
//! the shared credential when the toolkit rejects it.

pub mod auth;
pub mod config;
pub mod http;
pub mod observability;
pub mod routing;

pub use auth::store::CredentialStore;
pub use auth::toolkit::{Credential, SpnegoToolkit};
pub use config::schema::GatewayConfig;
pub use http::middleware::SpnegoGateway;
pub use http::HttpServer;
pub use routing::segment::SegmentRouter;
