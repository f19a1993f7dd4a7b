//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → middleware.rs (segment rewrite → sign → bounded refresh-retry)
//!     → server.rs forward handler (hyper client to the rewritten target)
//!     → Response to client
//! ```

pub mod middleware;
pub mod server;

pub use middleware::{spnego_out_middleware, GatewayReport, SpnegoGateway};
pub use server::HttpServer;
