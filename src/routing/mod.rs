//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path /prefix/host:port/rest...)
//!     → segment.rs (extract host from configured segment)
//!     → Rewrite: scheme + authority + path + Host header
//!     → Return: rewritten request, or RoutingError (request untouched)
//! ```
//!
//! # Design Decisions
//! - Pure request mutation; no shared state, no body access
//! - All fallible conversions happen before any field is written, so a
//!   failed rewrite leaves the request exactly as received
//! - Segment 0 disables rewriting (signing-only mode)

pub mod segment;

pub use segment::RoutingError;
pub use segment::SegmentRouter;
