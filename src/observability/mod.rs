//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! middleware + credential store produce:
//!     → tracing events (structured log records)
//!     → metrics.rs (counters)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Failures never surface as error responses under fail-open, so logs
//!   and counters are the only place they are visible
//! - Metric updates are cheap (atomic increments)

pub mod metrics;
