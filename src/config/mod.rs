//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - A missing credential source is deliberately NOT a validation error:
//!   the gateway must still start and forward unsigned traffic; the
//!   credential store reports it on every refresh attempt instead

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::FailurePolicy;
pub use schema::GatewayConfig;
pub use schema::ListenerConfig;
pub use schema::SpnegoOutConfig;
