//! Configuration subsystem.
//!
//! # Data Flow
//! ```text
//! TOML file → schema.rs (serde structs with per-struct defaults)
//!           → loader.rs (read, env-var secret overrides)
//!           → validation.rs (semantic checks, all errors collected)
//!           → accepted FleetConfig handed to startup
//! ```
//!
//! # Design Decisions
//! - Every section has a usable default; only the token secrets are
//!   mandatory
//! - Secrets never need to live in the file: env vars override
//! - Validation runs before the config is accepted into the system

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AuthConfig, AuthRateLimitConfig, BrokerConfig, Environment, FleetConfig,
    ObservabilityConfig, RateLimitConfig, ServerConfig,
};
