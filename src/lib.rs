//! Fleet API request-processing core.
//!
//! The cross-cutting pipeline shared by every route of the fleet
//! dashboard backend:
//!
//! ```text
//!                 ┌──────────────────────────────────────────────┐
//!                 │                 FLEET API CORE               │
//!  Request ───────┼─▶ rate limit ─▶ authenticate ─▶ authorize ──┼─▶ route handler
//!                 │   (security)      (auth)          (auth)     │   (external)
//!                 │                                              │        │
//!  Response ◀─────┼── error translator ◀─────────────────────────┼────────┤
//!                 │   (http)                                     │        ▼
//!                 │                                   broker gateway ─▶ workers
//!                 │                                   (broker)         (external)
//!                 └──────────────────────────────────────────────┘
//! ```
//!
//! Business record handlers, the relational schema and the agent/ML
//! workers live outside this crate; they consume the `Identity`
//! extension and the `dispatch` contract exposed here.

// Core subsystems
pub mod auth;
pub mod broker;
pub mod config;
pub mod errors;
pub mod http;

// Cross-cutting concerns
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::FleetConfig;
pub use errors::ApiError;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
