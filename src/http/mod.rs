//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (router assembly, middleware pipeline)
//!     → security::rate_limit (quota check + headers)
//!     → auth::middleware / auth::guard (identity, roles)
//!     → handler
//!     → translator.rs (uniform error envelope on any failure)
//!     → response to client
//! ```

pub mod server;
pub mod translator;

pub use server::{app, AppState, HttpServer};
