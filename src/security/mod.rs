//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (general fixed-window check, quota headers)
//!     → auth routes only: second, stricter rate_limit.rs instance
//!     → pass to authentication
//! ```
//!
//! # Design Decisions
//! - Fail closed: quota exhaustion rejects before any handler runs
//! - Quota metadata is always annotated, allowed or not
//! - The stricter auth limiter's headers win on auth routes

pub mod rate_limit;

pub use rate_limit::{rate_limit_middleware, spawn_sweeper, RateLimitDecision, RateLimiter};
