//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (http::server / main):
//!     Load config → Validate → Build services → Spawn background tasks
//!     → Bind listener and accept traffic
//!
//! Shutdown (shutdown.rs):
//!     Signal received (signals.rs) → broadcast → sweeper and broker
//!     tasks exit → server drains → process exits
//! ```
//!
//! # Design Decisions
//! - Services are constructed once at startup and injected; no global
//!   singletons
//! - Background tasks subscribe to the broadcast and exit cooperatively

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
