//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout log stream
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through all log lines via the trace layer
//! - Metric updates are cheap atomic operations
//! - The degraded-broker notice logs once, not per operation

pub mod logging;
pub mod metrics;
