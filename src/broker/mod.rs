//! Broker subsystem.
//!
//! # Data Flow
//! ```text
//! Route handler → gateway.dispatch(channel, payload)
//!              → serialize {timestamp, ...payload}
//!              → publish on "<domain>:<event>"
//!              → out-of-process worker (external) consumes
//!
//! Broker down anywhere along the line → drop silently, request
//! completes normally, health reports Degraded.
//! ```
//!
//! # Design Decisions
//! - One gateway owns the connection handles; nobody else opens or
//!   closes them
//! - Degraded mode is an explicit flag, not scattered null checks
//! - No schema enforced on payloads; validation is the dispatcher's job

pub mod gateway;

pub use gateway::{BrokerGateway, BrokerMode};
