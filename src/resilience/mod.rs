//! Resilience primitives.
//!
//! Every outbound broker call carries a deadline (enforced inside the
//! gateway); reconnection after a drop follows the jittered backoff
//! schedule defined here.

pub mod backoff;

pub use backoff::Backoff;
