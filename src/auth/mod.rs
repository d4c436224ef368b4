//! Authentication and authorization subsystem.
//!
//! # Data Flow
//! ```text
//! Login:
//!     credentials → CredentialVerifier (external user store)
//!                 → tokens.rs (sign access + refresh pair)
//!                 → session.rs (record fingerprints)
//!
//! Per request:
//!     Authorization header → middleware.rs (verify token, check session)
//!                          → guard.rs (role allow-list)
//!                          → handler sees Identity extension
//! ```
//!
//! # Design Decisions
//! - Separate signing secrets per token kind: a leaked access token can
//!   never be replayed as a refresh token
//! - Session check after signature check, both answered with the same
//!   401 class so failures reveal nothing about which check tripped
//! - Token verification is pure; only the session lookup suspends

pub mod guard;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod session;
pub mod tokens;

pub use guard::{authorize, require_roles};
pub use middleware::{optional_auth, require_auth};
pub use models::{CredentialVerifier, Identity, Role, StaticCredentialVerifier, VerifiedUser};
pub use session::{MemorySessionStore, SessionMetadata, SessionRecord, SessionStore};
pub use tokens::{TokenError, TokenService};
