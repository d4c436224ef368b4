//! Identity types shared across the auth subsystem.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::errors::ApiError;

/// Closed set of roles known to the fleet dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Technician,
    Customer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Technician => "technician",
            Role::Customer => "customer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims embedded in a signed access token.
///
/// Invariant: `exp > iat`; never persisted outside the token itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Claims embedded in a signed refresh token. The `kind` marker rejects
/// access tokens replayed against the refresh endpoint even before the
/// signature check would (different secrets).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub kind: String,
    pub iat: i64,
    pub exp: i64,
}

pub const REFRESH_KIND: &str = "refresh";

/// Authenticated identity attached to a request by the auth middleware.
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub subject: String,
    pub email: String,
    pub role: Role,
}

impl From<&AccessClaims> for Identity {
    fn from(claims: &AccessClaims) -> Self {
        Self {
            subject: claims.sub.clone(),
            email: claims.email.clone(),
            role: claims.role,
        }
    }
}

/// A user whose credentials the external user store accepted.
#[derive(Debug, Clone)]
pub struct VerifiedUser {
    pub subject: String,
    pub email: String,
    pub role: Role,
}

/// Contract consumed from the external user store: the core never reads
/// the relational schema itself.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Returns the matched user, or `None` when the credentials do not
    /// match. An `Err` means the store itself failed.
    async fn verify(&self, email: &str, password: &str) -> Result<Option<VerifiedUser>, ApiError>;

    /// Resolve a subject id to its current identity claims. Used by the
    /// refresh flow, where only the subject is known.
    async fn lookup(&self, subject: &str) -> Result<Option<VerifiedUser>, ApiError>;
}

/// In-memory verifier used by the binary until the fleet user store is
/// wired in, and by the integration tests.
#[derive(Default)]
pub struct StaticCredentialVerifier {
    users: DashMap<String, (String, VerifiedUser)>,
}

impl StaticCredentialVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, email: &str, password: &str, subject: &str, role: Role) {
        self.users.insert(
            email.to_string(),
            (
                password.to_string(),
                VerifiedUser {
                    subject: subject.to_string(),
                    email: email.to_string(),
                    role,
                },
            ),
        );
    }
}

#[async_trait]
impl CredentialVerifier for StaticCredentialVerifier {
    async fn verify(&self, email: &str, password: &str) -> Result<Option<VerifiedUser>, ApiError> {
        Ok(self.users.get(email).and_then(|entry| {
            let (stored, user) = entry.value();
            if stored == password {
                Some(user.clone())
            } else {
                None
            }
        }))
    }

    async fn lookup(&self, subject: &str) -> Result<Option<VerifiedUser>, ApiError> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.value().1.subject == subject)
            .map(|entry| entry.value().1.clone()))
    }
}
