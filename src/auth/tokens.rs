//! Token issuance and verification.
//!
//! Access and refresh tokens are HS256-signed with distinct secrets, so
//! the two kinds are never interchangeable. Verification is a pure
//! function of the token and the key: no I/O, never suspends.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::auth::models::{AccessClaims, RefreshClaims, Role, REFRESH_KIND};
use crate::config::AuthConfig;
use crate::errors::ApiError;

/// Errors raised by token verification or issuance.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("malformed token")]
    Malformed,

    #[error("wrong token kind")]
    WrongKind,

    /// Signing failure. With HMAC keys this only happens on key
    /// misconfiguration, which validation rejects at startup.
    #[error("token signing failed: {0}")]
    Signing(#[from] Box<jsonwebtoken::errors::Error>),
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => {
                ApiError::unauthenticated("token expired", "TOKEN_EXPIRED")
            }
            TokenError::Malformed => {
                ApiError::unauthenticated("invalid token", "TOKEN_MALFORMED")
            }
            TokenError::WrongKind => {
                ApiError::unauthenticated("invalid token", "WRONG_TOKEN_KIND")
            }
            TokenError::Signing(e) => ApiError::Internal(format!("token signing failed: {e}")),
        }
    }
}

/// Issues and verifies signed access and refresh tokens.
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    validation: Validation,
}

impl TokenService {
    pub fn new(
        access_secret: &str,
        refresh_secret: &str,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // No leeway: an expired token is expired, which the tests for the
        // 401-on-expiry contract rely on.
        validation.leeway = 0;
        Self {
            access_encoding: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
            access_ttl,
            refresh_ttl,
            validation,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            &config.access_secret,
            &config.refresh_secret,
            Duration::seconds(config.access_ttl_secs as i64),
            Duration::seconds(config.refresh_ttl_secs as i64),
        )
    }

    /// Sign a short-lived access token for an authenticated subject.
    pub fn issue_access_token(
        &self,
        subject: &str,
        email: &str,
        role: Role,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: subject.to_string(),
            email: email.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.access_encoding)
            .map_err(|e| TokenError::Signing(Box::new(e)))
    }

    /// Sign a long-lived refresh token carrying only the subject and a
    /// kind marker.
    pub fn issue_refresh_token(&self, subject: &str) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: subject.to_string(),
            kind: REFRESH_KIND.to_string(),
            iat: now.timestamp(),
            exp: (now + self.refresh_ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.refresh_encoding)
            .map_err(|e| TokenError::Signing(Box::new(e)))
    }

    /// Verify an access token and return its claims.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        decode::<AccessClaims>(token, &self.access_decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(classify)
    }

    /// Verify a refresh token and return its subject.
    pub fn verify_refresh_token(&self, token: &str) -> Result<String, TokenError> {
        let claims = decode::<RefreshClaims>(token, &self.refresh_decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(classify)?;
        if claims.kind != REFRESH_KIND {
            return Err(TokenError::WrongKind);
        }
        Ok(claims.sub)
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed,
    }
}
