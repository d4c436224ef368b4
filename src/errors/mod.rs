//! Failure taxonomy and wire error envelope.
//!
//! Every core component raises a typed failure; nothing is caught and
//! silently swallowed except the broker gateway's degraded-mode masking.
//! The single point that converts failures into HTTP responses is the
//! translator middleware in `http::translator`, which fills in the
//! request path and timestamp so the envelope is emitted in one place.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single field-level validation failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failures surfaced by the request-processing core.
///
/// The `Unauthenticated` and `InvalidSession` variants both map to 401 and
/// carry messages from the same wording class so a caller cannot tell which
/// check rejected a refresh attempt.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Missing, expired, or cryptographically invalid token.
    #[error("{message}")]
    Unauthenticated { message: String, code: &'static str },

    /// Token is valid but the backing session was revoked or rotated away.
    #[error("invalid session")]
    InvalidSession,

    /// Authenticated identity lacks a required role.
    #[error("insufficient permissions")]
    Forbidden,

    /// Fixed-window quota exhausted for the caller's identity key.
    #[error("too many requests, retry in {retry_after_secs}s")]
    RateLimitExceeded { retry_after_secs: u64 },

    /// Malformed request body, with field-level details.
    #[error("request validation failed")]
    ValidationFailed(Vec<FieldError>),

    /// Duplicate unique key.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    /// Broker or session-store failure that could not be masked.
    #[error("upstream dependency unavailable")]
    UpstreamUnavailable(String),

    /// Unclassified failure. The message is logged, never sent to clients
    /// outside of development mode.
    #[error("internal error")]
    Internal(String),
}

impl ApiError {
    pub fn unauthenticated(message: impl Into<String>, code: &'static str) -> Self {
        Self::Unauthenticated {
            message: message.into(),
            code,
        }
    }

    /// HTTP status this failure maps to. The table is closed: anything the
    /// taxonomy does not recognize is already `Internal`.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated { .. } | Self::InvalidSession => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable code carried in the envelope when present.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::Unauthenticated { code, .. } => Some(code),
            Self::InvalidSession => Some("INVALID_SESSION"),
            Self::Forbidden => Some("FORBIDDEN"),
            Self::RateLimitExceeded { .. } => Some("RATE_LIMITED"),
            Self::ValidationFailed(_) => Some("VALIDATION_FAILED"),
            _ => None,
        }
    }

    /// Message shown to clients. 5xx details are withheld unless the
    /// development flag is set.
    pub fn public_message(&self, development: bool) -> String {
        match self {
            Self::UpstreamUnavailable(detail) | Self::Internal(detail) if development => {
                detail.clone()
            }
            other => other.to_string(),
        }
    }
}

/// Uniform JSON error envelope sent for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    /// Canonical HTTP status name, e.g. "Unauthorized".
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    pub timestamp: DateTime<Utc>,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorEnvelope {
    pub fn from_error(err: &ApiError, path: String, development: bool) -> Self {
        let status = err.status();
        let stack = if development && status.is_server_error() {
            Some(format!("{err:?}"))
        } else {
            None
        };
        Self {
            success: false,
            error: status
                .canonical_reason()
                .unwrap_or("Internal Server Error")
                .to_string(),
            message: err.public_message(development),
            code: err.code().map(str::to_string),
            errors: match err {
                ApiError::ValidationFailed(details) => Some(details.clone()),
                _ => None,
            },
            timestamp: Utc::now(),
            path,
            stack,
        }
    }
}

impl IntoResponse for ApiError {
    /// Fallback rendering with an empty path. The translator middleware
    /// picks the error back up from the response extensions and re-emits
    /// the envelope with the request path and timestamp filled in.
    fn into_response(self) -> Response {
        let envelope = ErrorEnvelope::from_error(&self, String::new(), false);
        let mut response = (self.status(), Json(envelope)).into_response();
        response.extensions_mut().insert(self);
        response
    }
}
