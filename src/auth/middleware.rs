//! Bearer-token authentication middleware.
//!
//! Composes the token service and the session store: the signature and
//! expiry checks are pure and run first, then the session store is asked
//! whether the token still backs a live session. Revoked or rotated-away
//! tokens fail the second check with the same 401 class as the first, so
//! callers cannot tell which one rejected them.

use axum::body::Body;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;

use crate::auth::models::Identity;
use crate::errors::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;

/// Pull the token out of `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Identity, ApiError> {
    let token = bearer_token(headers)
        .ok_or_else(|| ApiError::unauthenticated("missing bearer token", "TOKEN_MISSING"))?;

    let claims = state.tokens.verify_access_token(token).map_err(|e| {
        metrics::record_auth_failure("token");
        ApiError::from(e)
    })?;

    let session = state
        .sessions
        .find_by_access_token(&claims.sub, token)
        .await?;
    if session.is_none() {
        metrics::record_auth_failure("session");
        return Err(ApiError::InvalidSession);
    }

    Ok(Identity::from(&claims))
}

/// Require a valid token backed by a live session; attaches [`Identity`]
/// to the request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = authenticate(&state, request.headers()).await?;
    tracing::debug!(subject = %identity.subject, role = %identity.role, "Authenticated request");
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Soft-auth variant: attaches an identity when a valid one is presented
/// and lets the request through anonymously otherwise.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if let Ok(identity) = authenticate(&state, request.headers()).await {
        request.extensions_mut().insert(identity);
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn test_rejects_non_bearer_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.remove(AUTHORIZATION);
        assert_eq!(bearer_token(&headers), None);
    }
}
