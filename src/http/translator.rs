//! Error translator middleware.
//!
//! Handlers and inner middleware answer failures as [`ApiError`]; the
//! error's `IntoResponse` stashes the typed value in the response
//! extensions. This layer sits outside all of them and is the single
//! point that renders the wire envelope, filling in the request path and
//! timestamp and honoring the development flag for stack exposure.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::errors::{ApiError, ErrorEnvelope};
use crate::http::server::AppState;

pub async fn translate_errors(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let development = state.config.environment.is_development();

    let response = next.run(request).await;
    let (mut parts, body) = response.into_parts();

    let Some(error) = parts.extensions.remove::<ApiError>() else {
        return Response::from_parts(parts, body);
    };

    if parts.status.is_server_error() {
        tracing::error!(path = %path, error = ?error, "Request failed");
    }

    let envelope = ErrorEnvelope::from_error(&error, path, development);
    let mut translated = (parts.status, Json(envelope)).into_response();
    // Keep annotations other layers attached (rate-limit quota,
    // Retry-After, request id), but let the new body size itself.
    for (name, value) in parts.headers.iter() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            translated.headers_mut().insert(name.clone(), value.clone());
        }
    }
    translated
}
