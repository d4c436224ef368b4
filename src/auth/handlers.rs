//! Authentication route handlers.
//!
//! These are the only routes the core ships itself: login, refresh and
//! logout exercise the token service and session store end to end. The
//! business CRUD routes of the dashboard live outside this crate and
//! only consume the attached identity.

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::header::USER_AGENT;
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::auth::models::Identity;
use crate::auth::session::SessionMetadata;
use crate::errors::{ApiError, FieldError};
use crate::http::server::AppState;
use crate::observability::metrics;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
}

fn body_or_validation_error<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(ApiError::ValidationFailed(vec![FieldError::new(
            "body",
            rejection.body_text(),
        )])),
    }
}

fn session_metadata(headers: &HeaderMap, addr: SocketAddr) -> SessionMetadata {
    SessionMetadata {
        user_agent: headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        origin_addr: Some(addr.ip().to_string()),
    }
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenPairResponse>, ApiError> {
    let request = body_or_validation_error(body)?;

    let mut details = Vec::new();
    if request.email.is_empty() {
        details.push(FieldError::new("email", "must not be empty"));
    }
    if request.password.is_empty() {
        details.push(FieldError::new("password", "must not be empty"));
    }
    if !details.is_empty() {
        return Err(ApiError::ValidationFailed(details));
    }

    let user = state
        .credentials
        .verify(&request.email, &request.password)
        .await?
        .ok_or_else(|| {
            metrics::record_auth_failure("credentials");
            ApiError::unauthenticated("invalid credentials", "INVALID_CREDENTIALS")
        })?;

    let access = state
        .tokens
        .issue_access_token(&user.subject, &user.email, user.role)?;
    let refresh = state.tokens.issue_refresh_token(&user.subject)?;

    state
        .sessions
        .create_session(
            &user.subject,
            &access,
            &refresh,
            session_metadata(&headers, addr),
        )
        .await?;

    tracing::info!(subject = %user.subject, role = %user.role, "Login succeeded");
    Ok(Json(TokenPairResponse {
        access_token: access,
        refresh_token: refresh,
    }))
}

/// `POST /api/auth/refresh`
///
/// A refresh token is accepted only when its subject+fingerprint pair
/// matches a live session record; the session is then rotated so the
/// presented token can never be replayed. Every rejection on this path
/// answers the same `INVALID_SESSION` envelope: callers must not be able
/// to tell a bad signature from an expired token from a revoked session.
pub async fn refresh(
    State(state): State<AppState>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<TokenPairResponse>, ApiError> {
    let request = body_or_validation_error(body)?;

    let subject = state
        .tokens
        .verify_refresh_token(&request.refresh_token)
        .map_err(|e| {
            metrics::record_auth_failure("refresh_token");
            tracing::debug!(error = %e, "Refresh token rejected");
            ApiError::InvalidSession
        })?;

    let session = state
        .sessions
        .find_by_refresh_token(&subject, &request.refresh_token)
        .await?
        .ok_or_else(|| {
            metrics::record_auth_failure("refresh_session");
            ApiError::InvalidSession
        })?;

    // Refresh claims carry only the subject; current email and role come
    // from the external user store. A subject that vanished since login
    // gets the same 401 class as a dead session.
    let user = state
        .credentials
        .lookup(&subject)
        .await?
        .ok_or(ApiError::InvalidSession)?;

    let access = state
        .tokens
        .issue_access_token(&user.subject, &user.email, user.role)?;
    let refresh_token = state.tokens.issue_refresh_token(&user.subject)?;

    state
        .sessions
        .rotate_session(&session.id, &access, &refresh_token)
        .await?;

    tracing::debug!(subject = %subject, session = %session.id, "Session rotated");
    Ok(Json(TokenPairResponse {
        access_token: access,
        refresh_token: refresh_token,
    }))
}

/// `POST /api/auth/logout`
///
/// Invalidates every session for the subject, not just the presented one.
pub async fn logout(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let removed = state
        .sessions
        .delete_all_for_subject(&identity.subject)
        .await?;
    tracing::info!(subject = %identity.subject, sessions = removed, "Logged out");
    Ok(Json(serde_json::json!({ "success": true, "sessionsRevoked": removed })))
}

/// `GET /api/me`
pub async fn me(Extension(identity): Extension<Identity>) -> Json<Identity> {
    Json(identity)
}

/// `GET /api/public/status`
///
/// Soft-auth route: answers for everyone, with extra detail when a valid
/// identity is attached.
pub async fn public_status(
    State(state): State<AppState>,
    identity: Option<Extension<Identity>>,
) -> Json<serde_json::Value> {
    match identity {
        Some(Extension(identity)) => Json(serde_json::json!({
            "success": true,
            "authenticated": true,
            "viewer": identity.subject,
            "broker": state.broker.mode().as_str(),
        })),
        None => Json(serde_json::json!({
            "success": true,
            "authenticated": false,
        })),
    }
}

/// `GET /api/admin/overview`
pub async fn admin_overview(Extension(identity): Extension<Identity>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "success": true,
        "viewer": identity.subject,
        "fleetStatus": "nominal",
    }))
}

/// `POST /api/events/{domain}/{event}`
///
/// Hands a payload to the broker gateway and answers 202 whether or not
/// the broker is reachable.
pub async fn dispatch_event(
    State(state): State<AppState>,
    axum::extract::Path((domain, event)): axum::extract::Path<(String, String)>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let payload = body_or_validation_error(body)?;
    if !payload.is_object() {
        return Err(ApiError::ValidationFailed(vec![FieldError::new(
            "body",
            "payload must be a JSON object",
        )]));
    }

    let channel = format!("{domain}:{event}");
    state.broker.dispatch(&channel, payload).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "success": true, "channel": channel })),
    ))
}
