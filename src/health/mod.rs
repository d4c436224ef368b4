//! Health reporting.
//!
//! The broker's operating mode is part of the health payload so
//! operators can see degraded mode without grepping logs.

use axum::extract::State;
use axum::Json;

use crate::http::server::AppState;

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "broker": state.broker.mode().as_str(),
    }))
}
