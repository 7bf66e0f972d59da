//! Liveness endpoint.

use axum::{extract::State, Json};
use serde_json::{json, Value as JsonValue};

use crate::AppState;

/// `GET /health`
pub async fn health_check(State(state): State<AppState>) -> Json<JsonValue> {
    Json(json!({
        "status": "ok",
        "storage": state.storage,
    }))
}
