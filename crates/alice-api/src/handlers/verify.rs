//! Pass-through endpoints for law verification and draft comparison.

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use alice_core::JsonObject;

use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub text: String,
    #[serde(default)]
    pub focus: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub project_idx: i64,
    pub draft_json: JsonValue,
}

/// `POST /api/verifies/law`
pub async fn verify_law(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<JsonObject>, ApiError> {
    if req.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text is required".to_string()));
    }
    let focus = req.focus.as_deref().filter(|f| !f.trim().is_empty());
    Ok(Json(state.inference.verify(&req.text, focus).await?))
}

/// `POST /api/compare/draft`
pub async fn compare_draft(
    State(state): State<AppState>,
    Json(req): Json<CompareRequest>,
) -> Result<Json<JsonObject>, ApiError> {
    if req.draft_json.is_null() {
        return Err(ApiError::BadRequest("draft_json is required".to_string()));
    }
    Ok(Json(
        state
            .inference
            .compare_draft(req.project_idx, &req.draft_json)
            .await?,
    ))
}
