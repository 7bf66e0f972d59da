//! Chat endpoint backed by the conversation router.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use alice_core::{ChatTurn, ConversationRequest, ConversationState};

use crate::{ApiError, AppState};

/// `POST /api/ai-chat/response` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub user_message: String,
    pub user_idx: i64,
    #[serde(rename = "projectIdx")]
    pub project_id: i64,
    /// Absent or null from clients that only send `userIdx`.
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
}

/// A chat turn plus the conversation state it leaves behind.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    #[serde(flatten)]
    pub turn: ChatTurn,
    pub state: ConversationState,
}

pub async fn chat_response(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if req.user_message.trim().is_empty() {
        return Err(ApiError::BadRequest("userMessage is required".to_string()));
    }

    let turn = state
        .conversations
        .route(ConversationRequest {
            message: req.user_message,
            user_idx: req.user_idx,
            project_id: req.project_id,
            user_id: req.user_id.unwrap_or_default(),
            thread_id: req.thread_id,
        })
        .await?;

    let conversation_state = turn.state();
    Ok(Json(ChatResponse {
        turn,
        state: conversation_state,
    }))
}
