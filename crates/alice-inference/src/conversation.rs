//! Conversation session router.
//!
//! Picks the remote endpoint for a chat turn and interprets the loosely
//! shaped reply. The router holds no session state: the caller passes the
//! thread id it got from the previous turn and the reply echoes it back.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info};

use alice_core::{
    ChatTurn, ConversationRequest, Error, InferenceService, JsonObject, JsonObjectExt, Result,
};

use crate::config::{InferenceConfig, RoutingPolicy};

/// Routes chat turns to the remote generation service.
#[derive(Clone)]
pub struct ConversationRouter {
    service: Arc<dyn InferenceService>,
    config: InferenceConfig,
}

impl ConversationRouter {
    pub fn new(service: Arc<dyn InferenceService>, config: InferenceConfig) -> Self {
        Self { service, config }
    }

    /// Endpoint path for a turn under the configured routing policy.
    pub fn select_endpoint(&self, request: &ConversationRequest) -> &str {
        match (self.config.routing, request.active_thread()) {
            (RoutingPolicy::Thread, Some(_)) => &self.config.continue_path,
            _ => &self.config.generate_path,
        }
    }

    /// Run one chat turn.
    ///
    /// Failures of the remote call are wrapped in [`Error::Conversation`]
    /// carrying the endpoint and the original message. Nothing is retried.
    pub async fn route(&self, request: ConversationRequest) -> Result<ChatTurn> {
        let endpoint = self.select_endpoint(&request).to_string();
        debug!(
            subsystem = "inference",
            component = "conversation",
            op = "route",
            project_id = request.project_id,
            thread_id = request.active_thread().unwrap_or(""),
            routing = %self.config.routing,
            endpoint = %endpoint,
            "Selected conversation endpoint"
        );

        let start = Instant::now();
        let response = match self.service.converse(&request, &endpoint).await {
            Ok(response) => response,
            Err(e) => {
                error!(
                    subsystem = "inference",
                    component = "conversation",
                    op = "route",
                    project_id = request.project_id,
                    endpoint = %endpoint,
                    error = %e,
                    "Conversation turn failed"
                );
                return Err(Error::Conversation {
                    endpoint,
                    message: request.message,
                    reason: e.to_string(),
                });
            }
        };

        let turn = interpret_response(request.message, &response);
        info!(
            subsystem = "inference",
            component = "conversation",
            op = "route",
            project_id = request.project_id,
            endpoint = %endpoint,
            state = ?turn.state(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Conversation turn completed"
        );
        Ok(turn)
    }
}

/// Build a [`ChatTurn`] from a remote reply.
///
/// The resolved `ai_response` is the first non-empty of `message` (a
/// clarifying question), `generated_content` (a draft), and `ai_response`
/// (free text). A pending question always wins over a draft in the same reply.
pub fn interpret_response(user_message: String, response: &JsonObject) -> ChatTurn {
    let ai_response = ["message", "generated_content", "ai_response"]
        .iter()
        .find_map(|key| response.non_empty_str(key))
        .map(str::to_string);

    ChatTurn {
        user_message,
        ai_response,
        generated_content: response.str_field("generated_content").map(str::to_string),
        completed_content: response.object_field("completed_content").cloned(),
        full_process_result: response
            .get("full_process_result")
            .filter(|v| !v.is_null())
            .cloned(),
        thread_id: response.non_empty_str("thread_id").map(str::to_string),
        status: response.non_empty_str("status").map(str::to_string),
        message: response.str_field("message").map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockInferenceService;
    use alice_core::ConversationState;
    use serde_json::json;

    fn obj(value: serde_json::Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    fn request(thread_id: Option<&str>) -> ConversationRequest {
        ConversationRequest {
            message: "사업계획서 초안을 써줘".into(),
            user_idx: 7,
            project_id: 42,
            user_id: "kim".into(),
            thread_id: thread_id.map(str::to_string),
        }
    }

    fn router(mock: &MockInferenceService, routing: RoutingPolicy) -> ConversationRouter {
        ConversationRouter::new(
            Arc::new(mock.clone()),
            InferenceConfig {
                routing,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_question_beats_draft() {
        let turn = interpret_response(
            "hi".into(),
            &obj(json!({
                "message": "예산 규모를 알려주세요",
                "generated_content": "stale draft",
                "ai_response": "free text",
                "status": "waiting_for_input",
                "thread_id": "t-1"
            })),
        );
        assert_eq!(turn.ai_response.as_deref(), Some("예산 규모를 알려주세요"));
        assert_eq!(turn.generated_content.as_deref(), Some("stale draft"));
        assert_eq!(turn.state(), ConversationState::AwaitingInput);
    }

    #[test]
    fn test_empty_message_falls_through() {
        let turn = interpret_response(
            "hi".into(),
            &obj(json!({"message": "", "generated_content": "draft", "ai_response": "x"})),
        );
        assert_eq!(turn.ai_response.as_deref(), Some("draft"));

        let turn = interpret_response(
            "hi".into(),
            &obj(json!({"message": null, "generated_content": "  ", "ai_response": "free"})),
        );
        assert_eq!(turn.ai_response.as_deref(), Some("free"));

        let turn = interpret_response("hi".into(), &JsonObject::new());
        assert_eq!(turn.ai_response, None);
        assert_eq!(turn.state(), ConversationState::NoSession);
    }

    #[test]
    fn test_passthrough_fields() {
        let turn = interpret_response(
            "hi".into(),
            &obj(json!({
                "generated_content": "draft",
                "completed_content": {"type": "doc", "content": []},
                "full_process_result": [1, 2, 3],
                "thread_id": "t-9",
                "status": "completed"
            })),
        );
        assert_eq!(
            turn.completed_content,
            Some(obj(json!({"type": "doc", "content": []})))
        );
        assert_eq!(turn.full_process_result, Some(json!([1, 2, 3])));
        assert_eq!(turn.state(), ConversationState::Completed);
    }

    #[test]
    fn test_absent_optional_fields_are_not_errors() {
        let turn = interpret_response(
            "hi".into(),
            &obj(json!({
                "ai_response": "ok",
                "full_process_result": null,
                "completed_content": "junk"
            })),
        );
        assert_eq!(turn.full_process_result, None);
        assert_eq!(turn.completed_content, None);
    }

    #[test]
    fn test_single_routing_ignores_thread() {
        let mock = MockInferenceService::new();
        let r = router(&mock, RoutingPolicy::Single);
        assert_eq!(r.select_endpoint(&request(None)), "/generate");
        assert_eq!(r.select_endpoint(&request(Some("t-1"))), "/generate");
    }

    #[test]
    fn test_thread_routing_uses_continue_path() {
        let mock = MockInferenceService::new();
        let r = router(&mock, RoutingPolicy::Thread);
        assert_eq!(r.select_endpoint(&request(None)), "/generate");
        assert_eq!(r.select_endpoint(&request(Some(" "))), "/generate");
        assert_eq!(
            r.select_endpoint(&request(Some("t-1"))),
            "/generate/continue"
        );
    }

    #[tokio::test]
    async fn test_route_sends_request_to_selected_endpoint() {
        let mock = MockInferenceService::new().with_converse_response(json!({
            "generated_content": "초안",
            "thread_id": "t-1",
            "status": "completed"
        }));
        let r = router(&mock, RoutingPolicy::Thread);

        let turn = r.route(request(Some("t-1"))).await.unwrap();
        assert_eq!(turn.ai_response.as_deref(), Some("초안"));
        assert_eq!(turn.thread_id.as_deref(), Some("t-1"));

        let calls = mock.converse_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "/generate/continue");
        assert_eq!(calls[0].1.project_id, 42);
    }

    #[tokio::test]
    async fn test_route_wraps_failure() {
        let mock = MockInferenceService::new().with_failure("connection refused");
        let r = router(&mock, RoutingPolicy::Single);

        let err = r.route(request(None)).await.unwrap_err();
        match err {
            Error::Conversation {
                endpoint,
                message,
                reason,
            } => {
                assert_eq!(endpoint, "/generate");
                assert_eq!(message, "사업계획서 초안을 써줘");
                assert!(reason.contains("connection refused"));
            }
            other => panic!("expected Conversation error, got {:?}", other),
        }
        assert!(Error::Conversation {
            endpoint: String::new(),
            message: String::new(),
            reason: String::new()
        }
        .is_transport());
    }
}
