//! Mock inference service for deterministic testing.
//!
//! Returns canned responses and records every call for assertions.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use alice_inference::mock::MockInferenceService;
//! use serde_json::json;
//!
//! let service = MockInferenceService::new()
//!     .with_analyze_response(json!({"features": [], "table_of_contents": null}));
//! assert_eq!(service.call_count(), 0);
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

use alice_core::{
    into_object, ConversationRequest, Error, FileHandle, FolderTag, InferenceService, JsonObject,
    Result,
};

use crate::client::validate_analyze_input;

/// Mock inference service for testing.
#[derive(Clone, Default)]
pub struct MockInferenceService {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

#[derive(Debug, Clone, Default)]
struct MockConfig {
    analyze_response: Option<JsonValue>,
    converse_response: Option<JsonValue>,
    default_response: Option<JsonValue>,
    failure: Option<String>,
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Analyze(AnalyzeCall),
    Converse {
        endpoint: String,
        request: ConversationRequest,
    },
    FetchToc {
        project_id: i64,
    },
    Verify {
        text: String,
        focus: Option<String>,
    },
    CompareDraft {
        project_id: i64,
        draft: JsonValue,
    },
}

/// A recorded `analyze` call. File contents are reduced to names and sizes.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzeCall {
    pub file_names: Vec<String>,
    pub file_sizes: Vec<usize>,
    pub folders: Vec<FolderTag>,
    pub user_id: String,
    pub project_id: i64,
}

impl MockInferenceService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Response for `analyze`. Default: no features, no table of contents.
    pub fn with_analyze_response(mut self, response: JsonValue) -> Self {
        Arc::make_mut(&mut self.config).analyze_response = Some(response);
        self
    }

    /// Response for `converse`. Default: a plain `ai_response`.
    pub fn with_converse_response(mut self, response: JsonValue) -> Self {
        Arc::make_mut(&mut self.config).converse_response = Some(response);
        self
    }

    /// Response for table of contents, verification, and comparison calls.
    pub fn with_response(mut self, response: JsonValue) -> Self {
        Arc::make_mut(&mut self.config).default_response = Some(response);
        self
    }

    /// Make every call fail with a transport error.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).failure = Some(message.into());
        self
    }

    fn log(&self) -> MutexGuard<'_, Vec<MockCall>> {
        self.call_log.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get all logged calls for assertion.
    pub fn calls(&self) -> Vec<MockCall> {
        self.log().clone()
    }

    pub fn call_count(&self) -> usize {
        self.log().len()
    }

    pub fn analyze_calls(&self) -> Vec<AnalyzeCall> {
        self.log()
            .iter()
            .filter_map(|c| match c {
                MockCall::Analyze(call) => Some(call.clone()),
                _ => None,
            })
            .collect()
    }

    /// `(endpoint, request)` of every `converse` call.
    pub fn converse_calls(&self) -> Vec<(String, ConversationRequest)> {
        self.log()
            .iter()
            .filter_map(|c| match c {
                MockCall::Converse { endpoint, request } => {
                    Some((endpoint.clone(), request.clone()))
                }
                _ => None,
            })
            .collect()
    }

    fn respond(
        &self,
        call: MockCall,
        response: Option<&JsonValue>,
        fallback: JsonValue,
    ) -> Result<JsonObject> {
        self.log().push(call);
        if let Some(message) = &self.config.failure {
            return Err(Error::Transport(message.clone()));
        }
        into_object(response.cloned().unwrap_or(fallback))
    }
}

#[async_trait]
impl InferenceService for MockInferenceService {
    async fn analyze(
        &self,
        files: &[FileHandle],
        folders: &[FolderTag],
        user_id: &str,
        project_id: i64,
    ) -> Result<JsonObject> {
        validate_analyze_input(files, folders)?;
        let call = MockCall::Analyze(AnalyzeCall {
            file_names: files.iter().map(|f| f.file_name.clone()).collect(),
            file_sizes: files.iter().map(FileHandle::len).collect(),
            folders: folders.to_vec(),
            user_id: user_id.to_string(),
            project_id,
        });
        self.respond(
            call,
            self.config.analyze_response.as_ref(),
            json!({"features": [], "table_of_contents": null}),
        )
    }

    async fn converse(&self, request: &ConversationRequest, endpoint: &str) -> Result<JsonObject> {
        let call = MockCall::Converse {
            endpoint: endpoint.to_string(),
            request: request.clone(),
        };
        self.respond(
            call,
            self.config.converse_response.as_ref(),
            json!({"ai_response": "Mock response"}),
        )
    }

    async fn fetch_table_of_contents(&self, project_id: i64) -> Result<JsonObject> {
        self.respond(
            MockCall::FetchToc { project_id },
            self.config.default_response.as_ref(),
            json!({}),
        )
    }

    async fn verify(&self, text: &str, focus: Option<&str>) -> Result<JsonObject> {
        let call = MockCall::Verify {
            text: text.to_string(),
            focus: focus.map(str::to_string),
        };
        self.respond(call, self.config.default_response.as_ref(), json!({}))
    }

    async fn compare_draft(&self, project_id: i64, draft: &JsonValue) -> Result<JsonObject> {
        let call = MockCall::CompareDraft {
            project_id,
            draft: draft.clone(),
        };
        self.respond(call, self.config.default_response.as_ref(), json!({}))
    }
}
