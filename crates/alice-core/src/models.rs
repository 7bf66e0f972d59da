//! Domain models for uploads, analysis results, and conversation turns.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

use crate::defaults;
use crate::json::JsonObject;

// =============================================================================
// FILES
// =============================================================================

/// Integer label grouping uploaded files by role.
///
/// The category is positional metadata supplied by the caller; it is never
/// inferred from file content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderTag(pub i64);

impl FolderTag {
    pub const ANNOUNCEMENT: FolderTag = FolderTag(defaults::FOLDER_ANNOUNCEMENT);
    pub const ATTACHMENT: FolderTag = FolderTag(defaults::FOLDER_ATTACHMENT);
}

impl fmt::Display for FolderTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to a previously stored upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    /// Stored path, in any of the historical conventions (absolute, or
    /// prefixed with the logical `uploads` root).
    pub path: String,
    /// Declared file name sent to the remote service.
    pub name: String,
}

impl FileRef {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }
}

/// In-memory uploadable file.
#[derive(Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FileHandle {
    /// Build a handle; an unknown or blank content type falls back to
    /// `application/octet-stream`.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>, content_type: Option<&str>) -> Self {
        let content_type = content_type
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .unwrap_or(defaults::FALLBACK_CONTENT_TYPE)
            .to_string();
        Self {
            file_name: file_name.into(),
            content_type,
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// Avoid dumping file contents into logs.
impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A persisted upload record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: i64,
    pub user_id: String,
    pub project_id: i64,
    pub folder: FolderTag,
    pub file_name: String,
    pub file_path: String,
    pub size_bytes: i64,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
}

/// Request for recording a new upload.
#[derive(Debug, Clone)]
pub struct CreateUploadRequest {
    pub user_id: String,
    pub project_id: i64,
    pub folder: FolderTag,
    pub file_name: String,
    pub file_path: String,
    pub size_bytes: i64,
    pub content_type: String,
}

// =============================================================================
// ANALYSIS RESULTS
// =============================================================================

/// One extracted feature in its flat storage shape.
///
/// `key_points` and `referenced_attachments` are delimiter-joined lists and
/// `writing_strategy` is JSON text; only the normalizer converts between this
/// shape and the nested one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisFeature {
    pub id: Option<i64>,
    pub project_id: i64,
    pub feature_code: Option<String>,
    pub feature_name: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub full_content: Option<String>,
    pub key_points: Option<String>,
    pub writing_strategy: Option<String>,
    pub vector_similarity: Option<f64>,
    pub chunks_from_announcement: Option<i32>,
    pub chunks_from_attachments: Option<i32>,
    pub referenced_attachments: Option<String>,
    pub extracted_at: Option<NaiveDateTime>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A project's table of contents; the whole nested structure is kept as JSON text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableOfContents {
    pub id: Option<i64>,
    pub project_id: i64,
    pub source: Option<String>,
    pub total_sections: Option<i32>,
    pub toc_data: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Outcome of storing an analysis result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistSummary {
    /// Features that were actually inserted.
    pub features_count: usize,
    pub toc_saved: bool,
}

/// Reconstructed analysis context for generation turns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisContext {
    /// `None` when no table of contents was ever stored for the project.
    /// Serialized as an explicit `null`.
    pub result_toc: Option<JsonObject>,
    pub extracted_features: Vec<JsonObject>,
}

/// Result of a full analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRun {
    pub status: String,
    pub features_count: usize,
    pub toc_saved: bool,
    pub files_requested: usize,
    pub files_loaded: usize,
}

// =============================================================================
// CONVERSATION
// =============================================================================

/// Status reported by the remote service while it waits for an answer.
pub const STATUS_WAITING_FOR_INPUT: &str = "waiting_for_input";

/// Status reported by the remote service once a draft is produced.
pub const STATUS_COMPLETED: &str = "completed";

/// One inbound chat message, as sent to the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRequest {
    #[serde(rename = "user_message")]
    pub message: String,
    pub user_idx: i64,
    #[serde(rename = "project_idx")]
    pub project_id: i64,
    /// External (login) user id.
    pub user_id: String,
    pub thread_id: Option<String>,
}

impl ConversationRequest {
    /// Thread id, if one is present and non-blank.
    pub fn active_thread(&self) -> Option<&str> {
        self.thread_id.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Where a conversation stands after a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// No thread id known.
    NoSession,
    /// The service asked a clarifying question.
    AwaitingInput,
    /// A draft has been produced.
    Completed,
    /// A thread exists but the service reported neither of the above.
    Active,
}

/// One interpreted chat turn. Not persisted here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub user_message: String,
    /// Resolved text: clarifying question, then draft, then free-text answer.
    pub ai_response: Option<String>,
    pub generated_content: Option<String>,
    /// Editor-native document tree for a completed draft.
    pub completed_content: Option<JsonObject>,
    /// Opaque diagnostic payload, passed through verbatim.
    pub full_process_result: Option<JsonValue>,
    pub thread_id: Option<String>,
    pub status: Option<String>,
    pub message: Option<String>,
}

impl ChatTurn {
    pub fn state(&self) -> ConversationState {
        if self
            .thread_id
            .as_deref()
            .map_or(true, |t| t.trim().is_empty())
        {
            return ConversationState::NoSession;
        }
        match self.status.as_deref() {
            Some(STATUS_WAITING_FOR_INPUT) => ConversationState::AwaitingInput,
            Some(STATUS_COMPLETED) => ConversationState::Completed,
            _ if self.completed_content.is_some() => ConversationState::Completed,
            _ => ConversationState::Active,
        }
    }
}
