//! Traits at the seams between orchestration, storage, and the remote service.
//!
//! Concrete implementations live in `alice-db` (storage) and
//! `alice-inference` (remote service); tests swap in in-memory versions.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::json::JsonObject;
use crate::models::*;

// =============================================================================
// STORAGE
// =============================================================================

/// Storage for analysis features and tables of contents.
///
/// Deletes and inserts are separate statements. Replacing a project's
/// results is therefore not atomic: two overlapping re-analyses of the same
/// project can interleave and leave a mixed result set.
#[async_trait]
pub trait AnalysisRepository: Send + Sync {
    /// Delete every feature of a project. Returns the number of rows removed.
    async fn delete_features_by_project(&self, project_id: i64) -> Result<u64>;

    /// Delete the project's table of contents. Returns the number of rows removed.
    async fn delete_toc_by_project(&self, project_id: i64) -> Result<u64>;

    /// Insert one feature. Returns the new row id.
    async fn insert_feature(&self, feature: &AnalysisFeature) -> Result<i64>;

    /// Insert a table of contents. Returns the new row id.
    async fn insert_toc(&self, toc: &TableOfContents) -> Result<i64>;

    /// All features of a project, in insertion order.
    async fn list_features(&self, project_id: i64) -> Result<Vec<AnalysisFeature>>;

    /// The project's table of contents, if any.
    async fn get_toc(&self, project_id: i64) -> Result<Option<TableOfContents>>;
}

/// Storage for upload metadata.
#[async_trait]
pub trait UploadRepository: Send + Sync {
    /// Record an upload. Returns the new row id.
    async fn insert_upload(&self, req: CreateUploadRequest) -> Result<i64>;

    /// All uploads of a project, in insertion order.
    async fn list_uploads(&self, project_id: i64) -> Result<Vec<StoredFile>>;
}

// =============================================================================
// REMOTE INFERENCE SERVICE
// =============================================================================

/// The remote analysis/generation service.
///
/// Responses are loosely-typed JSON objects; callers read them through
/// [`crate::json::JsonObjectExt`]. Implementations are stateless and never retry.
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Upload files for analysis. `folders` must be index-aligned with `files`.
    async fn analyze(
        &self,
        files: &[FileHandle],
        folders: &[FolderTag],
        user_id: &str,
        project_id: i64,
    ) -> Result<JsonObject>;

    /// Send one chat turn to `endpoint`.
    async fn converse(&self, request: &ConversationRequest, endpoint: &str) -> Result<JsonObject>;

    /// Fetch the service's table of contents for a project.
    async fn fetch_table_of_contents(&self, project_id: i64) -> Result<JsonObject>;

    /// Check a passage against applicable law, optionally narrowed to `focus`.
    async fn verify(&self, text: &str, focus: Option<&str>) -> Result<JsonObject>;

    /// Compare an editor draft against the project's stored analysis.
    async fn compare_draft(&self, project_id: i64, draft: &JsonValue) -> Result<JsonObject>;
}
