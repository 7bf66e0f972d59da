//! Analysis endpoints: upload, run, context and table of contents.

use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::info;

use alice_core::{AnalysisRun, FileRef, FolderTag, JsonObject};

use crate::services::{IncomingFile, ProjectFiles, SavedFile};
use crate::{ApiError, AppState};

/// `?projectIdx=` query parameter.
#[derive(Debug, Deserialize)]
pub struct ProjectQuery {
    #[serde(rename = "projectIdx")]
    pub project_id: i64,
}

/// `POST /api/analysis/start` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAnalysisRequest {
    #[serde(rename = "projectIdx", alias = "projectId")]
    pub project_id: i64,
    pub user_id: String,
    #[serde(default, alias = "announcement_files")]
    pub announcement_files: Option<Vec<FileRef>>,
    #[serde(default, alias = "attachment_files")]
    pub attachment_files: Option<Vec<FileRef>>,
}

/// `POST /api/analysis` (multipart)
///
/// Parts: one or more `files`, one `folders` per file in the same order,
/// `userid`, and `projectidx`.
pub async fn upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Vec<SavedFile>>, ApiError> {
    let mut files: Vec<IncomingFile> = Vec::new();
    let mut folders: Vec<FolderTag> = Vec::new();
    let mut user_id: Option<String> = None;
    let mut project_id: Option<i64> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read multipart field: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "files" => {
                let file_name = field.file_name().unwrap_or("unnamed_file").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read file data: {}", e))
                })?;
                files.push(IncomingFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "folders" => {
                let text = read_text(field).await?;
                let folder = text.trim().parse::<i64>().map_err(|_| {
                    ApiError::BadRequest(format!("folders must be integers, got '{}'", text))
                })?;
                folders.push(FolderTag(folder));
            }
            "userid" => user_id = Some(read_text(field).await?),
            "projectidx" => {
                let text = read_text(field).await?;
                project_id = Some(text.trim().parse().map_err(|_| {
                    ApiError::BadRequest(format!("projectidx must be an integer, got '{}'", text))
                })?);
            }
            _ => {}
        }
    }

    let user_id = user_id
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("userid is required".to_string()))?;
    let project_id =
        project_id.ok_or_else(|| ApiError::BadRequest("projectidx is required".to_string()))?;
    if files.is_empty() {
        return Err(ApiError::BadRequest("no files uploaded".to_string()));
    }
    if files.len() != folders.len() {
        return Err(ApiError::BadRequest(format!(
            "{} files but {} folders; each file needs exactly one folder",
            files.len(),
            folders.len()
        )));
    }

    let mut saved = Vec::with_capacity(files.len());
    for (file, folder) in files.into_iter().zip(folders) {
        saved.push(state.uploads.save(&user_id, project_id, folder, file).await?);
    }

    info!(
        subsystem = "api",
        component = "analysis",
        op = "upload",
        project_id,
        file_count = saved.len(),
        "Files uploaded"
    );
    Ok(Json(saved))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read multipart field: {}", e)))
}

/// `POST /api/analysis/start`
///
/// Without explicit file lists, the project's stored uploads are analyzed.
pub async fn start_analysis(
    State(state): State<AppState>,
    Json(req): Json<StartAnalysisRequest>,
) -> Result<Json<AnalysisRun>, ApiError> {
    let files = match (req.announcement_files, req.attachment_files) {
        (None, None) => state.uploads.project_files(req.project_id).await?,
        (announcement, attachment) => ProjectFiles {
            announcement: announcement.unwrap_or_default(),
            attachment: attachment.unwrap_or_default(),
        },
    };

    let run = state
        .orchestrator
        .run_analysis(
            req.project_id,
            &req.user_id,
            &files.announcement,
            &files.attachment,
        )
        .await?;
    Ok(Json(run))
}

/// `GET /api/analysis/get-context?projectIdx=`
pub async fn get_context(
    State(state): State<AppState>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<JsonValue>, ApiError> {
    let context = state.orchestrator.load_context(query.project_id).await?;
    Ok(Json(json!({ "data": context })))
}

/// `GET /api/analysis/toc?projectIdx=`
pub async fn get_toc(
    State(state): State<AppState>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<JsonObject>, ApiError> {
    let toc = state
        .inference
        .fetch_table_of_contents(query.project_id)
        .await?;
    Ok(Json(toc))
}
