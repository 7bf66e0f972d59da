//! HTTP client for the remote analysis/generation service.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value as JsonValue};
use std::time::Instant;
use tracing::{debug, info, warn};

use alice_core::defaults::FALLBACK_CONTENT_TYPE;
use alice_core::{
    into_object, ConversationRequest, Error, FileHandle, FolderTag, InferenceService, JsonObject,
    Result,
};

use crate::config::InferenceConfig;

/// Remote inference service client.
///
/// Constructed once from an [`InferenceConfig`] and shared behind an `Arc`.
/// Every call gets the same end-to-end timeout and is never retried.
#[derive(Clone)]
pub struct RemoteInferenceClient {
    client: Client,
    config: InferenceConfig,
}

impl RemoteInferenceClient {
    /// Create a client. Fails only if the TLS backend cannot be initialised.
    pub fn new(config: InferenceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.timeout())
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "inference",
            component = "client",
            base_url = %config.base_url,
            timeout_secs = config.timeout_secs,
            routing = %config.routing,
            "Initializing remote inference client"
        );

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Send a request and decode the reply as a JSON object.
    async fn send(
        &self,
        op: &'static str,
        path: &str,
        request: RequestBuilder,
    ) -> Result<JsonObject> {
        let start = Instant::now();
        let response = request.send().await.map_err(|e| {
            warn!(
                subsystem = "inference",
                component = "client",
                op,
                endpoint = path,
                error = %e,
                duration_ms = start.elapsed().as_millis() as u64,
                "Remote call failed"
            );
            Error::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                subsystem = "inference",
                component = "client",
                op,
                endpoint = path,
                status = status.as_u16(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Remote service returned an error status"
            );
            return Err(Error::Remote {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        debug!(
            subsystem = "inference",
            component = "client",
            op,
            endpoint = path,
            response_bytes = bytes.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Remote call completed"
        );

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonObject::new());
        }
        let value: JsonValue = serde_json::from_slice(&bytes)?;
        into_object(value)
    }

    fn file_part(file: &FileHandle) -> Result<Part> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type);
        match part {
            Ok(part) => Ok(part),
            Err(_) => {
                warn!(
                    subsystem = "inference",
                    component = "client",
                    file_name = %file.file_name,
                    content_type = %file.content_type,
                    "Unparseable content type, sending as generic binary"
                );
                Part::bytes(file.bytes.clone())
                    .file_name(file.file_name.clone())
                    .mime_str(FALLBACK_CONTENT_TYPE)
                    .map_err(|e| Error::Internal(format!("Failed to create multipart: {}", e)))
            }
        }
    }
}

/// Reject analysis input the remote service could not pair up.
pub fn validate_analyze_input(files: &[FileHandle], folders: &[FolderTag]) -> Result<()> {
    if files.len() != folders.len() {
        return Err(Error::InvalidInput(format!(
            "{} files but {} folder tags; each file needs exactly one tag",
            files.len(),
            folders.len()
        )));
    }
    if files.is_empty() {
        return Err(Error::InvalidInput("no files to analyze".to_string()));
    }
    if let Some(empty) = files.iter().find(|f| f.is_empty()) {
        return Err(Error::InvalidInput(format!(
            "file {} is empty",
            empty.file_name
        )));
    }
    Ok(())
}

#[async_trait]
impl InferenceService for RemoteInferenceClient {
    async fn analyze(
        &self,
        files: &[FileHandle],
        folders: &[FolderTag],
        user_id: &str,
        project_id: i64,
    ) -> Result<JsonObject> {
        validate_analyze_input(files, folders)?;

        let mut form = Form::new();
        for (file, folder) in files.iter().zip(folders) {
            form = form
                .part("files", Self::file_part(file)?)
                .text("folders", folder.to_string());
        }
        form = form
            .text("userid", user_id.to_string())
            .text("projectidx", project_id.to_string());

        info!(
            subsystem = "inference",
            component = "client",
            op = "analyze",
            project_id,
            file_count = files.len(),
            total_bytes = files.iter().map(FileHandle::len).sum::<usize>(),
            "Sending files for analysis"
        );

        let path = &self.config.analyze_path;
        let request = self.client.post(self.config.url(path)).multipart(form);
        self.send("analyze", path, request).await
    }

    async fn converse(&self, request: &ConversationRequest, endpoint: &str) -> Result<JsonObject> {
        let builder = self.client.post(self.config.url(endpoint)).json(request);
        self.send("converse", endpoint, builder).await
    }

    async fn fetch_table_of_contents(&self, project_id: i64) -> Result<JsonObject> {
        let path = &self.config.toc_path;
        let request = self
            .client
            .get(self.config.url(path))
            .query(&[("project_idx", project_id)]);
        self.send("fetch_toc", path, request).await
    }

    async fn verify(&self, text: &str, focus: Option<&str>) -> Result<JsonObject> {
        let path = &self.config.verify_path;
        let request = self
            .client
            .post(self.config.url(path))
            .json(&json!({ "text": text, "focus": focus }));
        self.send("verify", path, request).await
    }

    async fn compare_draft(&self, project_id: i64, draft: &JsonValue) -> Result<JsonObject> {
        let path = &self.config.compare_path;
        let request = self
            .client
            .post(self.config.url(path))
            .json(&json!({ "project_idx": project_id, "draft_json": draft }));
        self.send("compare_draft", path, request).await
    }
}
