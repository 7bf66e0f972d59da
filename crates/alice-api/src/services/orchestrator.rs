//! Analysis orchestrator: materialize, tag, analyze, persist.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use alice_core::{
    AnalysisContext, AnalysisRun, Error, FileHandle, FileRef, FolderTag, InferenceService,
    JsonObjectExt, Result,
};

use super::{AnalysisNormalizer, FileMaterializer};

/// Status reported for a completed run.
pub const RUN_STATUS_SUCCESS: &str = "success";

/// Drives one analysis run end to end.
#[derive(Clone)]
pub struct AnalysisOrchestrator {
    service: Arc<dyn InferenceService>,
    materializer: FileMaterializer,
    normalizer: AnalysisNormalizer,
}

impl AnalysisOrchestrator {
    pub fn new(
        service: Arc<dyn InferenceService>,
        materializer: FileMaterializer,
        normalizer: AnalysisNormalizer,
    ) -> Self {
        Self {
            service,
            materializer,
            normalizer,
        }
    }

    /// Analyze a project's announcement and attachment files.
    ///
    /// Files that cannot be loaded are skipped. When none can be loaded the
    /// run fails with [`Error::NoFilesAvailable`] without calling the remote
    /// service. A failed remote call fails the whole run and leaves the
    /// stored analysis untouched.
    pub async fn run_analysis(
        &self,
        project_id: i64,
        user_id: &str,
        announcement: &[FileRef],
        attachment: &[FileRef],
    ) -> Result<AnalysisRun> {
        let start = Instant::now();
        let requested = announcement.len() + attachment.len();

        let mut files: Vec<FileHandle> = Vec::with_capacity(requested);
        let mut folders: Vec<FolderTag> = Vec::with_capacity(requested);
        for (refs, tag) in [
            (announcement, FolderTag::ANNOUNCEMENT),
            (attachment, FolderTag::ATTACHMENT),
        ] {
            for handle in self.materializer.materialize_all(refs).await {
                files.push(handle);
                folders.push(tag);
            }
        }

        if files.is_empty() {
            error!(
                subsystem = "api",
                component = "orchestrator",
                op = "run_analysis",
                project_id,
                requested,
                "No files could be loaded"
            );
            return Err(Error::NoFilesAvailable { requested });
        }

        let loaded = files.len();
        info!(
            subsystem = "api",
            component = "orchestrator",
            op = "run_analysis",
            project_id,
            requested,
            loaded,
            "Starting analysis"
        );

        let raw = self
            .service
            .analyze(&files, &folders, user_id, project_id)
            .await
            .map_err(|e| {
                error!(
                    subsystem = "api",
                    component = "orchestrator",
                    op = "run_analysis",
                    project_id,
                    error = %e,
                    "Remote analysis failed"
                );
                e
            })?;

        let features = raw.object_list("features").unwrap_or_default();
        let summary = self
            .normalizer
            .persist(project_id, &features, raw.object_field("table_of_contents"))
            .await?;

        info!(
            subsystem = "api",
            component = "orchestrator",
            op = "run_analysis",
            project_id,
            requested,
            loaded,
            features_count = summary.features_count,
            toc_saved = summary.toc_saved,
            duration_ms = start.elapsed().as_millis() as u64,
            "Analysis completed"
        );

        Ok(AnalysisRun {
            status: RUN_STATUS_SUCCESS.to_string(),
            features_count: summary.features_count,
            toc_saved: summary.toc_saved,
            files_requested: requested,
            files_loaded: loaded,
        })
    }

    pub async fn load_context(&self, project_id: i64) -> Result<AnalysisContext> {
        self.normalizer.load_context(project_id).await
    }
}
