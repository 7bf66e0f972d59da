//! In-memory repositories.
//!
//! Used by tests and by the server's `memory` storage mode. Contents are lost
//! on restart. The feature store enforces the same `(project_id, feature_code)`
//! uniqueness as the `analysis_result` table.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use alice_core::{
    AnalysisFeature, AnalysisRepository, CreateUploadRequest, Error, Result, StoredFile,
    TableOfContents, UploadRepository,
};

/// In-memory AnalysisRepository.
#[derive(Default)]
pub struct InMemoryAnalysisRepository {
    features: RwLock<Vec<AnalysisFeature>>,
    tocs: RwLock<Vec<TableOfContents>>,
    next_id: AtomicI64,
    failing_codes: HashSet<String>,
    fail_toc: bool,
    fail_delete: bool,
}

impl InMemoryAnalysisRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject inserts of features carrying `code`.
    pub fn with_failing_feature(mut self, code: impl Into<String>) -> Self {
        self.failing_codes.insert(code.into());
        self
    }

    /// Reject every table-of-contents insert.
    pub fn with_failing_toc(mut self) -> Self {
        self.fail_toc = true;
        self
    }

    /// Reject every delete, leaving earlier rows in place.
    pub fn with_failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn check_delete(&self, project_id: i64) -> Result<()> {
        if self.fail_delete {
            return Err(Error::Persistence(format!(
                "delete rejected for project {}",
                project_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl AnalysisRepository for InMemoryAnalysisRepository {
    async fn delete_features_by_project(&self, project_id: i64) -> Result<u64> {
        self.check_delete(project_id)?;
        let mut features = self.features.write().await;
        let before = features.len();
        features.retain(|f| f.project_id != project_id);
        Ok((before - features.len()) as u64)
    }

    async fn delete_toc_by_project(&self, project_id: i64) -> Result<u64> {
        self.check_delete(project_id)?;
        let mut tocs = self.tocs.write().await;
        let before = tocs.len();
        tocs.retain(|t| t.project_id != project_id);
        Ok((before - tocs.len()) as u64)
    }

    async fn insert_feature(&self, feature: &AnalysisFeature) -> Result<i64> {
        if let Some(code) = &feature.feature_code {
            if self.failing_codes.contains(code) {
                return Err(Error::Persistence(format!(
                    "insert rejected for feature {}",
                    code
                )));
            }
        }

        let mut features = self.features.write().await;
        if let Some(code) = &feature.feature_code {
            let duplicate = features.iter().any(|f| {
                f.project_id == feature.project_id && f.feature_code.as_ref() == Some(code)
            });
            if duplicate {
                return Err(Error::Persistence(format!(
                    "duplicate feature {} for project {}",
                    code, feature.project_id
                )));
            }
        }

        let id = self.next_id();
        features.push(AnalysisFeature {
            id: Some(id),
            created_at: Some(Utc::now()),
            ..feature.clone()
        });
        Ok(id)
    }

    async fn insert_toc(&self, toc: &TableOfContents) -> Result<i64> {
        if self.fail_toc {
            return Err(Error::Persistence(format!(
                "table of contents insert rejected for project {}",
                toc.project_id
            )));
        }

        let id = self.next_id();
        self.tocs.write().await.push(TableOfContents {
            id: Some(id),
            created_at: Some(Utc::now()),
            ..toc.clone()
        });
        Ok(id)
    }

    async fn list_features(&self, project_id: i64) -> Result<Vec<AnalysisFeature>> {
        Ok(self
            .features
            .read()
            .await
            .iter()
            .filter(|f| f.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn get_toc(&self, project_id: i64) -> Result<Option<TableOfContents>> {
        Ok(self
            .tocs
            .read()
            .await
            .iter()
            .rev()
            .find(|t| t.project_id == project_id)
            .cloned())
    }
}

/// In-memory UploadRepository.
#[derive(Default)]
pub struct InMemoryUploadRepository {
    uploads: RwLock<Vec<StoredFile>>,
    next_id: AtomicI64,
}

impl InMemoryUploadRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UploadRepository for InMemoryUploadRepository {
    async fn insert_upload(&self, req: CreateUploadRequest) -> Result<i64> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.uploads.write().await.push(StoredFile {
            id,
            user_id: req.user_id,
            project_id: req.project_id,
            folder: req.folder,
            file_name: req.file_name,
            file_path: req.file_path,
            size_bytes: req.size_bytes,
            content_type: req.content_type,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn list_uploads(&self, project_id: i64) -> Result<Vec<StoredFile>> {
        Ok(self
            .uploads
            .read()
            .await
            .iter()
            .filter(|u| u.project_id == project_id)
            .cloned()
            .collect())
    }
}
