//! Upload storage: writes incoming files under the upload directory and
//! records them so an analysis run can find them later.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use alice_core::defaults::{FALLBACK_CONTENT_TYPE, UPLOADS_ROOT};
use alice_core::{
    detect_content_type, sanitize_filename, validate_file, CreateUploadRequest, Error, FileRef,
    FolderTag, Result, UploadRepository,
};

/// One file received in an upload request.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Saved file info returned to the uploader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedFile {
    pub id: i64,
    pub name: String,
    /// Logical path, prefixed with the `uploads` root.
    pub path: String,
    pub folder: FolderTag,
    pub size: i64,
}

/// Stored refs of a project split by category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFiles {
    pub announcement: Vec<FileRef>,
    pub attachment: Vec<FileRef>,
}

#[derive(Clone)]
pub struct UploadStore {
    upload_dir: PathBuf,
    repo: Arc<dyn UploadRepository>,
    max_file_bytes: u64,
}

impl UploadStore {
    pub fn new(
        upload_dir: impl Into<PathBuf>,
        repo: Arc<dyn UploadRepository>,
        max_file_bytes: u64,
    ) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            repo,
            max_file_bytes,
        }
    }

    /// Write one file to `<upload_dir>/<user>/<project>/<folder>/<name>` and
    /// record it. An existing file with the same name is overwritten.
    pub async fn save(
        &self,
        user_id: &str,
        project_id: i64,
        folder: FolderTag,
        file: IncomingFile,
    ) -> Result<SavedFile> {
        let user_dir = sanitize_filename(user_id);
        let name = sanitize_filename(&file.file_name);

        let check = validate_file(&name, &file.bytes, self.max_file_bytes);
        if !check.allowed {
            let reason = check.block_reason.unwrap_or_default();
            warn!(
                subsystem = "api",
                component = "uploads",
                op = "save",
                project_id,
                file_name = %name,
                reason = %reason,
                "Rejected upload"
            );
            return Err(Error::InvalidInput(format!("{}: {}", name, reason)));
        }

        let content_type = match file.content_type.as_deref().map(str::trim) {
            Some(ct) if !ct.is_empty() && ct != FALLBACK_CONTENT_TYPE => ct.to_string(),
            _ => detect_content_type(&name, &file.bytes),
        };

        let relative = format!("{}/{}/{}/{}", user_dir, project_id, folder, name);
        let target = self.upload_dir.join(&relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &file.bytes).await?;

        let size = file.bytes.len() as i64;
        let logical_path = format!("{}/{}", UPLOADS_ROOT, relative);
        let id = self
            .repo
            .insert_upload(CreateUploadRequest {
                user_id: user_id.to_string(),
                project_id,
                folder,
                file_name: name.clone(),
                file_path: logical_path.clone(),
                size_bytes: size,
                content_type,
            })
            .await?;

        info!(
            subsystem = "api",
            component = "uploads",
            op = "save",
            project_id,
            folder = folder.0,
            upload_id = id,
            size_bytes = size,
            "Stored upload"
        );

        Ok(SavedFile {
            id,
            name,
            path: logical_path,
            folder,
            size,
        })
    }

    /// Stored refs of a project. Folders other than announcement and
    /// attachment are ignored.
    pub async fn project_files(&self, project_id: i64) -> Result<ProjectFiles> {
        let mut files = ProjectFiles::default();
        for stored in self.repo.list_uploads(project_id).await? {
            let file_ref = FileRef::new(stored.file_path, stored.file_name);
            match stored.folder {
                FolderTag::ANNOUNCEMENT => files.announcement.push(file_ref),
                FolderTag::ATTACHMENT => files.attachment.push(file_ref),
                _ => {}
            }
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::FileMaterializer;
    use alice_db::InMemoryUploadRepository;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> UploadStore {
        UploadStore::new(dir.path(), Arc::new(InMemoryUploadRepository::new()), 1024)
    }

    fn incoming(name: &str, bytes: &[u8]) -> IncomingFile {
        IncomingFile {
            file_name: name.to_string(),
            content_type: None,
            bytes: bytes.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_save_writes_under_user_project_folder() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        let saved = s
            .save("kim", 42, FolderTag::ANNOUNCEMENT, incoming("notice.pdf", b"%PDF-1.4"))
            .await
            .unwrap();

        assert_eq!(saved.path, "uploads/kim/42/1/notice.pdf");
        assert_eq!(saved.size, 8);
        let on_disk = tokio::fs::read(dir.path().join("kim/42/1/notice.pdf")).await.unwrap();
        assert_eq!(on_disk, b"%PDF-1.4");
    }

    #[tokio::test]
    async fn test_saved_path_materializes() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        let saved = s
            .save("kim", 1, FolderTag::ATTACHMENT, incoming("a.hwp", b"hwp"))
            .await
            .unwrap();
        let handle = FileMaterializer::new(dir.path())
            .materialize(&FileRef::new(saved.path, saved.name))
            .await
            .unwrap();
        assert_eq!(handle.bytes, b"hwp");
    }

    #[tokio::test]
    async fn test_unsafe_names_are_sanitized() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        let saved = s
            .save("../evil", 1, FolderTag(1), incoming("../../x|y.txt", b"hi"))
            .await
            .unwrap();
        assert_eq!(saved.name, "x_y.txt");
        assert_eq!(saved.path, "uploads/evil/1/1/x_y.txt");
    }

    #[tokio::test]
    async fn test_rejects_blocked_and_oversized() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        let err = s
            .save("kim", 1, FolderTag(1), incoming("run.exe", b"MZ\x90\x00"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = s
            .save("kim", 1, FolderTag(1), incoming("big.pdf", &[b'a'; 2048]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = s
            .save("kim", 1, FolderTag(1), incoming("empty.pdf", b""))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[tokio::test]
    async fn test_project_files_split_by_folder() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.save("kim", 5, FolderTag(1), incoming("n.pdf", b"n")).await.unwrap();
        s.save("kim", 5, FolderTag(2), incoming("a1.pdf", b"a")).await.unwrap();
        s.save("kim", 5, FolderTag(3), incoming("other.pdf", b"o")).await.unwrap();
        s.save("kim", 6, FolderTag(1), incoming("elsewhere.pdf", b"e")).await.unwrap();

        let files = s.project_files(5).await.unwrap();
        assert_eq!(files.announcement, vec![FileRef::new("uploads/kim/5/1/n.pdf", "n.pdf")]);
        assert_eq!(files.attachment, vec![FileRef::new("uploads/kim/5/2/a1.pdf", "a1.pdf")]);
    }
}
