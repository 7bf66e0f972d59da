//! Rebuilds uploadable files from stored path references.
//!
//! Stored paths come in several historical shapes:
//!
//! | Stored path                       | Resolved to                         |
//! |-----------------------------------|-------------------------------------|
//! | `/srv/alice/uploads/kim/1/1/a.pdf`| itself, when under `<upload_dir>`   |
//! | `/uploads/kim/1/1/a.pdf`          | `<upload_dir>/kim/1/1/a.pdf`        |
//! | `uploads/kim/1/1/a.pdf`           | `<upload_dir>/kim/1/1/a.pdf`        |
//! | `kim\1\1\a.pdf`                   | `<upload_dir>/kim/1/1/a.pdf`        |
//!
//! Every candidate is canonicalized before it is read. Anything that resolves
//! outside the canonical upload directory, through `..` or a symlink, is
//! treated as missing.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use alice_core::defaults::UPLOADS_ROOT;
use alice_core::{detect_content_type, Error, FileHandle, FileRef, Result};

/// Loads stored uploads back into memory.
#[derive(Debug, Clone)]
pub struct FileMaterializer {
    upload_dir: PathBuf,
}

impl FileMaterializer {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Candidate locations for a stored path, in lookup order.
    ///
    /// Relative paths that climb out of the upload directory yield no
    /// candidate under it.
    pub fn candidates(&self, stored_path: &str) -> Vec<PathBuf> {
        let normalized = stored_path.trim().replace('\\', "/");
        let mut out = Vec::with_capacity(2);

        if Path::new(&normalized).is_absolute() {
            out.push(PathBuf::from(&normalized));
        }

        let relative = strip_logical_root(&normalized);
        if !relative.is_empty() {
            let relative = Path::new(relative);
            if relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
            {
                out.push(self.upload_dir.join(relative));
            }
        }
        out
    }

    /// Load one stored file.
    ///
    /// Returns [`Error::NotFound`] when no candidate location exists inside
    /// the upload directory; other read failures surface as [`Error::Io`].
    pub async fn materialize(&self, file: &FileRef) -> Result<FileHandle> {
        let root = match tokio::fs::canonicalize(&self.upload_dir).await {
            Ok(root) => root,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found(file)),
            Err(e) => return Err(Error::Io(e)),
        };

        for path in self.candidates(&file.path) {
            let resolved = match tokio::fs::canonicalize(&path).await {
                Ok(resolved) => resolved,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::Io(e)),
            };
            if !resolved.starts_with(&root) {
                warn!(
                    subsystem = "api",
                    component = "materializer",
                    op = "materialize",
                    stored_path = %file.path,
                    resolved_path = %resolved.display(),
                    "Refusing stored path outside the upload directory"
                );
                continue;
            }

            match tokio::fs::read(&resolved).await {
                Ok(bytes) => {
                    let name = declared_name(file, &resolved);
                    let content_type = detect_content_type(&name, &bytes);
                    debug!(
                        subsystem = "api",
                        component = "materializer",
                        op = "materialize",
                        stored_path = %file.path,
                        resolved_path = %resolved.display(),
                        size_bytes = bytes.len(),
                        content_type = %content_type,
                        "Loaded stored file"
                    );
                    return Ok(FileHandle::new(name, bytes, Some(&content_type)));
                }
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }
        Err(not_found(file))
    }

    /// Load every file that can be loaded, skipping the rest.
    pub async fn materialize_all(&self, files: &[FileRef]) -> Vec<FileHandle> {
        let mut loaded = Vec::with_capacity(files.len());
        for file in files {
            match self.materialize(file).await {
                Ok(handle) => loaded.push(handle),
                Err(e) => warn!(
                    subsystem = "api",
                    component = "materializer",
                    op = "materialize",
                    stored_path = %file.path,
                    file_name = %file.name,
                    error = %e,
                    "Skipping file that could not be loaded"
                ),
            }
        }
        loaded
    }
}

/// Drop leading slashes, `./`, and the logical `uploads/` prefix.
fn strip_logical_root(path: &str) -> &str {
    let mut rest = path.trim_start_matches('/');
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }
    match rest.strip_prefix(UPLOADS_ROOT) {
        Some(after) if after.starts_with('/') => after.trim_start_matches('/'),
        _ => rest,
    }
}

fn not_found(file: &FileRef) -> Error {
    Error::NotFound(format!("stored file {} ({})", file.name, file.path))
}

fn declared_name(file: &FileRef, path: &Path) -> String {
    let name = file.name.trim();
    if !name.is_empty() {
        return name.to_string();
    }
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed_file".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, FileMaterializer) {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("kim").join("42").join("1");
        tokio::fs::create_dir_all(&nested).await.unwrap();
        tokio::fs::write(nested.join("notice.pdf"), b"%PDF-1.7 body")
            .await
            .unwrap();
        tokio::fs::write(nested.join("form.hwp"), b"hwp body").await.unwrap();
        let m = FileMaterializer::new(dir.path());
        (dir, m)
    }

    #[test]
    fn test_strip_logical_root() {
        assert_eq!(strip_logical_root("/uploads/a/b.pdf"), "a/b.pdf");
        assert_eq!(strip_logical_root("uploads/a/b.pdf"), "a/b.pdf");
        assert_eq!(strip_logical_root("./uploads/a.pdf"), "a.pdf");
        assert_eq!(strip_logical_root("uploadsx/a.pdf"), "uploadsx/a.pdf");
        assert_eq!(strip_logical_root("a/b.pdf"), "a/b.pdf");
    }

    #[test]
    fn test_candidates_reject_traversal() {
        let m = FileMaterializer::new("/data/up");
        assert!(m.candidates("../etc/passwd").is_empty());
        assert!(m.candidates("uploads/../../etc/passwd").is_empty());
        assert_eq!(
            m.candidates("uploads\\kim\\1\\a.pdf"),
            vec![PathBuf::from("/data/up/kim/1/a.pdf")]
        );
        assert_eq!(
            m.candidates("/uploads/kim/a.pdf"),
            vec![
                PathBuf::from("/uploads/kim/a.pdf"),
                PathBuf::from("/data/up/kim/a.pdf")
            ]
        );
    }

    #[tokio::test]
    async fn test_all_path_conventions_resolve() {
        let (dir, m) = setup().await;
        let absolute = dir.path().join("kim/42/1/notice.pdf");
        let refs = [
            absolute.to_string_lossy().into_owned(),
            "/uploads/kim/42/1/notice.pdf".to_string(),
            "uploads/kim/42/1/notice.pdf".to_string(),
            "kim/42/1/notice.pdf".to_string(),
            "uploads\\kim\\42\\1\\notice.pdf".to_string(),
        ];
        for path in refs {
            let handle = m
                .materialize(&FileRef::new(path.clone(), "notice.pdf"))
                .await
                .unwrap_or_else(|e| panic!("{} did not resolve: {}", path, e));
            assert_eq!(handle.bytes, b"%PDF-1.7 body");
            assert_eq!(handle.content_type, "application/pdf");
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let (_dir, m) = setup().await;
        let err = m
            .materialize(&FileRef::new("uploads/kim/42/1/gone.pdf", "gone.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_content_type_falls_back_to_extension_then_binary() {
        let (dir, m) = setup().await;
        let hwp = m
            .materialize(&FileRef::new("kim/42/1/form.hwp", "form.hwp"))
            .await
            .unwrap();
        assert_eq!(hwp.content_type, "application/x-hwp");

        tokio::fs::write(dir.path().join("blob"), b"\x01\x02\x03").await.unwrap();
        let blob = m.materialize(&FileRef::new("blob", "")).await.unwrap();
        assert_eq!(blob.file_name, "blob");
        assert_eq!(blob.content_type, "application/octet-stream");
    }

    #[tokio::test]
    async fn test_paths_outside_upload_dir_are_not_found() {
        let (dir, m) = setup().await;
        let other = TempDir::new().unwrap();
        let secret = other.path().join("secret.txt");
        tokio::fs::write(&secret, b"top secret").await.unwrap();

        let outside = m
            .materialize(&FileRef::new(secret.to_string_lossy(), "x.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(outside, Error::NotFound(_)));

        let climbing = format!(
            "{}/kim/../../{}/secret.txt",
            dir.path().display(),
            other.path().file_name().unwrap().to_string_lossy()
        );
        let climbed = m
            .materialize(&FileRef::new(climbing, "x.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(climbed, Error::NotFound(_)));

        let etc = format!("{}/../../../../../../etc/hostname", dir.path().display());
        let err = m.materialize(&FileRef::new(etc, "h")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escaping_upload_dir_is_not_found() {
        let (dir, m) = setup().await;
        let other = TempDir::new().unwrap();
        let secret = other.path().join("secret.txt");
        tokio::fs::write(&secret, b"top secret").await.unwrap();
        std::os::unix::fs::symlink(&secret, dir.path().join("kim/42/1/link.pdf")).unwrap();

        let err = m
            .materialize(&FileRef::new("uploads/kim/42/1/link.pdf", "link.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_materialize_all_skips_missing() {
        let (_dir, m) = setup().await;
        let loaded = m
            .materialize_all(&[
                FileRef::new("kim/42/1/notice.pdf", "notice.pdf"),
                FileRef::new("kim/42/1/missing.pdf", "missing.pdf"),
                FileRef::new("kim/42/1/form.hwp", "form.hwp"),
            ])
            .await;
        let names: Vec<_> = loaded.iter().map(|h| h.file_name.as_str()).collect();
        assert_eq!(names, vec!["notice.pdf", "form.hwp"]);
    }
}
