//! Upload metadata repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use alice_core::{CreateUploadRequest, Error, FolderTag, Result, StoredFile, UploadRepository};

/// PostgreSQL implementation of UploadRepository.
#[derive(Clone)]
pub struct PgUploadRepository {
    pool: Pool<Postgres>,
}

impl PgUploadRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UploadRepository for PgUploadRepository {
    async fn insert_upload(&self, req: CreateUploadRequest) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO uploaded_file (user_id, project_id, folder, file_name, file_path, size_bytes, content_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&req.user_id)
        .bind(req.project_id)
        .bind(req.folder.0)
        .bind(&req.file_name)
        .bind(&req.file_path)
        .bind(req.size_bytes)
        .bind(&req.content_type)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.get("id"))
    }

    async fn list_uploads(&self, project_id: i64) -> Result<Vec<StoredFile>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, project_id, folder, file_name, file_path, size_bytes, content_type, created_at
            FROM uploaded_file
            WHERE project_id = $1
            ORDER BY id
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|r| StoredFile {
                id: r.get("id"),
                user_id: r.get("user_id"),
                project_id: r.get("project_id"),
                folder: FolderTag(r.get("folder")),
                file_name: r.get("file_name"),
                file_path: r.get("file_path"),
                size_bytes: r.get("size_bytes"),
                content_type: r.get("content_type"),
                created_at: r.get("created_at"),
            })
            .collect())
    }
}
