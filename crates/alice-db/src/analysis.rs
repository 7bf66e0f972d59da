//! Analysis result repository implementation.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};

use alice_core::{AnalysisFeature, AnalysisRepository, Error, Result, TableOfContents};

/// PostgreSQL implementation of AnalysisRepository.
#[derive(Clone)]
pub struct PgAnalysisRepository {
    pool: Pool<Postgres>,
}

impl PgAnalysisRepository {
    /// Create a new PgAnalysisRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn feature_from_row(r: PgRow) -> AnalysisFeature {
        AnalysisFeature {
            id: Some(r.get("id")),
            project_id: r.get("project_id"),
            feature_code: r.get("feature_code"),
            feature_name: r.get("feature_name"),
            title: r.get("title"),
            summary: r.get("summary"),
            full_content: r.get("full_content"),
            key_points: r.get("key_points"),
            writing_strategy: r.get("writing_strategy"),
            vector_similarity: r.get("vector_similarity"),
            chunks_from_announcement: r.get("chunks_from_announcement"),
            chunks_from_attachments: r.get("chunks_from_attachments"),
            referenced_attachments: r.get("referenced_attachments"),
            extracted_at: r.get("extracted_at"),
            created_at: Some(r.get("created_at")),
        }
    }
}

#[async_trait]
impl AnalysisRepository for PgAnalysisRepository {
    async fn delete_features_by_project(&self, project_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM analysis_result WHERE project_id = $1")
            .bind(project_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }

    async fn delete_toc_by_project(&self, project_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM table_of_contents WHERE project_id = $1")
            .bind(project_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }

    async fn insert_feature(&self, feature: &AnalysisFeature) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO analysis_result (
                project_id, feature_code, feature_name, title, summary, full_content,
                key_points, writing_strategy, vector_similarity,
                chunks_from_announcement, chunks_from_attachments,
                referenced_attachments, extracted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id
            "#,
        )
        .bind(feature.project_id)
        .bind(&feature.feature_code)
        .bind(&feature.feature_name)
        .bind(&feature.title)
        .bind(&feature.summary)
        .bind(&feature.full_content)
        .bind(&feature.key_points)
        .bind(&feature.writing_strategy)
        .bind(feature.vector_similarity)
        .bind(feature.chunks_from_announcement)
        .bind(feature.chunks_from_attachments)
        .bind(&feature.referenced_attachments)
        .bind(feature.extracted_at)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.get("id"))
    }

    async fn insert_toc(&self, toc: &TableOfContents) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO table_of_contents (project_id, source, total_sections, toc_data)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(toc.project_id)
        .bind(&toc.source)
        .bind(toc.total_sections)
        .bind(&toc.toc_data)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.get("id"))
    }

    async fn list_features(&self, project_id: i64) -> Result<Vec<AnalysisFeature>> {
        let rows = sqlx::query(
            r#"
            SELECT id, project_id, feature_code, feature_name, title, summary, full_content,
                   key_points, writing_strategy, vector_similarity,
                   chunks_from_announcement, chunks_from_attachments,
                   referenced_attachments, extracted_at, created_at
            FROM analysis_result
            WHERE project_id = $1
            ORDER BY id
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::feature_from_row).collect())
    }

    async fn get_toc(&self, project_id: i64) -> Result<Option<TableOfContents>> {
        // Newest row wins if an overlapping re-analysis left more than one.
        let row = sqlx::query(
            r#"
            SELECT id, project_id, source, total_sections, toc_data, created_at
            FROM table_of_contents
            WHERE project_id = $1
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|r| TableOfContents {
            id: Some(r.get("id")),
            project_id: r.get("project_id"),
            source: r.get("source"),
            total_sections: r.get("total_sections"),
            toc_data: r.get("toc_data"),
            created_at: Some(r.get("created_at")),
        }))
    }
}
