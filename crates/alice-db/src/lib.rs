//! # alice-db
//!
//! PostgreSQL database layer for the Alice proposal assistant.
//!
//! This crate provides:
//! - Connection pool management
//! - Repositories for analysis features, tables of contents, and upload records
//! - In-memory repositories for tests and database-less deployments
//!
//! ## Example
//!
//! ```rust,ignore
//! use alice_db::{AnalysisRepository, Database};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/alice").await?;
//!     let features = db.analysis.list_features(42).await?;
//!     println!("{} features", features.len());
//!     Ok(())
//! }
//! ```
pub mod analysis;
pub mod memory;
pub mod pool;
pub mod uploads;

// Re-export core types
pub use alice_core::*;

pub use analysis::PgAnalysisRepository;
pub use memory::{InMemoryAnalysisRepository, InMemoryUploadRepository};
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use uploads::PgUploadRepository;

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Features and tables of contents.
    pub analysis: PgAnalysisRepository,
    /// Upload metadata.
    pub uploads: PgUploadRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            analysis: PgAnalysisRepository::new(pool.clone()),
            uploads: PgUploadRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
