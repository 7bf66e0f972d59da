//! alice-api - HTTP API server for the Alice proposal assistant

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use alice_api::{build_router, AppParts, AppState, ServerConfig, StorageMode};
use alice_core::{AnalysisRepository, InferenceService, UploadRepository};
use alice_db::{Database, InMemoryAnalysisRepository, InMemoryUploadRepository, PoolConfig};
use alice_inference::{InferenceConfig, RemoteInferenceClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "alice_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "alice_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("alice-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false)); // no ANSI in files by default
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let config = ServerConfig::from_env()?;
    let inference_config = InferenceConfig::load()?;
    let inference: Arc<dyn InferenceService> =
        Arc::new(RemoteInferenceClient::new(inference_config.clone())?);

    let analysis_repo: Arc<dyn AnalysisRepository>;
    let upload_repo: Arc<dyn UploadRepository>;
    match config.storage {
        StorageMode::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is not set")?;
            let pool_config = match config.database_max_connections {
                Some(n) => PoolConfig::new().max_connections(n),
                None => PoolConfig::default(),
            };
            let db = Database::connect_with_config(url, pool_config).await?;
            info!(subsystem = "db", op = "migrate", "Running database migrations");
            db.migrate().await?;
            analysis_repo = Arc::new(db.analysis.clone());
            upload_repo = Arc::new(db.uploads.clone());
        }
        StorageMode::Memory => {
            tracing::warn!(
                subsystem = "db",
                "Using in-memory storage; analysis results are lost on restart"
            );
            analysis_repo = Arc::new(InMemoryAnalysisRepository::new());
            upload_repo = Arc::new(InMemoryUploadRepository::new());
        }
    }

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("creating upload dir {}", config.upload_dir.display()))?;

    let state = AppState::new(AppParts {
        inference,
        inference_config,
        analysis_repo,
        upload_repo,
        upload_dir: config.upload_dir.clone(),
        max_upload_bytes: config.max_upload_bytes,
        storage: config.storage,
    });
    let app = build_router(state, &config);

    // Start server
    let addr: SocketAddr = config.bind_addr().parse()?;
    info!(
        storage = %config.storage,
        upload_dir = %config.upload_dir.display(),
        "Starting server on {}",
        addr
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
