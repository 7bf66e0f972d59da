//! alice-api - HTTP API for the Alice proposal assistant.
//!
//! The binary wires configuration, storage and the remote inference client
//! together; everything it serves is built here so handler tests can drive
//! the same router against in-memory storage.

pub mod config;
pub mod handlers;
pub mod services;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use alice_core::{AnalysisRepository, InferenceService, UploadRepository};
use alice_inference::{ConversationRouter, InferenceConfig};

pub use config::{ServerConfig, StorageMode};
use services::{AnalysisNormalizer, AnalysisOrchestrator, FileMaterializer, UploadStore};

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// STATE
// =============================================================================

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<AnalysisOrchestrator>,
    pub uploads: Arc<UploadStore>,
    pub conversations: Arc<ConversationRouter>,
    pub inference: Arc<dyn InferenceService>,
    pub storage: StorageMode,
}

/// Collaborators an [`AppState`] is assembled from.
pub struct AppParts {
    pub inference: Arc<dyn InferenceService>,
    pub inference_config: InferenceConfig,
    pub analysis_repo: Arc<dyn AnalysisRepository>,
    pub upload_repo: Arc<dyn UploadRepository>,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub storage: StorageMode,
}

impl AppState {
    pub fn new(parts: AppParts) -> Self {
        let materializer = FileMaterializer::new(parts.upload_dir.clone());
        let normalizer = AnalysisNormalizer::new(parts.analysis_repo);
        let orchestrator =
            AnalysisOrchestrator::new(parts.inference.clone(), materializer, normalizer);
        let uploads = UploadStore::new(
            parts.upload_dir,
            parts.upload_repo,
            parts.max_upload_bytes as u64,
        );
        let conversations =
            ConversationRouter::new(parts.inference.clone(), parts.inference_config);

        Self {
            orchestrator: Arc::new(orchestrator),
            uploads: Arc::new(uploads),
            conversations: Arc::new(conversations),
            inference: parts.inference,
            storage: parts.storage,
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Handler error rendered as `{"error": "<message>"}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Core(alice_core::Error),
}

impl From<alice_core::Error> for ApiError {
    fn from(err: alice_core::Error) -> Self {
        ApiError::Core(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        use alice_core::Error;
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Core(err) => match err {
                Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
                Error::NotFound(_) => StatusCode::NOT_FOUND,
                Error::NoFilesAvailable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                e if e.is_transport() => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Core(err) => err.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(
                subsystem = "api",
                status = status.as_u16(),
                error = %message,
                "Request failed"
            );
        }

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

// =============================================================================
// ROUTER
// =============================================================================

/// Build the application router with all middleware.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api/analysis", post(handlers::analysis::upload_files))
        .route("/api/analysis/start", post(handlers::analysis::start_analysis))
        .route("/api/analysis/get-context", get(handlers::analysis::get_context))
        .route("/api/analysis/toc", get(handlers::analysis::get_toc))
        .route("/api/ai-chat/response", post(handlers::chat::chat_response))
        .route("/api/verifies/law", post(handlers::verify::verify_law))
        .route("/api/compare/draft", post(handlers::verify::compare_draft))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(config.allowed_origins.clone()))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
                .expose_headers([header::HeaderName::from_static("x-request-id")])
                .max_age(Duration::from_secs(3600)),
        )
        // The request body limit below replaces axum's 2 MB extractor default
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes))
        .with_state(state)
}
