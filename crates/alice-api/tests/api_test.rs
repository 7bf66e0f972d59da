//! Router tests against in-memory storage and the mock inference backend.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use alice_api::{build_router, AppParts, AppState, ServerConfig, StorageMode};
use alice_core::FolderTag;
use alice_db::{InMemoryAnalysisRepository, InMemoryUploadRepository};
use alice_inference::mock::MockInferenceService;
use alice_inference::{InferenceConfig, RoutingPolicy};

const BOUNDARY: &str = "alice-test-boundary";

fn app_with(mock: &MockInferenceService, dir: &TempDir, routing: RoutingPolicy) -> Router {
    let state = AppState::new(AppParts {
        inference: Arc::new(mock.clone()),
        inference_config: InferenceConfig {
            routing,
            ..Default::default()
        },
        analysis_repo: Arc::new(InMemoryAnalysisRepository::new()),
        upload_repo: Arc::new(InMemoryUploadRepository::new()),
        upload_dir: dir.path().to_path_buf(),
        max_upload_bytes: 1024 * 1024,
        storage: StorageMode::Memory,
    });
    let config = ServerConfig {
        storage: StorageMode::Memory,
        upload_dir: dir.path().to_path_buf(),
        max_upload_bytes: 1024 * 1024,
        ..Default::default()
    };
    build_router(state, &config)
}

fn app(mock: &MockInferenceService, dir: &TempDir) -> Router {
    app_with(mock, dir, RoutingPolicy::Single)
}

/// One multipart part: field name, optional file name, content.
type Part<'a> = (&'a str, Option<&'a str>, &'a str);

fn multipart(parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, file_name, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match file_name {
            Some(f) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                    name, f
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            ),
        }
        body.extend_from_slice(data.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/analysis")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn upload_two(app: &Router) -> Value {
    let (status, body) = send(
        app,
        multipart(&[
            ("userid", None, "kim"),
            ("projectidx", None, "42"),
            ("files", Some("notice.pdf"), "%PDF-1.4 notice"),
            ("folders", None, "1"),
            ("files", Some("appendix.hwp"), "hwp appendix"),
            ("folders", None, "2"),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body
}

#[tokio::test]
async fn test_health() {
    let dir = TempDir::new().unwrap();
    let app = app(&MockInferenceService::new(), &dir);
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "storage": "memory"}));
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let dir = TempDir::new().unwrap();
    let app = app(&MockInferenceService::new(), &dir);
    let response = app.oneshot(get("/health")).await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_upload_stores_files() {
    let dir = TempDir::new().unwrap();
    let app = app(&MockInferenceService::new(), &dir);
    let body = upload_two(&app).await;

    let saved = body.as_array().unwrap();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0]["name"], "notice.pdf");
    assert_eq!(saved[0]["path"], "uploads/kim/42/1/notice.pdf");
    assert_eq!(saved[0]["folder"], 1);
    assert_eq!(saved[1]["folder"], 2);
    assert!(dir.path().join("kim/42/2/appendix.hwp").exists());
}

#[tokio::test]
async fn test_upload_rejects_misaligned_folders() {
    let dir = TempDir::new().unwrap();
    let app = app(&MockInferenceService::new(), &dir);
    let (status, body) = send(
        &app,
        multipart(&[
            ("userid", None, "kim"),
            ("projectidx", None, "1"),
            ("files", Some("a.pdf"), "a"),
            ("files", Some("b.pdf"), "b"),
            ("folders", None, "1"),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("2 files but 1 folders"));
}

#[tokio::test]
async fn test_upload_requires_user_and_project() {
    let dir = TempDir::new().unwrap();
    let app = app(&MockInferenceService::new(), &dir);
    let (status, _) = send(
        &app,
        multipart(&[("files", Some("a.pdf"), "a"), ("folders", None, "1")]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_start_uses_stored_uploads_and_context_round_trips() {
    let dir = TempDir::new().unwrap();
    let mock = MockInferenceService::new().with_analyze_response(json!({
        "features": [
            {
                "feature_code": "F1",
                "title": "추진 배경",
                "key_points": ["a", "b"],
                "writing_strategy": {"tone": "formal"},
                "extracted_at": "2025-11-03T10:15:30.123+09:00"
            },
            {"feature_code": "F2", "key_points": []}
        ],
        "table_of_contents": {"source": "announcement", "total_sections": 2, "sections": []}
    }));
    let app = app(&mock, &dir);
    upload_two(&app).await;

    let (status, run) = send(
        &app,
        post_json("/api/analysis/start", json!({"projectIdx": 42, "userId": "kim"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", run);
    assert_eq!(
        run,
        json!({
            "status": "success",
            "features_count": 2,
            "toc_saved": true,
            "files_requested": 2,
            "files_loaded": 2
        })
    );

    let calls = mock.analyze_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].folders, vec![FolderTag(1), FolderTag(2)]);
    assert_eq!(calls[0].file_names, vec!["notice.pdf", "appendix.hwp"]);

    let (status, body) = send(&app, get("/api/analysis/get-context?projectIdx=42")).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["result_toc"]["total_sections"], 2);
    let features = data["extracted_features"].as_array().unwrap();
    assert_eq!(features.len(), 2);
    assert_eq!(features[0]["key_points"], json!(["a", "b"]));
    assert_eq!(features[0]["writing_strategy"], json!({"tone": "formal"}));
    assert_eq!(features[0]["extracted_at"], "2025-11-03T10:15:30");
    assert_eq!(features[1]["key_points"], json!([]));
    assert_eq!(features[1]["writing_strategy"], json!({}));
}

#[tokio::test]
async fn test_start_with_no_loadable_files_is_unprocessable() {
    let dir = TempDir::new().unwrap();
    let mock = MockInferenceService::new();
    let app = app(&mock, &dir);

    let (status, body) = send(
        &app,
        post_json(
            "/api/analysis/start",
            json!({
                "projectIdx": 42,
                "userId": "kim",
                "announcementFiles": [{"path": "uploads/kim/42/1/missing.pdf", "name": "missing.pdf"}]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("1 requested"));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_start_remote_failure_is_bad_gateway() {
    let dir = TempDir::new().unwrap();
    let mock = MockInferenceService::new().with_failure("connection refused");
    let app = app(&mock, &dir);
    upload_two(&app).await;

    let (status, body) = send(
        &app,
        post_json("/api/analysis/start", json!({"projectIdx": 42, "userId": "kim"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_context_without_toc_is_null() {
    let dir = TempDir::new().unwrap();
    let app = app(&MockInferenceService::new(), &dir);
    let (status, body) = send(&app, get("/api/analysis/get-context?projectIdx=7")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["result_toc"].is_null());
    assert!(body["data"].as_object().unwrap().contains_key("result_toc"));
    assert_eq!(body["data"]["extracted_features"], json!([]));
}

#[tokio::test]
async fn test_toc_is_proxied() {
    let dir = TempDir::new().unwrap();
    let mock = MockInferenceService::new().with_response(json!({"total_sections": 5}));
    let app = app(&mock, &dir);
    let (status, body) = send(&app, get("/api/analysis/toc?projectIdx=9")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_sections"], 5);
}

#[tokio::test]
async fn test_chat_question_wins_and_reports_state() {
    let dir = TempDir::new().unwrap();
    let mock = MockInferenceService::new().with_converse_response(json!({
        "message": "사업 예산은 얼마인가요?",
        "generated_content": "old draft",
        "status": "waiting_for_input",
        "thread_id": "t-1"
    }));
    let app = app(&mock, &dir);

    let (status, body) = send(
        &app,
        post_json(
            "/api/ai-chat/response",
            json!({"userMessage": "초안 써줘", "userIdx": 3, "projectIdx": 42, "userId": "kim"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["ai_response"], "사업 예산은 얼마인가요?");
    assert_eq!(body["generated_content"], "old draft");
    assert_eq!(body["thread_id"], "t-1");
    assert_eq!(body["state"], "awaiting_input");
    assert_eq!(body["user_message"], "초안 써줘");
}

#[tokio::test]
async fn test_chat_thread_routing() {
    let dir = TempDir::new().unwrap();
    let mock = MockInferenceService::new();
    let single = app(&mock, &dir);
    let threaded = app_with(&mock, &dir, RoutingPolicy::Thread);
    let body = json!({
        "userMessage": "네, 5억입니다",
        "userIdx": 3,
        "projectIdx": 42,
        "userId": "kim",
        "threadId": "t-1"
    });

    send(&single, post_json("/api/ai-chat/response", body.clone())).await;
    send(&threaded, post_json("/api/ai-chat/response", body)).await;

    let endpoints: Vec<String> = mock.converse_calls().into_iter().map(|(e, _)| e).collect();
    assert_eq!(endpoints, vec!["/generate", "/generate/continue"]);
    assert_eq!(mock.converse_calls()[1].1.thread_id.as_deref(), Some("t-1"));
}

#[tokio::test]
async fn test_chat_failure_names_endpoint() {
    let dir = TempDir::new().unwrap();
    let app = app(&MockInferenceService::new().with_failure("timed out"), &dir);
    let (status, body) = send(
        &app,
        post_json(
            "/api/ai-chat/response",
            json!({"userMessage": "hi", "userIdx": 1, "projectIdx": 1, "userId": "kim"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("/generate"));
    assert!(error.contains("timed out"));
}

#[tokio::test]
async fn test_chat_rejects_blank_message() {
    let dir = TempDir::new().unwrap();
    let mock = MockInferenceService::new();
    let app = app(&mock, &dir);
    let (status, _) = send(
        &app,
        post_json(
            "/api/ai-chat/response",
            json!({"userMessage": "  ", "userIdx": 1, "projectIdx": 1, "userId": "kim"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_verify_and_compare_are_proxied() {
    let dir = TempDir::new().unwrap();
    let mock = MockInferenceService::new().with_response(json!({"result": "ok"}));
    let app = app(&mock, &dir);

    let (status, body) = send(
        &app,
        post_json("/api/verifies/law", json!({"text": "제1조", "focus": null})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "ok");

    let (status, _) = send(
        &app,
        post_json(
            "/api/compare/draft",
            json!({"project_idx": 42, "draft_json": {"type": "doc"}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mock.call_count(), 2);

    let (status, _) = send(&app, post_json("/api/verifies/law", json!({"text": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_accepts_payload_without_user_id() {
    let dir = TempDir::new().unwrap();
    let mock = MockInferenceService::new();
    let app = app(&mock, &dir);

    let (status, body) = send(
        &app,
        post_json(
            "/api/ai-chat/response",
            json!({"userMessage": "초안 써줘", "userIdx": 3, "projectIdx": 42}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (status, body) = send(
        &app,
        post_json(
            "/api/ai-chat/response",
            json!({"userMessage": "다시", "userIdx": 3, "projectIdx": 42, "userId": null}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let calls = mock.converse_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].1.user_id, "");
    assert_eq!(calls[0].1.project_id, 42);
}

#[tokio::test]
async fn test_start_accepts_editor_payload_shape() {
    let dir = TempDir::new().unwrap();
    let mock = MockInferenceService::new();
    let app = app(&mock, &dir);
    upload_two(&app).await;

    let (status, run) = send(
        &app,
        post_json(
            "/api/analysis/start",
            json!({
                "projectId": 42,
                "userId": "kim",
                "announcement_files": [{"path": "uploads/kim/42/1/notice.pdf", "name": "notice.pdf"}],
                "attachment_files": [{"path": "uploads/kim/42/2/appendix.hwp", "name": "appendix.hwp"}]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", run);
    assert_eq!(run["files_loaded"], 2);

    let calls = mock.analyze_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].folders, vec![FolderTag(1), FolderTag(2)]);
}

#[tokio::test]
async fn test_start_refuses_paths_outside_upload_dir() {
    let dir = TempDir::new().unwrap();
    let other = TempDir::new().unwrap();
    let secret = other.path().join("secret.txt");
    std::fs::write(&secret, "top secret").unwrap();
    let mock = MockInferenceService::new();
    let app = app(&mock, &dir);

    let (status, _) = send(
        &app,
        post_json(
            "/api/analysis/start",
            json!({
                "projectIdx": 42,
                "userId": "kim",
                "announcementFiles": [{"path": secret.to_string_lossy(), "name": "x.pdf"}]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(mock.call_count(), 0);
}
