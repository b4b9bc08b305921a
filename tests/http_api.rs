#![cfg(unix)]

mod common;

use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use common::{FakeYtDlp, test_config, wait_until};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;
use video_relay::server::{AppState, router};
use video_relay::task::TaskStatus;

struct TestApp {
    app: Router,
    state: AppState,
    dir: TempDir,
}

impl TestApp {
    fn new(kind: FakeYtDlp) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(test_config(dir.path(), kind));
        Self {
            app: router(state.clone()),
            state,
            dir,
        }
    }

    async fn send(&self, method: Method, uri: &str, body: Body) -> (StatusCode, HeaderMap, Bytes) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .unwrap();
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, bytes)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let (status, _, bytes) = self.send(Method::GET, uri, Body::empty()).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let (status, _, bytes) = self
            .send(Method::POST, uri, Body::from(body.to_string()))
            .await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn wait_for_status(&self, task_id: &str, expected: TaskStatus) -> bool {
        let registry = self.state.registry.clone();
        wait_until(Duration::from_secs(10), move || {
            registry.status(task_id) == Some(expected)
        })
        .await
    }
}

#[tokio::test]
async fn test_ping() {
    let app = TestApp::new(FakeYtDlp::Success);
    let (status, body) = app.get("/ping").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "pong" }));
}

#[tokio::test]
async fn test_download_without_body_is_rejected() {
    let app = TestApp::new(FakeYtDlp::Success);

    let (status, _, bytes) = app.send(Method::POST, "/download", Body::empty()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({ "error": "URL is required" }));

    let (status, body) = app.post("/download", json!({ "url": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "URL is required");

    assert!(app.state.registry.is_empty());
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let app = TestApp::new(FakeYtDlp::Success);
    let (status, _, bytes) = app
        .send(Method::POST, "/formats", Body::from("{not json"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));
}

#[tokio::test]
async fn test_formats_lists_table_rows() {
    let app = TestApp::new(FakeYtDlp::Success);
    let (status, body) = app
        .post("/formats", json!({ "url": "https://example.com/v", "referer": "https://aniv//anivox.fun/" }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    assert_eq!(body["title"], "Fake Title");
    assert_eq!(body["formats"][0]["id"], "140");
    assert_eq!(body["formats"][0]["type"], "audio");
    assert_eq!(body["formats"][1]["type"], "video");
    assert_eq!(body["formats"][2]["type"], "unknown");
}

#[tokio::test]
async fn test_formats_timeout_returns_gateway_timeout() {
    let app = TestApp::new(FakeYtDlp::Slow);
    let (status, body) = app
        .post("/formats", json!({ "url": "https://example.com/v" }))
        .await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body, json!({ "error": "Request timeout" }));
}

#[tokio::test]
async fn test_unknown_task() {
    let app = TestApp::new(FakeYtDlp::Success);

    let (status, body) = app.get("/status/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "status": "not_found" }));

    let (status, body) = app.get("/file/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "File not ready" }));
}

#[tokio::test]
async fn test_download_lifecycle() {
    let app = TestApp::new(FakeYtDlp::Success);

    let (status, body) = app
        .post("/download", json!({ "url": "https://example.com/v.mp4" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let task_id = body["task_id"].as_str().unwrap().to_string();

    assert!(app.wait_for_status(&task_id, TaskStatus::Completed).await);

    let (status, body) = app.get(&format!("/status/{}", task_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["progress"], 100.0);
    assert_eq!(body["title"], "Fake Title");
    assert_eq!(body["size"], 16);
    assert!(body.get("error").is_none());

    let (status, body) = app.get("/active").await;
    assert_eq!(status, StatusCode::OK);
    let active = body.as_array().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["task_id"], task_id.as_str());
    assert_eq!(active[0]["speed"], "Complete");
    assert_eq!(active[0]["eta"], "Done");

    let file_path = app.dir.path().join(format!("{}.mp4", task_id));
    assert!(file_path.exists());

    let (status, headers, bytes) = app
        .send(Method::GET, &format!("/file/{}", task_id), Body::empty())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&bytes[..], b"fake video bytes");
    assert_eq!(headers[CONTENT_TYPE], "video/mp4");
    assert_eq!(headers[CONTENT_LENGTH], "16");
    assert_eq!(
        headers[CONTENT_DISPOSITION].to_str().unwrap(),
        format!("attachment; filename=\"{}.mp4\"", task_id)
    );

    // 文件只能取一次
    let (status, body) = app.get(&format!("/file/{}", task_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "File not ready" }));

    let (status, _) = app.get(&format!("/status/{}", task_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let removed = wait_until(Duration::from_secs(2), || !file_path.exists()).await;
    assert!(removed);
}

#[tokio::test]
async fn test_failed_download_is_reported_but_not_listed() {
    let app = TestApp::new(FakeYtDlp::Failure);

    let (status, body) = app
        .post("/download", json!({ "url": "https://example.com/v.mp4", "format_id": "22" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let task_id = body["task_id"].as_str().unwrap().to_string();

    assert!(app.wait_for_status(&task_id, TaskStatus::Error).await);

    let (status, body) = app.get(&format!("/status/{}", task_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    assert!(body["error"].as_str().unwrap().contains("exited with code 1"));

    let (_, body) = app.get("/active").await;
    assert_eq!(body, json!([]));

    let (status, _) = app.get(&format!("/file/{}", task_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_rejected_when_queue_full() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), FakeYtDlp::Slow);
    config.max_pending_tasks = 1;
    let state = AppState::new(config);
    let app = TestApp {
        app: router(state.clone()),
        state,
        dir,
    };

    let (status, _) = app
        .post("/download", json!({ "url": "https://example.com/a.mp4" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post("/download", json!({ "url": "https://example.com/b.mp4" }))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].is_string());
    assert_eq!(app.state.registry.len(), 1);
}

#[tokio::test]
async fn test_cleanup_removes_files() {
    let app = TestApp::new(FakeYtDlp::Success);
    std::fs::write(app.dir.path().join("a.mp4"), b"a").unwrap();
    std::fs::write(app.dir.path().join("b.part"), b"b").unwrap();
    std::fs::create_dir(app.dir.path().join("nested")).unwrap();

    let (status, body) = app.post("/cleanup", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Cleaned up 2 files", "count": 2 }));
    assert!(!app.dir.path().join("a.mp4").exists());
    assert!(app.dir.path().join("nested").exists());
}
