use super::*;
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::Response;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;


const MULTIPART: &str = "multipart/form-data; boundary=BOUNDARY";

/// Router writing disk-mode files into a fresh temp directory
fn create_test_router() -> (Router, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let config = IngestConfig {
        output_dir: Some(temp_dir.path().to_path_buf()),
        body_limit: 10,
        ..Default::default()
    };
    (create_router(Arc::new(config)), temp_dir)
}

fn post(uri: &str, content_type: &str, body: impl Into<Body>) -> Request {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", content_type)
        .body(body.into())
        .unwrap()
}

async fn json_body(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn sample_form() -> Vec<u8> {
    let mut raw = Vec::new();
    raw.extend_from_slice(
        b"--BOUNDARY\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nhello\r\n",
    );
    raw.extend_from_slice(
        b"--BOUNDARY\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.bin\"\r\n\
          Content-Type: application/octet-stream\r\n\r\n",
    );
    raw.extend(std::iter::repeat_n(b'z', 50_000));
    raw.extend_from_slice(b"\r\n--BOUNDARY--\r\n");
    raw
}

fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let config = Arc::new(IngestConfig::default());
    let api_handle = tokio::spawn(start_api_server(config, "127.0.0.1:0".parse().unwrap()));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server should keep running");

    api_handle.abort();
}

#[tokio::test]
async fn test_api_server_rejects_invalid_config() {
    let config = Arc::new(IngestConfig {
        write_queue_depth: 0,
        ..Default::default()
    });
    let result = start_api_server(config, "127.0.0.1:0".parse().unwrap()).await;
    assert!(matches!(result, Err(crate::Error::Config { .. })));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (app, _temp_dir) = create_test_router();
    let response = app
        .oneshot(post("/nope", "text/plain", "x"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
