//! HTTP adapter tests driving the router end to end

mod common;

use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use bytes::Bytes;
use common::*;
use form_ingest::api::create_router;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn post(uri: &str, content_type: &str, body: Body) -> Request {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", content_type)
        .body(body)
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_disk_route_counts_parts_and_cleans_up() {
    let (config, temp_dir) = disk_config();
    let app = create_router(Arc::new(config));
    let raw = MultipartBuilder::new()
        .field("title", "x")
        .file("a", "a.bin", "application/octet-stream", &generate_content(200_000, 1))
        .file("b", "b.bin", "application/octet-stream", &generate_content(10, 2))
        .build();

    let response = app
        .oneshot(post("/multipart/disk", MULTIPART_CONTENT_TYPE, Body::from(raw)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["parts_received"], 3);
    assert_dir_empty(temp_dir.path());
}

#[tokio::test]
async fn test_client_disconnect_mid_upload_is_a_client_error_with_no_leftovers() {
    let (config, temp_dir) = disk_config();
    let app = create_router(Arc::new(config));
    let raw = MultipartBuilder::new()
        .file("a", "a.bin", "application/octet-stream", &generate_content(120_000, 3))
        .unterminated();
    let head = Bytes::from(raw[..60_000].to_vec());

    let stream = futures::stream::unfold(0_u8, move |step| {
        let head = head.clone();
        async move {
            match step {
                0 => Some((Ok::<_, std::io::Error>(head), 1)),
                1 => {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    Some((
                        Err(std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            "client went away",
                        )),
                        2,
                    ))
                }
                _ => None,
            }
        }
    });

    let response = app
        .oneshot(post(
            "/multipart/disk",
            MULTIPART_CONTENT_TYPE,
            Body::from_stream(stream),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"]["message"], "aborted");
    assert_dir_empty(temp_dir.path());
}

#[tokio::test]
async fn test_memory_route_rejects_duplicates() {
    let (config, _temp_dir) = disk_config();
    let app = create_router(Arc::new(config));
    let raw = MultipartBuilder::new()
        .field("name", "a")
        .field("name", "b")
        .build();

    let response = app
        .oneshot(post("/multipart/memory", MULTIPART_CONTENT_TYPE, Body::from(raw)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"]["message"], "Field duplicate");
}

#[tokio::test]
async fn test_upload_route_reports_received_bytes() {
    let (config, _temp_dir) = disk_config();
    let app = create_router(Arc::new(config));
    let payload = generate_content(33_333, 7);

    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header("content-type", "application/octet-stream")
        .header("content-length", payload.len())
        .body(Body::from(payload))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["received_bytes"], 33_333);
}
