//! End-to-end memory mode ingestion and whole-body helpers

mod common;

use common::*;
use form_ingest::{
    FormError, IngestConfig, Limits, SimpleBody, accumulate_body, host, parse_form_data_body,
    parse_simple_body,
};

#[tokio::test]
async fn test_memory_form_keeps_contents_and_metadata() {
    let payload = generate_content(64_000, 9);
    let raw = MultipartBuilder::new()
        .field("name", "ferris")
        .file("upload", "crab.bin", "application/octet-stream", &payload)
        .build();

    let mut body = feed_in_pieces(raw, 333);
    let form = parse_form_data_body(MULTIPART_CONTENT_TYPE, &mut body, &IngestConfig::default())
        .await
        .unwrap();

    assert_eq!(form.fields.get("name").map(String::as_str), Some("ferris"));
    let upload = form.files.as_memory().unwrap().get("upload").unwrap();
    assert_eq!(upload.filename, "crab.bin");
    assert_eq!(upload.mime_type, "application/octet-stream");
    assert_eq!(upload.encoding, "7bit");
    assert_eq!(&upload.contents[..], &payload[..]);
    assert_eq!(form.parts_received(), 2);
}

#[tokio::test]
async fn test_repeated_fields_collect_in_arrival_order() {
    let raw = MultipartBuilder::new()
        .field("tag", "a")
        .field("other", "x")
        .field("tag", "b")
        .field("tag", "c")
        .build();

    let mut body = feed_in_pieces(raw, 5);
    let form = parse_form_data_body(MULTIPART_CONTENT_TYPE, &mut body, &repeated_memory_config())
        .await
        .unwrap();

    assert_eq!(form.fields.get_all("tag"), ["a", "b", "c"]);
    assert_eq!(form.fields.get_all("other"), ["x"]);
}

#[tokio::test]
async fn test_limits_fail_the_whole_request() {
    let config = IngestConfig {
        limits: Limits {
            fields: Some(2),
            ..Default::default()
        },
        ..Default::default()
    };
    let raw = MultipartBuilder::new()
        .field("a", "1")
        .field("b", "2")
        .field("c", "3")
        .build();

    let mut body = feed_in_pieces(raw, usize::MAX);
    let err = parse_form_data_body(MULTIPART_CONTENT_TYPE, &mut body, &config)
        .await
        .unwrap_err();
    assert_eq!(err, FormError::TooManyParts);
}

#[tokio::test]
async fn test_urlencoded_body_split_anywhere() {
    let raw = b"name=ferris&lang=rust+lang&emoji=%F0%9F%A6%80".to_vec();
    for piece in [1_usize, 4, usize::MAX] {
        let mut body = feed_in_pieces(raw.clone(), piece);
        let form = parse_form_data_body(
            "application/x-www-form-urlencoded",
            &mut body,
            &IngestConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(form.fields.get("name").map(String::as_str), Some("ferris"));
        assert_eq!(form.fields.get("lang").map(String::as_str), Some("rust lang"));
        assert_eq!(form.fields.get("emoji").map(String::as_str), Some("\u{1F980}"));
        assert_eq!(form.files.value_count(), 0);
    }
}

#[tokio::test]
async fn test_accumulate_matches_input_for_known_and_unknown_length() {
    let payload = generate_content(10_000, 11);

    for (expected, shared) in [(payload.len(), false), (0, true), (4_000, false)] {
        let mut body = feed_in_pieces(payload.clone(), 777);
        let buffer = accumulate_body(&mut body, expected, shared).await;
        assert_eq!(buffer.len(), payload.len());
        assert_eq!(buffer.as_ref(), &payload[..]);
    }
}

#[tokio::test]
async fn test_simple_body_round_trip_and_limit() {
    let (feeder, mut body) = host::channel(2);
    feeder.send(r#"{"ok":true}"#, true).await.unwrap();
    let parsed = parse_simple_body(&mut body, "application/json; charset=utf-8", 1024)
        .await
        .unwrap();
    assert_eq!(parsed, SimpleBody::Json(serde_json::json!({ "ok": true })));

    let mut body = feed_in_pieces(vec![b'x'; 100], 10);
    let err = parse_simple_body(&mut body, "text/plain", 50).await.unwrap_err();
    assert_eq!(err, FormError::BodyTooLarge { limit: 50 });
}
