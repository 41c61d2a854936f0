//! Integration tests for the multipart upload client.

mod common;

use assert_matches::assert_matches;
use axum::http::StatusCode;
use genflow_client::{HttpUploader, Uploader};
use genflow_core::GenerationError;
use serde_json::json;

#[tokio::test]
async fn uploads_single_binary_field() {
    let server = common::spawn_server().await;
    server.state.script_upload((StatusCode::OK, json!({"url": "https://files/abc.png"})));

    let uploader = HttpUploader::new(common::http_context(), server.url("/upload"));
    let url = uploader
        .upload(vec![1, 2, 3, 4], "image/png", "input.png")
        .await
        .unwrap();

    assert_eq!(url, "https://files/abc.png");

    let uploads = server.state.uploads.lock().unwrap().clone();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].field, "file");
    assert_eq!(uploads[0].file_name.as_deref(), Some("input.png"));
    assert_eq!(uploads[0].content_type.as_deref(), Some("image/png"));
    assert_eq!(uploads[0].bytes, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn rejected_upload_is_staging_error() {
    let server = common::spawn_server().await;
    server.state.script_upload((StatusCode::PAYLOAD_TOO_LARGE, json!({"error": "too big"})));

    let uploader = HttpUploader::new(common::http_context(), server.url("/upload"));
    let result = uploader.upload(vec![0; 16], "image/png", "big.png").await;

    assert_matches!(result, Err(GenerationError::Staging(msg)) if msg.contains("413"));
}

#[tokio::test]
async fn response_without_url_is_staging_error() {
    let server = common::spawn_server().await;
    server.state.script_upload((StatusCode::OK, json!({"id": "f1"})));

    let uploader = HttpUploader::new(common::http_context(), server.url("/upload"));
    let result = uploader.upload(vec![0; 4], "image/jpeg", "a.jpg").await;

    assert_matches!(result, Err(GenerationError::Staging(_)));
}

#[tokio::test]
async fn invalid_mime_type_is_rejected_before_sending() {
    let server = common::spawn_server().await;

    let uploader = HttpUploader::new(common::http_context(), server.url("/upload"));
    let result = uploader.upload(vec![0; 4], "not a mime", "a.bin").await;

    assert_matches!(result, Err(GenerationError::Staging(_)));
    assert!(server.state.requests_to("/upload").is_empty());
}
