//! Integration tests for the two upload shapes.

use bytes::Bytes;
use tokio::sync::mpsc;
use wiremock::{
    matchers::{header, method, path, query_param, query_param_is_missing},
    Mock, MockServer, ResponseTemplate,
};

use vdrive_api::upload::{
    self, CONTENT_LENGTH_HEADER, CONTENT_RANGE_HEADER, UPLOAD_ID_HEADER,
};
use vdrive_core::ports::RemoteStore;

use crate::common;

/// Mounts the one-shot multipart upload endpoint.
async fn mount_simple_upload(server: &MockServer, response_id: &str) {
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .and(query_param("uploadType", "multipart"))
        .respond_with(ResponseTemplate::new(200).set_body_string(response_id.to_string()))
        .mount(server)
        .await;
}

/// Mounts the resumable init endpoint answering with a session id header.
async fn mount_upload_init(server: &MockServer, upload_id: &str) {
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .and(query_param_is_missing("uploadType"))
        .respond_with(
            ResponseTemplate::new(200).append_header(UPLOAD_ID_HEADER, upload_id.to_string()),
        )
        .mount(server)
        .await;
}

/// Mounts the resumable streaming endpoint for a session id.
async fn mount_upload_stream(server: &MockServer, upload_id: &str, response_id: &str) {
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .and(query_param("uploadType", "resumable"))
        .and(query_param("uploadId", upload_id))
        .respond_with(ResponseTemplate::new(200).set_body_string(response_id.to_string()))
        .mount(server)
        .await;
}

// ============================================================================
// Simple upload
// ============================================================================

#[tokio::test]
async fn simple_upload_returns_plain_text_id() {
    let (server, client) = common::setup().await;
    mount_simple_upload(&server, "file-new-1").await;

    let id = upload::upload_multipart(&client, "notes.txt", "text/plain", b"contents".to_vec())
        .await
        .expect("Simple upload failed");

    assert_eq!(id, "file-new-1");
}

#[tokio::test]
async fn simple_upload_body_carries_file_field() {
    let (server, client) = common::setup().await;
    mount_simple_upload(&server, "file-new-2").await;

    upload::upload_multipart(&client, "notes.txt", "text/plain", b"payload-bytes".to_vec())
        .await
        .expect("Simple upload failed");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body = String::from_utf8_lossy(&requests[0].body);
    // Multipart form with one "file" field carrying the raw content.
    assert!(body.contains("name=\"file\""));
    assert!(body.contains("filename=\"notes.txt\""));
    assert!(body.contains("payload-bytes"));
    let content_type = requests[0]
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("multipart/form-data"));
}

#[tokio::test]
async fn simple_upload_error_status_is_surfaced() {
    let (server, client) = common::setup().await;

    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result =
        upload::upload_multipart(&client, "a.txt", "text/plain", b"x".to_vec()).await;
    assert!(result.is_err());
}

// ============================================================================
// Resumable upload
// ============================================================================

#[tokio::test]
async fn upload_init_extracts_session_id_and_declares_length() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .and(header(CONTENT_LENGTH_HEADER, "10485761"))
        .respond_with(ResponseTemplate::new(200).append_header(UPLOAD_ID_HEADER, "sess-42"))
        .expect(1)
        .mount(&server)
        .await;

    let client = vdrive_api::DriveClient::new(server.uri(), "t");
    let upload_id =
        upload::create_upload_session(&client, "big.bin", "application/octet-stream", 10485761)
            .await
            .expect("Init failed");

    assert_eq!(upload_id, "sess-42");
}

#[tokio::test]
async fn upload_init_without_session_header_is_an_error() {
    let (server, client) = common::setup().await;

    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let result = upload::create_upload_session(&client, "big.bin", "video/mp4", 123).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn resumable_stream_forwards_chunks_in_order() {
    let (server, client) = common::setup().await;
    mount_upload_stream(&server, "sess-7", "file-big-1").await;

    let payload: &[&[u8]] = &[b"alpha-", b"beta-", b"gamma"];
    let total: u64 = payload.iter().map(|c| c.len() as u64).sum();

    let (tx, rx) = mpsc::channel::<Bytes>(2);
    let feeder = tokio::spawn(async move {
        for chunk in [&b"alpha-"[..], b"beta-", b"gamma"] {
            tx.send(Bytes::copy_from_slice(chunk)).await.unwrap();
        }
        // Dropping the sender ends the stream.
    });

    let id = upload::upload_resumable(&client, "sess-7", "big.bin", "application/octet-stream", total, rx)
        .await
        .expect("Resumable upload failed");
    feeder.await.unwrap();

    assert_eq!(id, "file-big-1");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("alpha-beta-gamma"));

    let range = requests[0]
        .headers
        .get(CONTENT_RANGE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert_eq!(range, format!("bytes 0-{}/{}", total - 1, total));
}

#[tokio::test]
async fn remote_store_resumable_runs_init_then_stream() {
    let (server, client) = common::setup().await;
    mount_upload_init(&server, "sess-9").await;
    mount_upload_stream(&server, "sess-9", "file-big-2").await;

    let (tx, rx) = mpsc::channel::<Bytes>(1);
    let feeder = tokio::spawn(async move {
        tx.send(Bytes::from_static(b"0123456789")).await.unwrap();
    });

    let id = client
        .upload_resumable("big.bin", "application/octet-stream", 10, rx)
        .await
        .expect("Resumable upload failed");
    feeder.await.unwrap();

    assert_eq!(id, "file-big-2");
    // Exactly two requests: init, then the streamed body.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}
