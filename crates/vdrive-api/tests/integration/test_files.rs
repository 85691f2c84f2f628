//! Integration tests for listing, download and metadata operations.

use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use vdrive_api::client::DriveClient;

use crate::common;

// ============================================================================
// Listing tests
// ============================================================================

#[tokio::test]
async fn list_root_returns_entries() {
    let (server, client) = common::setup().await;

    common::mount_root_listing(
        &server,
        serde_json::json!([
            common::folder_json("folder-1", "docs"),
            common::file_json("file-1", "a.txt", 10),
        ]),
    )
    .await;

    let files = client.list_files(None).await.expect("Listing failed");

    assert_eq!(files.len(), 2);
    assert!(files[0].is_folder());
    assert_eq!(files[0].name, "docs");
    assert_eq!(files[1].name, "a.txt");
    assert_eq!(files[1].size, 10);
}

#[tokio::test]
async fn list_children_sends_parent_filter() {
    let (server, client) = common::setup().await;

    common::mount_child_listing(
        &server,
        "folder-1",
        serde_json::json!([common::file_json("file-2", "nested.txt", 4)]),
    )
    .await;

    let files = client
        .list_files(Some("folder-1"))
        .await
        .expect("Filtered listing failed");

    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "nested.txt");
}

#[tokio::test]
async fn listing_sends_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/files"))
        .and(header("Authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = DriveClient::new(server.uri(), "secret-token");
    let files = client.list_files(None).await.expect("Listing failed");
    assert!(files.is_empty());
}

#[tokio::test]
async fn listing_error_status_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/files"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = DriveClient::new(server.uri(), "t");
    assert!(client.list_files(None).await.is_err());
}

// ============================================================================
// Download tests
// ============================================================================

#[tokio::test]
async fn download_returns_content() {
    let (server, client) = common::setup().await;

    let content = b"hello12345";
    common::mount_download(&server, "file-1", content).await;

    let data = client.download_file("file-1").await.expect("Download failed");
    assert_eq!(data, content);
}

#[tokio::test]
async fn download_empty_file() {
    let (server, client) = common::setup().await;

    common::mount_download(&server, "empty-1", &[]).await;

    let data = client.download_file("empty-1").await.expect("Download failed");
    assert!(data.is_empty());
}

#[tokio::test]
async fn download_404_is_an_error() {
    let (server, client) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/api/files/nonexistent"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(client.download_file("nonexistent").await.is_err());
}

// ============================================================================
// Metadata tests
// ============================================================================

#[tokio::test]
async fn metadata_fetch_parses_object() {
    let (server, client) = common::setup().await;

    common::mount_metadata(&server, "file-9", common::file_json("file-9", "photo.jpg", 2048)).await;

    let file = client.get_file("file-9").await.expect("Metadata fetch failed");
    assert_eq!(file.id, "file-9");
    assert_eq!(file.name, "photo.jpg");
    assert_eq!(file.size, 2048);
    assert_eq!(file.created_at, 1580000000000);
}

#[tokio::test]
async fn metadata_and_download_coexist_for_one_id() {
    let (server, client) = common::setup().await;

    common::mount_download(&server, "file-5", b"body bytes").await;
    common::mount_metadata(&server, "file-5", common::file_json("file-5", "b.bin", 10)).await;

    let meta = client.get_file("file-5").await.expect("Metadata fetch failed");
    let data = client.download_file("file-5").await.expect("Download failed");
    assert_eq!(meta.name, "b.bin");
    assert_eq!(data, b"body bytes");
}
