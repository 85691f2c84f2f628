//! Shared test helpers for drive API integration tests
//!
//! Provides wiremock-based mock server setup for the gateway endpoints.
//! Each helper mounts one endpoint; tests combine them as needed and get
//! a configured `DriveClient` pointing at the mock server.

use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vdrive_api::client::DriveClient;

/// Starts a mock server and returns it with a client pointed at it.
pub async fn setup() -> (MockServer, DriveClient) {
    let server = MockServer::start().await;
    let client = DriveClient::new(server.uri(), "test-access-token");
    (server, client)
}

/// JSON for one file object in listing/metadata responses.
pub fn file_json(id: &str, name: &str, size: u64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "type": "text/plain",
        "size": size,
        "createdAt": 1580000000000_i64,
        "updatedAt": 1580000123456_i64,
        "ownerId": "user-test-001",
        "parent": ""
    })
}

/// JSON for one folder object in listing/metadata responses.
pub fn folder_json(id: &str, name: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "type": "application/vnd.drive.folder",
        "size": 0,
        "createdAt": 1580000000000_i64,
        "updatedAt": 1580000000000_i64,
        "ownerId": "user-test-001",
        "parent": ""
    })
}

/// Mounts the root listing endpoint with the given items.
pub async fn mount_root_listing(server: &MockServer, items: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items))
        .mount(server)
        .await;
}

/// Mounts a `?parent=` filtered listing endpoint for one folder id.
pub async fn mount_child_listing(server: &MockServer, parent_id: &str, items: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/files"))
        .and(query_param("parent", parent_id))
        .respond_with(ResponseTemplate::new(200).set_body_json(items))
        .mount(server)
        .await;
}

/// Mounts a content download endpoint for a specific object id.
pub async fn mount_download(server: &MockServer, id: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/api/files/{id}")))
        .and(query_param("alt", "media"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(content.to_vec())
                .append_header("Content-Type", "application/octet-stream"),
        )
        .mount(server)
        .await;
}

/// Mounts a metadata fetch endpoint for a specific object id.
pub async fn mount_metadata(server: &MockServer, id: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/files/{id}")))
        .and(query_param_is_missing("alt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}
