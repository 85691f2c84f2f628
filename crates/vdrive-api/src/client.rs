//! Drive API client
//!
//! Provides a typed HTTP client for the drive REST gateway. Handles
//! authentication headers, JSON deserialization, and endpoint
//! construction.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vdrive_api::client::DriveClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = DriveClient::new("https://drive.example.com", "access-token");
//! let root = client.list_files(None).await?;
//! println!("{} entries at the root", root.len());
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use reqwest::{Client, Method, RequestBuilder};
use tracing::debug;
use vdrive_core::domain::RemoteFile;

/// HTTP client for drive API calls.
///
/// Wraps `reqwest::Client` with bearer authentication and base URL
/// construction. Cheap to share behind an `Arc`; `reqwest::Client` is
/// internally reference-counted.
pub struct DriveClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests
    base_url: String,
    /// Bearer token sent on every request
    token: String,
}

impl DriveClient {
    /// Creates a new client for the gateway at `base_url`.
    ///
    /// # Arguments
    /// * `base_url` - Gateway origin, without a trailing slash
    /// * `token` - Bearer token for the `Authorization` header
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// Returns the base URL for API requests.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an authenticated request builder for the given method and path.
    ///
    /// Automatically prepends the base URL and adds the Authorization header.
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - API path relative to the base URL (e.g. "/api/files")
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, &url).bearer_auth(&self.token)
    }

    /// Lists objects, optionally filtered by parent folder identifier.
    ///
    /// `GET /api/files` lists the drive root; `GET /api/files?parent={id}`
    /// lists the children of one folder.
    pub async fn list_files(&self, parent: Option<&str>) -> Result<Vec<RemoteFile>> {
        debug!(parent = parent.unwrap_or("<root>"), "Listing files");

        let mut request = self.request(Method::GET, "/api/files");
        if let Some(parent) = parent {
            request = request.query(&[("parent", parent)]);
        }

        let files: Vec<RemoteFile> = request
            .send()
            .await
            .context("Failed to send listing request")?
            .error_for_status()
            .context("Listing request returned error status")?
            .json()
            .await
            .context("Failed to parse listing response")?;

        debug!(count = files.len(), "Listing complete");
        Ok(files)
    }

    /// Downloads the complete content of an object.
    ///
    /// `GET /api/files/{id}?alt=media` returns the raw bytes.
    pub async fn download_file(&self, id: &str) -> Result<Vec<u8>> {
        let path = format!("/api/files/{id}");
        debug!(id, "Downloading file content");

        let response = self
            .request(Method::GET, &path)
            .query(&[("alt", "media")])
            .send()
            .await
            .context("Failed to send download request")?
            .error_for_status()
            .context("Download request returned error status")?;

        let bytes = response
            .bytes()
            .await
            .context("Failed to read download response body")?;

        debug!(id, len = bytes.len(), "Download complete");
        Ok(bytes.to_vec())
    }

    /// Fetches metadata for an object by identifier.
    ///
    /// `GET /api/files/{id}` returns the same JSON object shape as the
    /// listing endpoint.
    pub async fn get_file(&self, id: &str) -> Result<RemoteFile> {
        let path = format!("/api/files/{id}");
        debug!(id, "Fetching file metadata");

        let file: RemoteFile = self
            .request(Method::GET, &path)
            .send()
            .await
            .context("Failed to send metadata request")?
            .error_for_status()
            .context("Metadata request returned error status")?
            .json()
            .await
            .context("Failed to parse metadata response")?;

        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_adds_auth_and_base_url() {
        let client = DriveClient::new("http://localhost:8080", "test-token");
        let request = client.request(Method::GET, "/api/files").build().unwrap();

        assert_eq!(request.url().as_str(), "http://localhost:8080/api/files");
        let auth = request
            .headers()
            .get("authorization")
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(auth, "Bearer test-token");
    }

    #[test]
    fn base_url_is_preserved() {
        let client = DriveClient::new("https://drive.example.com", "t");
        assert_eq!(client.base_url(), "https://drive.example.com");
    }
}
