//! `RemoteStore` implementation for the drive API.
//!
//! Wires [`DriveClient`] and the [`crate::upload`] operations into the
//! port trait consumed by the filesystem adapter.

use bytes::Bytes;
use tokio::sync::mpsc;
use vdrive_core::{domain::RemoteFile, ports::RemoteStore};

use crate::{client::DriveClient, upload};

#[async_trait::async_trait]
impl RemoteStore for DriveClient {
    async fn list_files(&self, parent: Option<&str>) -> anyhow::Result<Vec<RemoteFile>> {
        DriveClient::list_files(self, parent).await
    }

    async fn download(&self, id: &str) -> anyhow::Result<Vec<u8>> {
        self.download_file(id).await
    }

    async fn upload_simple(
        &self,
        name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> anyhow::Result<String> {
        upload::upload_multipart(self, name, content_type, data).await
    }

    async fn upload_resumable(
        &self,
        name: &str,
        content_type: &str,
        total: u64,
        chunks: mpsc::Receiver<Bytes>,
    ) -> anyhow::Result<String> {
        let upload_id = upload::create_upload_session(self, name, content_type, total).await?;
        upload::upload_resumable(self, &upload_id, name, content_type, total, chunks).await
    }

    async fn get_metadata(&self, id: &str) -> anyhow::Result<RemoteFile> {
        self.get_file(id).await
    }
}
