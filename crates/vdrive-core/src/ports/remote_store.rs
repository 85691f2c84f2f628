//! Remote store port (driven/secondary port)
//!
//! This module defines the interface the filesystem adapter uses to talk
//! to the remote drive service. The production implementation lives in
//! `vdrive-api`; tests substitute fakes.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are
//!   adapter-specific and don't need domain-level classification. Callers
//!   in the filesystem layer treat every remote failure as best-effort
//!   and fall back to local state.
//! - Uses `#[async_trait]` for async trait methods.
//! - `upload_resumable` consumes a bounded channel of chunks so the
//!   adapter can stream an upload body without buffering the whole object
//!   for the network leg. Chunks are forwarded in channel order; the
//!   upload finishes when the sender side is dropped.

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::domain::RemoteFile;

/// Port trait for drive service operations.
///
/// All methods carry the caller's bearer token implicitly (the adapter is
/// constructed with its credentials). Implementations are expected to be
/// cheap to share behind an `Arc` and safe to call concurrently.
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    /// Lists objects, optionally filtered by parent folder identifier.
    ///
    /// `parent = None` lists the drive root.
    async fn list_files(&self, parent: Option<&str>) -> anyhow::Result<Vec<RemoteFile>>;

    /// Fetches the complete content of an object by identifier.
    async fn download(&self, id: &str) -> anyhow::Result<Vec<u8>>;

    /// Uploads a complete object in one request.
    ///
    /// # Returns
    /// The identifier of the created object.
    async fn upload_simple(
        &self,
        name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> anyhow::Result<String>;

    /// Uploads an object of `total` declared bytes by streaming chunks
    /// from `chunks` over a single request.
    ///
    /// The implementation initiates an upload session, then forwards each
    /// received chunk to the network as it arrives. The stream ends when
    /// the channel's sender is dropped.
    ///
    /// # Returns
    /// The identifier of the created object.
    async fn upload_resumable(
        &self,
        name: &str,
        content_type: &str,
        total: u64,
        chunks: mpsc::Receiver<Bytes>,
    ) -> anyhow::Result<String>;

    /// Fetches metadata for an object by identifier.
    async fn get_metadata(&self, id: &str) -> anyhow::Result<RemoteFile>;
}
