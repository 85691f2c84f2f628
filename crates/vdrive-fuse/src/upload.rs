//! Upload strategy selection and the resumable upload pipeline.
//!
//! The remote API understands two upload shapes: a one-shot multipart
//! upload and a resumable streaming session. Strategy is decided once
//! per write sequence from the node's declared size at the first write:
//! at or below the configured threshold every chunk goes out as an
//! independent simple upload; above it, the chunks are pushed onto a
//! bounded channel drained by a concurrent network task.
//!
//! The bounded channel is the flow control: when the network leg falls
//! behind, the channel fills and the writing filesystem callback blocks
//! in `blocking_send` until a chunk is drained, bounding memory use for
//! arbitrarily large uploads.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{info, warn};
use vdrive_core::{config::UploadConfig, ports::RemoteStore};

use crate::tree::PathTree;

/// Transient state for one in-flight write sequence.
///
/// Lives from the first write of a sequence until the local buffer
/// reaches the declared size, at which point the registry entry is
/// dropped; for resumable sequences that drops the sender and signals
/// end-of-stream to the network task.
#[derive(Debug)]
struct PendingUpload {
    /// Declared size sampled at the first write of the sequence
    total: u64,
    /// Chunk sender for resumable sequences; `None` means every chunk is
    /// simple-uploaded on its own
    sender: Option<mpsc::Sender<Bytes>>,
}

/// What the caller should do with the current write chunk.
#[derive(Debug)]
pub enum ChunkRoute {
    /// Send the chunk as an independent one-shot upload.
    Simple { total: u64 },
    /// Push the chunk onto the sequence's channel.
    Resumable {
        total: u64,
        sender: mpsc::Sender<Bytes>,
    },
}

impl ChunkRoute {
    /// Declared total of the write sequence this chunk belongs to.
    pub fn total(&self) -> u64 {
        match self {
            ChunkRoute::Simple { total } => *total,
            ChunkRoute::Resumable { total, .. } => *total,
        }
    }
}

/// Per-path registry of in-flight write sequences.
#[derive(Debug, Default)]
pub struct UploadRegistry {
    inner: Mutex<HashMap<String, PendingUpload>>,
}

impl UploadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes one write chunk, opening a new sequence if none is active
    /// for `path`.
    ///
    /// On the first chunk of a sequence the strategy is fixed from
    /// `declared` (the node's size at that moment): above
    /// `config.simple_max_bytes` a bounded channel is created, sized to
    /// `declared / config.chunk_bytes` entries (minimum one), and
    /// `start` is invoked with the receiver to launch the network task.
    /// Later chunks of the sequence reuse the recorded route regardless
    /// of their offset.
    pub fn route_chunk(
        &self,
        path: &str,
        declared: u64,
        config: &UploadConfig,
        start: impl FnOnce(mpsc::Receiver<Bytes>),
    ) -> ChunkRoute {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        let pending = inner.entry(path.to_string()).or_insert_with(|| {
            if declared > config.simple_max_bytes {
                let capacity = (declared / config.chunk_bytes).max(1) as usize;
                let (tx, rx) = mpsc::channel(capacity);
                start(rx);
                PendingUpload {
                    total: declared,
                    sender: Some(tx),
                }
            } else {
                PendingUpload {
                    total: declared,
                    sender: None,
                }
            }
        });

        match &pending.sender {
            Some(sender) => ChunkRoute::Resumable {
                total: pending.total,
                sender: sender.clone(),
            },
            None => ChunkRoute::Simple {
                total: pending.total,
            },
        }
    }

    /// Ends the sequence for `path`, dropping its sender (which closes
    /// the channel and lets the streaming request finish).
    pub fn finish(&self, path: &str) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path);
    }

    /// Returns true if a write sequence is active for `path`.
    pub fn is_active(&self, path: &str) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(path)
    }
}

/// Drives one resumable upload to completion.
///
/// Runs on its own task, decoupled from the writing filesystem callback
/// by the chunk channel. Once the stream completes, canonical metadata
/// is fetched by the returned id and applied to the node; any failure is
/// logged and leaves the node's metadata stale.
pub async fn run_resumable(
    store: Arc<dyn RemoteStore>,
    tree: Arc<PathTree>,
    path: String,
    name: String,
    content_type: String,
    total: u64,
    chunks: mpsc::Receiver<Bytes>,
) {
    let id = match store
        .upload_resumable(&name, &content_type, total, chunks)
        .await
    {
        Ok(id) => id,
        Err(e) => {
            warn!(%path, error = %e, "resumable upload failed");
            return;
        }
    };

    match store.get_metadata(&id).await {
        Ok(remote) => {
            if tree.apply_remote(&path, remote) {
                info!(%path, %id, total, "resumable upload complete");
            } else {
                warn!(%path, %id, "uploaded path is no longer in the tree");
            }
        }
        Err(e) => {
            warn!(%path, %id, error = %e, "metadata refresh after upload failed");
        }
    }
}

/// MIME type for an object name, from its extension.
pub fn content_type_for(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
