//! Path-based virtual filesystem over the remote store.
//!
//! `DriveVfs` is the orchestrator behind the FUSE callbacks: it owns the
//! path tree, routes reads through the content cache, and reconciles
//! OS-shaped writes (unbounded, chunked, offset-addressed) with the two
//! upload shapes the remote API offers.
//!
//! Every method is synchronous and safe to call from concurrently
//! dispatched filesystem callbacks; network work runs on the injected
//! tokio runtime handle, either inline via `block_on` (listings, reads,
//! simple uploads) or on a spawned task (resumable uploads). No tree
//! lock is held across a network call or a channel send.

use std::sync::Arc;

use bytes::Bytes;
use fuser::{FileAttr, FileType};
use tokio::runtime::Handle;
use tracing::{debug, warn};
use vdrive_core::{config::UploadConfig, domain::RemoteFile, ports::RemoteStore};

use crate::{
    buffer::ContentBuffer,
    error::VfsError,
    node::Node,
    tree::{join_path, leaf_name, DirEntry, PathTree},
    upload::{content_type_for, run_resumable, ChunkRoute, UploadRegistry},
};

/// Permissions for directories.
const DIR_PERM: u16 = 0o755;

/// Permissions for regular files.
const FILE_PERM: u16 = 0o644;

/// The virtual-filesystem adapter.
pub struct DriveVfs {
    /// Remote store capability, injected at construction
    store: Arc<dyn RemoteStore>,
    /// Path-keyed node cache
    tree: Arc<PathTree>,
    /// In-flight write sequences
    uploads: UploadRegistry,
    /// Upload strategy settings
    upload_config: UploadConfig,
    /// Runtime handle for network work
    rt: Handle,
    /// uid assigned to every node
    uid: u32,
    /// gid assigned to every node
    gid: u32,
}

impl DriveVfs {
    /// Creates an adapter over `store`.
    ///
    /// `rt` must belong to a runtime that outlives the filesystem; it
    /// carries all listing/transfer futures and the resumable upload
    /// tasks.
    pub fn new(store: Arc<dyn RemoteStore>, upload_config: UploadConfig, rt: Handle) -> Self {
        Self {
            store,
            tree: Arc::new(PathTree::new()),
            uploads: UploadRegistry::new(),
            upload_config,
            rt,
            uid: unsafe { libc::getuid() },
            gid: unsafe { libc::getgid() },
        }
    }

    /// The underlying path tree.
    pub fn tree(&self) -> &Arc<PathTree> {
        &self.tree
    }

    /// Creates the root node and eagerly populates the tree's top level
    /// from one remote listing.
    ///
    /// A failed listing logs and mounts an empty tree; deeper levels
    /// populate lazily on first attribute query.
    pub fn init(&self) {
        self.tree
            .create_node("/", FileType::Directory, DIR_PERM, self.uid, self.gid, None);

        match self.rt.block_on(self.store.list_files(None)) {
            Ok(files) => {
                let count = files.len();
                for file in files {
                    self.materialize("/", file);
                }
                debug!(count, "root listing complete");
            }
            Err(e) => {
                warn!(error = %e, "root listing failed, mounting an empty tree");
            }
        }
    }

    /// Creates a node for one remotely-discovered entry under `dir`.
    fn materialize(&self, dir: &str, file: RemoteFile) {
        let (kind, perm) = if file.is_folder() {
            (FileType::Directory, DIR_PERM)
        } else {
            (FileType::RegularFile, FILE_PERM)
        };
        let path = join_path(dir, &file.name);
        self.tree
            .create_node(&path, kind, perm, self.uid, self.gid, Some(file));
    }

    /// Returns the node's synthesized attributes, lazily listing a
    /// remote folder whose children are still unknown.
    ///
    /// The listing is best-effort: on failure the directory stays
    /// unpopulated (the next query retries) and the already-known
    /// attributes are returned.
    pub fn getattr(&self, path: &str) -> Result<FileAttr, VfsError> {
        let unlisted_folder = self
            .tree
            .with_node(path, |node| {
                if node.kind == FileType::Directory
                    && node.is_remote_folder()
                    && !node.children_populated
                {
                    node.remote_id().map(str::to_string)
                } else {
                    None
                }
            })
            .ok_or_else(|| VfsError::NotFound(path.to_string()))?;

        if let Some(folder_id) = unlisted_folder {
            match self.rt.block_on(self.store.list_files(Some(&folder_id))) {
                Ok(files) => {
                    debug!(path, count = files.len(), "lazy listing complete");
                    for file in files {
                        self.materialize(path, file);
                    }
                    self.tree.mark_children_populated(path);
                }
                Err(e) => {
                    warn!(path, error = %e, "lazy listing failed, serving cached attributes");
                }
            }
        }

        self.tree
            .attr(path)
            .ok_or_else(|| VfsError::NotFound(path.to_string()))
    }

    /// Resolves `name` under the directory `parent` and returns its
    /// attributes. Routed through [`DriveVfs::getattr`] so that path
    /// resolution triggers lazy population the same way a stat does.
    pub fn lookup(&self, parent: &str, name: &str) -> Result<FileAttr, VfsError> {
        self.getattr(&join_path(parent, name))
    }

    /// Reads up to `size` bytes at `offset`.
    ///
    /// The requested range is clamped to the node's declared size; an
    /// empty effective range reads zero bytes. On the first cache miss
    /// the complete object body is fetched and kept, making the cache
    /// authoritative for subsequent reads. A failed fetch logs and reads
    /// zero bytes.
    pub fn read(&self, path: &str, offset: i64, size: u32) -> Result<Vec<u8>, VfsError> {
        let (declared, cached, remote_id) = self
            .tree
            .with_node(path, |node| {
                (
                    node.size,
                    node.content.is_some(),
                    node.remote_id().map(str::to_string),
                )
            })
            .ok_or_else(|| VfsError::NotFound(path.to_string()))?;

        if offset < 0 {
            return Ok(Vec::new());
        }
        let offset = offset as u64;
        let end = offset.saturating_add(size as u64).min(declared);
        if end <= offset {
            return Ok(Vec::new());
        }

        if cached {
            let data = self
                .tree
                .with_node(path, |node| copy_range(node, offset, end))
                .unwrap_or_default();
            return Ok(data);
        }

        let Some(id) = remote_id else {
            warn!(path, "read miss on a node with no remote copy");
            return Ok(Vec::new());
        };

        match self.rt.block_on(self.store.download(&id)) {
            Ok(body) => {
                debug!(path, len = body.len(), "cached full object content");
                let data = self
                    .tree
                    .with_node_mut(path, |node| {
                        node.content = Some(ContentBuffer::from_vec(body));
                        copy_range(node, offset, end)
                    })
                    .unwrap_or_default();
                Ok(data)
            }
            Err(e) => {
                warn!(path, error = %e, "content fetch failed");
                Ok(Vec::new())
            }
        }
    }

    /// Writes `data` at `offset`, forwarding the chunk to the remote
    /// service according to the sequence's upload strategy.
    ///
    /// The strategy is fixed once per write sequence from the node's
    /// declared size at the first write: at or below the simple-upload
    /// threshold each chunk goes out as an independent one-shot upload;
    /// above it, chunks are pushed onto the sequence's bounded channel
    /// (blocking here when the network leg lags). The local cache is
    /// patched at `offset` either way, and once the buffer reaches the
    /// declared size the sequence ends and the channel (if any) closes.
    ///
    /// Writes are expected to arrive contiguously in non-decreasing
    /// offset order; overwriting an already-uploaded file is not
    /// reconciled with the remote copy.
    pub fn write(&self, path: &str, data: &[u8], offset: i64) -> Result<u32, VfsError> {
        let declared = self
            .tree
            .with_node(path, |node| node.size)
            .ok_or_else(|| VfsError::NotFound(path.to_string()))?;

        let name = leaf_name(path).to_string();
        let content_type = content_type_for(&name);

        let route = {
            let store = Arc::clone(&self.store);
            let tree = Arc::clone(&self.tree);
            let rt = self.rt.clone();
            let (task_path, task_name, task_ct) =
                (path.to_string(), name.clone(), content_type.clone());
            self.uploads
                .route_chunk(path, declared, &self.upload_config, move |rx| {
                    rt.spawn(run_resumable(
                        store, tree, task_path, task_name, task_ct, declared, rx,
                    ));
                })
        };

        match &route {
            ChunkRoute::Simple { .. } => {
                self.simple_upload_chunk(path, &name, &content_type, data);
            }
            ChunkRoute::Resumable { sender, .. } => {
                if sender.blocking_send(Bytes::copy_from_slice(data)).is_err() {
                    warn!(path, "upload stream closed early, chunk not forwarded");
                }
            }
        }

        let offset = offset.max(0) as usize;
        let end = offset + data.len();
        self.tree
            .with_node_mut(path, |node| -> Result<(), VfsError> {
                node.content
                    .get_or_insert_with(ContentBuffer::new)
                    .write_at(offset, data)?;
                if end as u64 >= route.total() {
                    node.size = end as u64;
                }
                Ok(())
            })
            .ok_or_else(|| VfsError::NotFound(path.to_string()))??;

        if end as u64 >= route.total() {
            // The buffer reached the declared size: the sequence is
            // over, and dropping the sender ends the upload stream.
            self.uploads.finish(path);
        }

        Ok(data.len() as u32)
    }

    /// One-shot upload of a single write chunk, followed by a metadata
    /// refresh by the returned id. Any failing step logs and leaves the
    /// node's metadata unchanged.
    fn simple_upload_chunk(&self, path: &str, name: &str, content_type: &str, data: &[u8]) {
        let result = self.rt.block_on(async {
            let id = self
                .store
                .upload_simple(name, content_type, data.to_vec())
                .await?;
            self.store.get_metadata(&id).await
        });

        match result {
            Ok(remote) => {
                debug!(path, id = %remote.id, "simple upload complete");
                if !self.tree.apply_remote(path, remote) {
                    warn!(path, "uploaded path is no longer in the tree");
                }
            }
            Err(e) => {
                warn!(path, error = %e, "simple upload failed");
            }
        }
    }

    /// Grows or shrinks the cache buffer and updates the declared size.
    ///
    /// Purely local - the remote copy is only reconciled by the next
    /// successful upload.
    pub fn truncate(&self, path: &str, size: u64) -> Result<(), VfsError> {
        self.tree
            .with_node_mut(path, |node| -> Result<(), VfsError> {
                node.content
                    .get_or_insert_with(ContentBuffer::new)
                    .resize(size as usize, true)?;
                node.size = size;
                Ok(())
            })
            .ok_or_else(|| VfsError::NotFound(path.to_string()))?
    }

    /// Creates a regular file node. Local bookkeeping only.
    pub fn mknod(&self, path: &str, perm: u16) -> Result<FileAttr, VfsError> {
        self.tree
            .create_node(path, FileType::RegularFile, perm, self.uid, self.gid, None);
        self.tree
            .attr(path)
            .ok_or_else(|| VfsError::NotFound(path.to_string()))
    }

    /// Creates a directory node. Local bookkeeping only.
    pub fn mkdir(&self, path: &str, perm: u16) -> Result<FileAttr, VfsError> {
        self.tree
            .create_node(path, FileType::Directory, perm, self.uid, self.gid, None);
        self.tree
            .attr(path)
            .ok_or_else(|| VfsError::NotFound(path.to_string()))
    }

    /// Directory entries for `path`: `.`, `..`, then the cached
    /// children. Purely local; population happens on attribute queries.
    pub fn readdir(&self, path: &str) -> Result<Vec<DirEntry>, VfsError> {
        let (ino, parent, is_dir) = self
            .tree
            .with_node(path, |node| {
                (
                    node.ino,
                    node.parent.clone(),
                    node.kind == FileType::Directory,
                )
            })
            .ok_or_else(|| VfsError::NotFound(path.to_string()))?;

        if !is_dir {
            return Err(VfsError::NotADirectory(path.to_string()));
        }

        let parent_ino = parent
            .and_then(|p| self.tree.with_node(&p, |node| node.ino))
            .unwrap_or(ino);

        let mut entries = vec![
            DirEntry {
                ino,
                name: ".".to_string(),
                kind: FileType::Directory,
            },
            DirEntry {
                ino: parent_ino,
                name: "..".to_string(),
                kind: FileType::Directory,
            },
        ];
        entries.extend(self.tree.entries(path).unwrap_or_default());
        Ok(entries)
    }

    /// Checks that `path` exists and returns its inode number (used as
    /// the file handle).
    pub fn open(&self, path: &str) -> Result<u64, VfsError> {
        self.tree
            .with_node(path, |node| node.ino)
            .ok_or_else(|| VfsError::NotFound(path.to_string()))
    }

    /// Resolves an inode number back to its path.
    pub fn path_of(&self, ino: u64) -> Option<String> {
        self.tree.path_of(ino)
    }

    /// Number of nodes currently cached.
    pub fn node_count(&self) -> usize {
        self.tree.len()
    }
}

/// Copies `[offset, end)` out of the node's cache, clamped to what the
/// buffer actually holds.
fn copy_range(node: &Node, offset: u64, end: u64) -> Vec<u8> {
    let data = node.content.as_ref().map(|c| c.as_slice()).unwrap_or(&[]);
    let offset = (offset as usize).min(data.len());
    let end = (end as usize).min(data.len());
    data[offset..end].to_vec()
}
