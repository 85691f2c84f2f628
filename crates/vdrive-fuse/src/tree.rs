//! Path tree: the process-wide cache of filesystem nodes.
//!
//! A single flat table maps absolute paths to [`Node`] records; a second
//! index maps inode numbers back to paths for the kernel-facing side.
//! Parent/child relations are path strings and child names resolved
//! through the table, so no node owns another and no reference cycles can
//! form.
//!
//! The host dispatches filesystem callbacks concurrently, so every
//! lookup, node-field mutation and children update goes through one
//! tree-wide reader/writer lock.

use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use fuser::{FileAttr, FileType};
use vdrive_core::domain::RemoteFile;

use crate::node::Node;

/// One resolved directory entry, as handed to readdir.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub ino: u64,
    pub name: String,
    pub kind: FileType,
}

#[derive(Debug, Default)]
struct TreeInner {
    /// path -> node
    nodes: HashMap<String, Node>,
    /// inode -> path (reverse lookup for the kernel interface)
    paths: HashMap<u64, String>,
    /// next inode number to hand out
    next_ino: u64,
}

/// Flat path-keyed node table behind a tree-wide lock.
#[derive(Debug)]
pub struct PathTree {
    inner: RwLock<TreeInner>,
}

impl PathTree {
    /// Creates an empty tree. Inode numbers start at 1, so the first
    /// node created (the root) gets the inode number FUSE expects for
    /// the mount point.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(TreeInner {
                nodes: HashMap::new(),
                paths: HashMap::new(),
                next_ino: 1,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, TreeInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TreeInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates a node for `path` and links it under its parent.
    ///
    /// Purely local bookkeeping - no remote call is made. Invoked both
    /// for local creates (mknod/mkdir) and for materializing
    /// remotely-discovered entries, which pass their `RemoteFile`
    /// metadata so size and timestamps come from the service.
    ///
    /// A fresh inode number is assigned; creating over an existing path
    /// replaces the old record.
    ///
    /// # Returns
    /// The new node's inode number.
    pub fn create_node(
        &self,
        path: &str,
        kind: FileType,
        perm: u16,
        uid: u32,
        gid: u32,
        remote: Option<RemoteFile>,
    ) -> u64 {
        let parent = parent_path(path);
        let name = leaf_name(path).to_string();

        let mut inner = self.write();
        let ino = inner.next_ino;
        inner.next_ino += 1;

        let mut node = Node::new(ino, name.clone(), parent.clone(), kind, perm, uid, gid);
        if let Some(remote) = remote {
            node.apply_remote(remote);
        }

        if let Some(parent) = parent {
            if let Some(parent_node) = inner.nodes.get_mut(&parent) {
                if !parent_node.children.iter().any(|c| c == &name) {
                    parent_node.children.push(name);
                }
            }
        }

        if let Some(old) = inner.nodes.insert(path.to_string(), node) {
            inner.paths.remove(&old.ino);
        }
        inner.paths.insert(ino, path.to_string());

        ino
    }

    /// Returns true if `path` has an entry.
    pub fn contains(&self, path: &str) -> bool {
        self.read().nodes.contains_key(path)
    }

    /// Synthesized attributes for `path`.
    pub fn attr(&self, path: &str) -> Option<FileAttr> {
        self.read().nodes.get(path).map(Node::to_file_attr)
    }

    /// Runs `f` with shared access to the node at `path`.
    pub fn with_node<R>(&self, path: &str, f: impl FnOnce(&Node) -> R) -> Option<R> {
        self.read().nodes.get(path).map(f)
    }

    /// Runs `f` with exclusive access to the node at `path`.
    pub fn with_node_mut<R>(&self, path: &str, f: impl FnOnce(&mut Node) -> R) -> Option<R> {
        self.write().nodes.get_mut(path).map(f)
    }

    /// Resolves an inode number back to its path.
    pub fn path_of(&self, ino: u64) -> Option<String> {
        self.read().paths.get(&ino).cloned()
    }

    /// Refreshes the node at `path` from remote metadata.
    ///
    /// # Returns
    /// False when the path has no entry.
    pub fn apply_remote(&self, path: &str, remote: RemoteFile) -> bool {
        self.with_node_mut(path, |node| node.apply_remote(remote))
            .is_some()
    }

    /// Marks the directory at `path` as having a complete children list.
    pub fn mark_children_populated(&self, path: &str) {
        self.with_node_mut(path, |node| node.children_populated = true);
    }

    /// Resolved child entries of the directory at `path`, in insertion
    /// order. Does not include `.` or `..`.
    ///
    /// # Returns
    /// `None` when the path has no entry.
    pub fn entries(&self, path: &str) -> Option<Vec<DirEntry>> {
        let inner = self.read();
        let node = inner.nodes.get(path)?;

        let entries = node
            .children
            .iter()
            .filter_map(|name| {
                let child = inner.nodes.get(&join_path(path, name))?;
                Some(DirEntry {
                    ino: child.ino,
                    name: name.clone(),
                    kind: child.kind,
                })
            })
            .collect();
        Some(entries)
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.read().nodes.len()
    }

    /// Returns true if the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.read().nodes.is_empty()
    }
}

impl Default for PathTree {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Path helpers
// ============================================================================

/// Owning directory of `path`; `None` for the root.
pub fn parent_path(path: &str) -> Option<String> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(idx) => Some(path[..idx].to_string()),
        None => Some("/".to_string()),
    }
}

/// Final component of `path` (`"/"` for the root).
pub fn leaf_name(path: &str) -> &str {
    if path == "/" {
        return "/";
    }
    path.rsplit('/').next().unwrap_or(path)
}

/// Joins a directory path and a child name.
pub fn join_path(dir: &str, name: &str) -> String {
    if dir == "/" {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}
