//! Cached filesystem node.
//!
//! A `Node` is the in-memory record for one remote file or directory:
//! the metadata the drive service last reported, the OS-visible
//! attributes synthesized from it, and the optional cached content.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fuser::{FileAttr, FileType};
use vdrive_core::domain::RemoteFile;

use crate::buffer::ContentBuffer;

/// One entry in the path tree.
///
/// Nodes never own each other: the tree owns every node in a flat
/// path-keyed table, and `parent` / `children` are path and name
/// relations resolved through that table. This rules out reference
/// cycles by construction.
#[derive(Debug)]
pub struct Node {
    /// Inode number, unique for the lifetime of the tree
    pub ino: u64,
    /// Entry name (no path)
    pub name: String,
    /// Path of the owning directory (`None` for the root)
    pub parent: Option<String>,
    /// File type (regular file or directory)
    pub kind: FileType,
    /// Unix permissions
    pub perm: u16,
    /// Owning user id
    pub uid: u32,
    /// Owning group id
    pub gid: u32,
    /// Declared size in bytes; drives read clamping and upload strategy
    pub size: u64,
    /// Last access time
    pub atime: SystemTime,
    /// Last modification time
    pub mtime: SystemTime,
    /// Last metadata change time
    pub ctime: SystemTime,
    /// Creation time
    pub crtime: SystemTime,
    /// Metadata last reported by the drive service (`None` for nodes
    /// created locally that have not completed an upload yet)
    pub remote: Option<RemoteFile>,
    /// Cached object content; `None` means not yet fetched
    pub content: Option<ContentBuffer>,
    /// Names of this directory's children
    pub children: Vec<String>,
    /// Whether `children` reflects a completed remote listing.
    ///
    /// A remote folder starts out unpopulated; the first attribute query
    /// lists it and flips this, even when the listing comes back empty.
    /// Files and locally created directories have nothing to list and
    /// start populated.
    pub children_populated: bool,
}

impl Node {
    /// Creates a node with default attributes: current time for all
    /// timestamps, the given ownership and permissions, size zero.
    pub fn new(
        ino: u64,
        name: String,
        parent: Option<String>,
        kind: FileType,
        perm: u16,
        uid: u32,
        gid: u32,
    ) -> Self {
        let now = SystemTime::now();
        Self {
            ino,
            name,
            parent,
            kind,
            perm,
            uid,
            gid,
            size: 0,
            atime: now,
            mtime: now,
            ctime: now,
            crtime: now,
            remote: None,
            content: None,
            children: Vec::new(),
            children_populated: true,
        }
    }

    /// Applies remote metadata: declared size, creation time and the two
    /// change times are overwritten from the service's record. Access
    /// time stays local.
    pub fn apply_remote(&mut self, remote: RemoteFile) {
        self.size = remote.size;
        self.crtime = epoch_millis_to_system_time(remote.created_at);
        self.ctime = epoch_millis_to_system_time(remote.updated_at);
        self.mtime = self.ctime;
        if remote.is_folder() && self.remote.is_none() {
            // First sight of a remote folder: its children are unknown
            // until a listing completes.
            self.children_populated = false;
        }
        self.remote = Some(remote);
    }

    /// Returns true if the remote service knows this node as a folder.
    pub fn is_remote_folder(&self) -> bool {
        self.remote.as_ref().is_some_and(|r| r.is_folder())
    }

    /// Remote identifier, if the service has one for this node.
    pub fn remote_id(&self) -> Option<&str> {
        self.remote.as_ref().map(|r| r.id.as_str())
    }

    /// Converts this node to a FUSE `FileAttr` structure.
    pub fn to_file_attr(&self) -> FileAttr {
        FileAttr {
            ino: self.ino,
            size: self.size,
            blocks: self.size.div_ceil(512),
            atime: self.atime,
            mtime: self.mtime,
            ctime: self.ctime,
            crtime: self.crtime,
            kind: self.kind,
            perm: self.perm,
            nlink: 1,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: 4096,
            flags: 0,
        }
    }
}

fn epoch_millis_to_system_time(millis: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(millis.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote_file(size: u64) -> RemoteFile {
        RemoteFile {
            id: "file-1".to_string(),
            name: "a.txt".to_string(),
            file_type: "text/plain".to_string(),
            size,
            created_at: 1_580_000_000_000,
            updated_at: 1_580_000_123_456,
            owner_id: "user-1".to_string(),
            parent: String::new(),
        }
    }

    #[test]
    fn new_node_has_zero_size_and_current_timestamps() {
        let node = Node::new(
            7,
            "a.txt".to_string(),
            Some("/".to_string()),
            FileType::RegularFile,
            0o644,
            1000,
            1000,
        );
        assert_eq!(node.size, 0);
        assert_eq!(node.ino, 7);
        assert!(node.content.is_none());
        assert!(node.children_populated);
    }

    #[test]
    fn apply_remote_overwrites_size_and_change_times() {
        let mut node = Node::new(
            1,
            "a.txt".to_string(),
            None,
            FileType::RegularFile,
            0o644,
            0,
            0,
        );
        let atime_before = node.atime;
        node.apply_remote(remote_file(10));

        assert_eq!(node.size, 10);
        assert_eq!(
            node.crtime,
            UNIX_EPOCH + Duration::from_millis(1_580_000_000_000)
        );
        assert_eq!(
            node.mtime,
            UNIX_EPOCH + Duration::from_millis(1_580_000_123_456)
        );
        assert_eq!(node.ctime, node.mtime);
        assert_eq!(node.atime, atime_before);
        assert_eq!(node.remote_id(), Some("file-1"));
    }

    #[test]
    fn remote_folder_starts_unpopulated() {
        let mut node = Node::new(
            2,
            "docs".to_string(),
            Some("/".to_string()),
            FileType::Directory,
            0o755,
            0,
            0,
        );
        let mut remote = remote_file(0);
        remote.file_type = vdrive_core::domain::FOLDER_CONTENT_TYPE.to_string();
        node.apply_remote(remote);

        assert!(node.is_remote_folder());
        assert!(!node.children_populated);
    }

    #[test]
    fn file_attr_reflects_node_fields() {
        let mut node = Node::new(
            3,
            "a.txt".to_string(),
            None,
            FileType::RegularFile,
            0o644,
            1000,
            100,
        );
        node.apply_remote(remote_file(1024));

        let attr = node.to_file_attr();
        assert_eq!(attr.ino, 3);
        assert_eq!(attr.size, 1024);
        assert_eq!(attr.blocks, 2);
        assert_eq!(attr.kind, FileType::RegularFile);
        assert_eq!(attr.perm, 0o644);
        assert_eq!(attr.uid, 1000);
        assert_eq!(attr.gid, 100);
    }
}
