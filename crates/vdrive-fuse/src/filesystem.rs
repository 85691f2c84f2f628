//! FUSE filesystem implementation.
//!
//! `DriveFilesystem` implements the `fuser::Filesystem` trait by
//! translating the kernel's inode-addressed callbacks into path
//! operations on [`DriveVfs`]. Structural calls the drive cannot express
//! (permissions, ownership, links, xattrs, deletion) are accepted and
//! ignored.

use std::{ffi::OsStr, path::Path, sync::Arc, time::Duration};

use fuser::{
    FileAttr, Filesystem, KernelConfig, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory,
    ReplyEmpty, ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, ReplyXattr, Request, TimeOrNow,
};
use libc::c_int;
use tracing::debug;

use crate::{error::VfsError, vfs::DriveVfs};

/// TTL for FUSE attribute caching (1 second).
///
/// Short enough that remote metadata refreshed by an upload shows up
/// promptly, long enough to absorb repeated stats of the same entry.
const TTL: Duration = Duration::from_secs(1);

/// Filesystem geometry reported by statfs.
///
/// The drive service exposes no real capacity, so the mount advertises a
/// fixed, generously sized volume with byte-granular blocks.
const STATFS_BLOCK_SIZE: u32 = 1;
const STATFS_TOTAL_BLOCKS: u64 = 500_000_000_000;
const STATFS_FREE_BLOCKS: u64 = 219_430_400_000;

/// Maximum filename length reported to the kernel.
const NAME_MAX: u32 = 255;

/// FUSE adapter over [`DriveVfs`].
pub struct DriveFilesystem {
    vfs: Arc<DriveVfs>,
}

impl DriveFilesystem {
    pub fn new(vfs: Arc<DriveVfs>) -> Self {
        Self { vfs }
    }

    /// Resolves an inode to its path, or replies `ENOENT` semantics via
    /// the returned error code.
    fn path_of(&self, ino: u64) -> Result<String, c_int> {
        self.vfs.path_of(ino).ok_or(libc::ENOENT)
    }

    /// Builds the child path for a parent inode and entry name.
    fn child_path(&self, parent: u64, name: &OsStr) -> Result<String, c_int> {
        let name = name.to_str().ok_or(libc::ENOENT)?;
        if name.len() > NAME_MAX as usize {
            return Err(libc::ENAMETOOLONG);
        }
        let parent = self.path_of(parent)?;
        Ok(crate::tree::join_path(&parent, name))
    }
}

fn errno(err: VfsError) -> c_int {
    err.into()
}

impl Filesystem for DriveFilesystem {
    /// Initialize filesystem: create the root node and populate the
    /// tree's top level from one remote listing.
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), c_int> {
        tracing::info!("Initializing drive filesystem");
        self.vfs.init();
        Ok(())
    }

    fn destroy(&mut self) {
        tracing::info!("Drive filesystem destroyed");
    }

    /// Look up a directory entry by name. Routed through the attribute
    /// path so component resolution triggers lazy directory population.
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let path = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        debug!(%path, "lookup");

        match self.vfs.getattr(&path) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(err) => reply.error(errno(err)),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        debug!(ino, %path, "getattr");

        match self.vfs.getattr(&path) {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(err) => reply.error(errno(err)),
        }
    }

    /// Set file attributes. Only truncation has an effect; mode,
    /// ownership and timestamp changes are accepted and ignored.
    #[allow(clippy::too_many_arguments)]
    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<std::time::SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<std::time::SystemTime>,
        _chgtime: Option<std::time::SystemTime>,
        _bkuptime: Option<std::time::SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        debug!(ino, %path, ?size, "setattr");

        if let Some(size) = size {
            if let Err(err) = self.vfs.truncate(&path, size) {
                return reply.error(errno(err));
            }
        }

        match self.vfs.getattr(&path) {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(err) => reply.error(errno(err)),
        }
    }

    fn mknod(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        _rdev: u32,
        reply: ReplyEntry,
    ) {
        let path = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        debug!(%path, mode, "mknod");

        match self.vfs.mknod(&path, (mode & 0o777) as u16) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(err) => reply.error(errno(err)),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let path = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        debug!(%path, mode, "mkdir");

        match self.vfs.mkdir(&path, (mode & 0o777) as u16) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(err) => reply.error(errno(err)),
        }
    }

    /// Create and open a file: make-node plus open in one callback, so
    /// O_CREAT round-trips without a separate mknod.
    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        let path = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        debug!(%path, mode, "create");

        match self.vfs.mknod(&path, (mode & 0o777) as u16) {
            Ok(attr) => reply.created(&TTL, &attr, 0, attr.ino, 0),
            Err(err) => reply.error(errno(err)),
        }
    }

    /// Open a file. The inode number doubles as the file handle.
    fn open(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };

        match self.vfs.open(&path) {
            Ok(fh) => reply.opened(fh, 0),
            Err(err) => reply.error(errno(err)),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        debug!(%path, offset, size, "read");

        match self.vfs.read(&path, offset, size) {
            Ok(data) => reply.data(&data),
            Err(err) => reply.error(errno(err)),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        debug!(%path, offset, len = data.len(), "write");

        match self.vfs.write(&path, data, offset) {
            Ok(written) => reply.written(written),
            Err(err) => reply.error(errno(err)),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }

    fn flush(&mut self, _req: &Request<'_>, _ino: u64, _fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        reply.ok();
    }

    fn fsync(&mut self, _req: &Request<'_>, _ino: u64, _fh: u64, _datasync: bool, reply: ReplyEmpty) {
        reply.ok();
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };

        match self.vfs.open(&path) {
            Ok(fh) => reply.opened(fh, 0),
            Err(err) => reply.error(errno(err)),
        }
    }

    /// Read directory entries. `.` and `..` come first; `offset` resumes
    /// an interrupted walk.
    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        debug!(%path, offset, "readdir");

        let entries = match self.vfs.readdir(&path) {
            Ok(entries) => entries,
            Err(err) => return reply.error(errno(err)),
        };

        for (i, entry) in entries.iter().enumerate().skip(offset.max(0) as usize) {
            // The entry's offset is the position the kernel should pass
            // to continue after it.
            if reply.add(entry.ino, (i + 1) as i64, entry.kind, OsStr::new(&entry.name)) {
                break;
            }
        }
        reply.ok();
    }

    fn releasedir(&mut self, _req: &Request<'_>, _ino: u64, _fh: u64, _flags: i32, reply: ReplyEmpty) {
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        reply.statfs(
            STATFS_TOTAL_BLOCKS,
            STATFS_FREE_BLOCKS,
            STATFS_FREE_BLOCKS,
            self.vfs.node_count() as u64,
            u64::MAX / 2,
            STATFS_BLOCK_SIZE,
            NAME_MAX,
            STATFS_BLOCK_SIZE,
        );
    }

    // ------------------------------------------------------------------
    // Accepted-and-ignored surface: the drive API has no notion of
    // deletion from a mount, links, permissions or extended attributes.
    // ------------------------------------------------------------------

    fn unlink(&mut self, _req: &Request<'_>, _parent: u64, _name: &OsStr, reply: ReplyEmpty) {
        reply.ok();
    }

    fn rmdir(&mut self, _req: &Request<'_>, _parent: u64, _name: &OsStr, reply: ReplyEmpty) {
        reply.ok();
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        _parent: u64,
        _name: &OsStr,
        _newparent: u64,
        _newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }

    /// Hard links are ignored; the reply carries the source node's
    /// attributes so the call still succeeds.
    fn link(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _newparent: u64,
        _newname: &OsStr,
        reply: ReplyEntry,
    ) {
        let attr: Option<FileAttr> = self
            .path_of(ino)
            .ok()
            .and_then(|path| self.vfs.getattr(&path).ok());
        match attr {
            Some(attr) => reply.entry(&TTL, &attr, 0),
            None => reply.error(libc::ENOENT),
        }
    }

    /// Symlinks cannot be represented remotely and the kernel requires a
    /// real entry in the reply, so creation is refused outright.
    fn symlink(
        &mut self,
        _req: &Request<'_>,
        _parent: u64,
        _link_name: &OsStr,
        _target: &Path,
        reply: ReplyEntry,
    ) {
        reply.error(libc::EPERM);
    }

    fn readlink(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyData) {
        reply.data(&[]);
    }

    fn setxattr(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _name: &OsStr,
        _value: &[u8],
        _flags: i32,
        _position: u32,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }

    fn getxattr(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _name: &OsStr,
        size: u32,
        reply: ReplyXattr,
    ) {
        if size == 0 {
            reply.size(0);
        } else {
            reply.data(&[]);
        }
    }

    fn listxattr(&mut self, _req: &Request<'_>, _ino: u64, size: u32, reply: ReplyXattr) {
        if size == 0 {
            reply.size(0);
        } else {
            reply.data(&[]);
        }
    }

    fn removexattr(&mut self, _req: &Request<'_>, _ino: u64, _name: &OsStr, reply: ReplyEmpty) {
        reply.ok();
    }

    fn access(&mut self, _req: &Request<'_>, _ino: u64, _mask: i32, reply: ReplyEmpty) {
        reply.ok();
    }
}
