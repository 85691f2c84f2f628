//! Error types for the FUSE filesystem.
//!
//! Defines `VfsError` and conversions to libc errno values.

use thiserror::Error;

/// Errors that can occur in the filesystem adapter.
///
/// Remote failures are deliberately absent from most operation results:
/// the adapter swallows them at the point of occurrence, logs, and falls
/// back to local state. What remains here is what must reach the kernel
/// as an errno.
#[derive(Error, Debug)]
pub enum VfsError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("is a directory: {0}")]
    IsADirectory(String),

    #[error("no space for buffer of {0} bytes")]
    NoSpace(usize),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<VfsError> for libc::c_int {
    fn from(err: VfsError) -> libc::c_int {
        match err {
            VfsError::NotFound(_) => libc::ENOENT,
            VfsError::NotADirectory(_) => libc::ENOTDIR,
            VfsError::IsADirectory(_) => libc::EISDIR,
            VfsError::NoSpace(_) => libc::ENOSPC,
            VfsError::IoError(_) => libc::EIO,
        }
    }
}

impl From<std::io::Error> for VfsError {
    fn from(err: std::io::Error) -> Self {
        VfsError::IoError(err.to_string())
    }
}

impl From<anyhow::Error> for VfsError {
    fn from(err: anyhow::Error) -> Self {
        VfsError::IoError(err.to_string())
    }
}
