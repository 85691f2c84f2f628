//! vdrive FUSE - remote drive mounted as a filesystem
//!
//! Presents the drive API as a hierarchical filesystem:
//! - Remote metadata cached in an in-memory path tree
//! - Lazy directory population on first attribute query
//! - Full-object content caching on first read
//! - Uploads reconciled from OS-shaped writes: small files as one-shot
//!   multipart uploads, large files streamed through a resumable session
//!
//! # Architecture
//!
//! - [`DriveVfs`] is the path-based orchestrator holding the tree, the
//!   read cache and the upload pipeline
//! - [`DriveFilesystem`] adapts it to the `fuser::Filesystem` callbacks
//! - The remote service is reached only through the `RemoteStore` port,
//!   injected at construction
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use vdrive_fuse::mount;
//!
//! let session = mount(&config.fuse, config.upload.clone(), store, rt.handle().clone())?;
//! // Filesystem is mounted until the session is dropped
//! ```

pub mod buffer;
pub mod error;
pub mod filesystem;
pub mod node;
pub mod tree;
pub mod upload;
pub mod vfs;

use std::sync::Arc;

pub use buffer::{ContentBuffer, ALLOC_UNIT};
pub use error::VfsError;
pub use filesystem::DriveFilesystem;
pub use fuser::BackgroundSession;
use fuser::MountOption;
pub use tree::PathTree;
pub use vfs::DriveVfs;

use tokio::runtime::Handle;
use tracing::{debug, info};
use vdrive_core::{
    config::{FuseConfig, UploadConfig},
    ports::RemoteStore,
};

/// Mounts the drive filesystem at the configured mount point.
///
/// The filesystem runs in a background thread; the returned session
/// keeps it mounted and dropping the session unmounts it.
///
/// # Arguments
///
/// * `config` - Mount settings (mount point, auto-unmount)
/// * `upload` - Upload strategy settings
/// * `store` - Remote store the filesystem is a view of
/// * `rt_handle` - Handle to a tokio runtime for network work
///
/// # Errors
///
/// Returns [`VfsError::NotFound`] if the mount point doesn't exist,
/// [`VfsError::NotADirectory`] if it isn't a directory, and
/// [`VfsError::IoError`] if the FUSE mount itself fails.
pub fn mount(
    config: &FuseConfig,
    upload: UploadConfig,
    store: Arc<dyn RemoteStore>,
    rt_handle: Handle,
) -> Result<BackgroundSession, VfsError> {
    let mount_point = std::path::Path::new(&config.mount_point);

    info!(mount_point = %mount_point.display(), "Preparing to mount drive filesystem");

    if !mount_point.exists() {
        return Err(VfsError::NotFound(format!(
            "Mount point does not exist: {}",
            mount_point.display()
        )));
    }
    if !mount_point.is_dir() {
        return Err(VfsError::NotADirectory(format!(
            "Mount point is not a directory: {}",
            mount_point.display()
        )));
    }

    let vfs = Arc::new(DriveVfs::new(store, upload, rt_handle));
    let filesystem = DriveFilesystem::new(vfs);

    let mut mount_options = vec![
        MountOption::FSName("vdrive".to_string()),
        MountOption::Subtype("drive".to_string()),
        MountOption::DefaultPermissions,
        MountOption::NoAtime,
        MountOption::Async,
    ];
    if config.auto_unmount {
        mount_options.push(MountOption::AutoUnmount);
    }

    debug!(options = ?mount_options, "Mounting FUSE filesystem");

    let session = fuser::spawn_mount2(filesystem, mount_point, &mount_options).map_err(|e| {
        VfsError::IoError(format!(
            "Failed to mount FUSE filesystem at {}: {}",
            mount_point.display(),
            e
        ))
    })?;

    info!(mount_point = %mount_point.display(), "Drive filesystem mounted");

    Ok(session)
}

/// Unmounts the drive filesystem by dropping its background session.
///
/// Dropping triggers the filesystem's `destroy()` callback and the
/// kernel unmount; this function exists to make the intent explicit.
pub fn unmount(session: BackgroundSession) {
    info!("Unmounting drive filesystem");
    drop(session);
    info!("Drive filesystem unmounted");
}
