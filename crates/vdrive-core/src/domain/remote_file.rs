//! Remote file metadata
//!
//! `RemoteFile` is the port-level DTO for a single object stored in the
//! drive service. It maps one-to-one onto the JSON objects returned by the
//! listing and metadata endpoints; the filesystem adapter derives its
//! OS-visible attributes from it.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Content type the drive service assigns to folder objects.
///
/// Compared verbatim against [`RemoteFile::file_type`] to tell directories
/// apart from regular files.
pub const FOLDER_CONTENT_TYPE: &str = "application/vnd.drive.folder";

/// Metadata for one remote object (file or folder).
///
/// All fields come straight from the drive API. Timestamps are epoch
/// milliseconds, which is what the service reports; use
/// [`RemoteFile::created`] / [`RemoteFile::updated`] for typed access.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteFile {
    /// Provider-assigned object identifier
    pub id: String,
    /// Object name (file or folder name, no path)
    pub name: String,
    /// Content type; folders carry [`FOLDER_CONTENT_TYPE`]
    #[serde(rename = "type")]
    pub file_type: String,
    /// Declared size in bytes (0 for folders)
    pub size: u64,
    /// Creation timestamp in epoch milliseconds
    pub created_at: i64,
    /// Last-update timestamp in epoch milliseconds
    pub updated_at: i64,
    /// Identifier of the owning user
    pub owner_id: String,
    /// Identifier of the parent folder (empty at the drive root)
    pub parent: String,
}

impl RemoteFile {
    /// Returns true if this object is a folder.
    pub fn is_folder(&self) -> bool {
        self.file_type == FOLDER_CONTENT_TYPE
    }

    /// Creation time as a UTC datetime.
    pub fn created(&self) -> DateTime<Utc> {
        millis_to_datetime(self.created_at)
    }

    /// Last-update time as a UTC datetime.
    pub fn updated(&self) -> DateTime<Utc> {
        millis_to_datetime(self.updated_at)
    }
}

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_else(|| Utc.timestamp_millis_opt(0).unwrap())
}
