//! Error types for holdfast.
//!
//! Uses thiserror for derive macros and keeps the io::Error that caused a
//! failure attached as the error source wherever one exists.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Why a lock operation failed.
///
/// Only [`LockError::LockFailed`] is worth retrying; the other variants
/// report conditions that waiting cannot fix.
#[derive(Error, Debug)]
pub enum LockError {
    /// The path is already claimed and the claim was not judged stale.
    #[error("lock file '{}' is held by another process", .path.display())]
    LockFailed { path: PathBuf },

    /// The filesystem refused to create or write the lock file.
    #[error("insufficient permission to write lock file '{}'", .path.display())]
    Permission {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Any other failure, such as a full disk or an interrupted write.
    #[error("lock file '{}' could not be written", .path.display())]
    Unknown {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LockError {
    /// Returns true when waiting and trying again may succeed.
    ///
    /// [`LockFile::lock`](crate::LockFile::lock) keeps retrying exactly the
    /// errors this reports as retryable and returns all others immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LockError::LockFailed { .. })
    }

    /// The lock file path the failed operation was aimed at.
    pub fn path(&self) -> &PathBuf {
        match self {
            LockError::LockFailed { path } => path,
            LockError::Permission { path, .. } => path,
            LockError::Unknown { path, .. } => path,
        }
    }
}

/// Result type alias for holdfast operations.
pub type Result<T> = std::result::Result<T, LockError>;
