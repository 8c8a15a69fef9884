//! holdfast - advisory lock files between processes.
//!
//! A [`LockFile`] claims a filesystem path on behalf of the current process
//! and releases it on [`unlock`](LockFile::unlock) or drop. Competing
//! processes (and threads) coordinate purely through the shared filesystem,
//! including detection and recovery of locks whose holders died without
//! cleaning up. See the [`lockfile`] module for the protocol details.

pub mod error;
pub mod lockfile;
mod sys;

pub use error::{LockError, Result};
pub use lockfile::{DEFAULT_STALE_TIMEOUT, LockFile, LockInfo};
