//! The lock handle: acquisition, release, and holder queries.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

use super::info::LockInfo;
use crate::error::{LockError, Result};
use crate::sys;

/// Default age beyond which a claim whose holder cannot be proven dead is
/// considered abandoned anyway.
pub const DEFAULT_STALE_TIMEOUT: Duration = Duration::from_secs(30);

/// First pause between acquisition attempts in [`LockFile::lock`].
const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Longest pause between acquisition attempts.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// How many times one `lock` call may retry immediately after removing a
/// stale file. Beyond this it sleeps between attempts like any other retry,
/// so competitors cleaning up in lockstep cannot spin against each other.
const MAX_IMMEDIATE_STALE_RETRIES: u32 = 3;

/// An advisory lock between processes, based on the existence of a file.
///
/// Creating the lock file exclusively is the claim, the file's content names
/// the holder, and deleting the file is the release. Competitors that find
/// the file in place can judge whether its holder is still around and
/// recover the lock if not.
///
/// Dropping a handle that holds the lock releases it.
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
    file: Option<File>,
    stale_timeout: Duration,
}

impl LockFile {
    /// Create an unlocked handle for the lock file at `path`.
    ///
    /// Nothing touches the filesystem until an acquisition or query method
    /// runs.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            stale_timeout: DEFAULT_STALE_TIMEOUT,
        }
    }

    /// The lock file path this handle manages.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this handle currently holds the lock.
    ///
    /// Reports the handle's own state only; see [`LockFile::lock_info`] for
    /// the on-disk view of the current holder.
    pub fn is_locked(&self) -> bool {
        self.file.is_some()
    }

    /// Set the age beyond which an existing claim counts as abandoned even
    /// when its holder cannot be proven dead. `Duration::ZERO` disables the
    /// age fallback entirely.
    pub fn set_stale_timeout(&mut self, timeout: Duration) {
        self.stale_timeout = timeout;
    }

    /// The configured stale timeout.
    pub fn stale_timeout(&self) -> Duration {
        self.stale_timeout
    }

    /// Try to acquire the lock without blocking and without recovering
    /// stale claims.
    ///
    /// On success the lock file exists, carries this process's identity and
    /// the platform's native locks, and is flushed to disk. A handle that
    /// already holds the lock is not reentrant; a second call fails like
    /// any other contender.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The lock is now held by this handle
    /// * `Err(LockError::LockFailed)` - Another claim is in place
    /// * `Err(LockError::Permission)` - The path cannot be created at all
    /// * `Err(LockError::Unknown)` - Creation or the identity write failed
    pub fn try_lock(&mut self) -> Result<()> {
        let payload = LockInfo::capture().encode();

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }

        // Exclusive creation is the claim itself; losing the race surfaces
        // as AlreadyExists.
        let mut file = match options.open(&self.path) {
            Ok(file) => file,
            Err(e) => return Err(classify_create_error(&self.path, e)),
        };

        // The native locks back up the created file on filesystems where
        // exclusive create is unreliable, and are what competitors re-take
        // to prove this process is gone before removing a stale file.
        if let Err(e) = sys::set_native_locks(&file) {
            warn!(
                "setting native locks on '{}' failed: {}",
                self.path.display(),
                e
            );
        }

        if let Err(e) = file.write_all(&payload).and_then(|()| file.sync_all()) {
            // A half-written claim must not outlive this attempt.
            drop(file);
            if let Err(cleanup) = fs::remove_file(&self.path) {
                warn!(
                    "could not remove half-written lock file '{}': {}",
                    self.path.display(),
                    cleanup
                );
            }
            return Err(LockError::Unknown {
                path: self.path.clone(),
                source: e,
            });
        }

        debug!("acquired lock '{}'", self.path.display());
        self.file = Some(file);
        Ok(())
    }

    /// Acquire the lock, waiting up to `timeout` (or indefinitely with
    /// `None`).
    ///
    /// Only contention is retried; permission and unknown failures return
    /// immediately. Between attempts the wait grows from
    /// 100 milliseconds up to a 5 second cap, and a claim judged abandoned
    /// by [`LockFile::is_apparently_stale`] is removed and retried without
    /// sleeping, a bounded number of times per call.
    ///
    /// `Some(Duration::ZERO)` makes a single attempt that still performs
    /// stale-claim recovery, which is what distinguishes it from
    /// [`LockFile::try_lock`].
    ///
    /// # Arguments
    ///
    /// * `timeout` - Longest time to keep trying, or `None` for no limit
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The lock is now held by this handle
    /// * `Err(LockError::LockFailed)` - The deadline passed while contended
    /// * `Err(LockError::Permission)` / `Err(LockError::Unknown)` - As in
    ///   [`LockFile::try_lock`]
    pub fn lock(&mut self, timeout: Option<Duration>) -> Result<()> {
        // A deadline too distant to represent is the same as no deadline.
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut delay = INITIAL_RETRY_DELAY;
        let mut immediate_retries = MAX_IMMEDIATE_STALE_RETRIES;

        loop {
            match self.try_lock() {
                Err(e) if e.is_retryable() => {}
                outcome => return outcome,
            }

            // Contended. An abandoned claim can be reclaimed right away;
            // the retry budget only decides whether we loop back without
            // sleeping.
            if self.is_apparently_stale() && self.remove_stale_lock() && immediate_retries > 0 {
                immediate_retries -= 1;
                continue;
            }

            let sleep = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(LockError::LockFailed {
                            path: self.path.clone(),
                        });
                    }
                    delay.min(remaining)
                }
                None => delay,
            };
            thread::sleep(sleep);
            delay = (delay * 2).min(MAX_RETRY_DELAY);
        }
    }

    /// Release the lock if this handle holds it.
    ///
    /// The descriptor is closed first, which drops the native locks, then
    /// the file is removed. A failed removal is logged and otherwise
    /// ignored; competitors will recover through the stale timeout. Calling
    /// this on an unlocked handle does nothing.
    pub fn unlock(&mut self) {
        let Some(file) = self.file.take() else {
            return;
        };
        // Closing drops both native locks with the descriptor.
        drop(file);
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(
                "could not remove own lock file '{}': {}",
                self.path.display(),
                e
            );
        } else {
            debug!("released lock '{}'", self.path.display());
        }
    }

    /// The holder identity recorded in the lock file, if the file exists
    /// and decodes.
    ///
    /// Reads whatever is on disk at call time, whether or not this handle
    /// is the holder.
    pub fn lock_info(&self) -> Option<LockInfo> {
        LockInfo::read_from(&self.path)
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        self.unlock();
    }
}

fn classify_create_error(path: &Path, e: io::Error) -> LockError {
    match e.kind() {
        io::ErrorKind::AlreadyExists => LockError::LockFailed {
            path: path.to_path_buf(),
        },
        io::ErrorKind::PermissionDenied | io::ErrorKind::ReadOnlyFilesystem => {
            LockError::Permission {
                path: path.to_path_buf(),
                source: e,
            }
        }
        _ => LockError::Unknown {
            path: path.to_path_buf(),
            source: e,
        },
    }
}
