//! Staleness judgement and recovery for contended lock files.
//!
//! A holder that crashes, or a whole machine that reboots, leaves its lock
//! file behind with nobody to delete it. Competitors judge such a claim
//! abandoned from three angles: the recorded process no longer exists, the
//! process id was recycled by an unrelated program, or the file has simply
//! outlived the stale timeout. Removal then re-takes the native locks as a
//! final guard against racing a live holder.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{debug, warn};

use super::LockFile;
use super::info::local_host_name;
use crate::sys::{self, Liveness};

impl LockFile {
    /// Judge whether the claim currently on disk looks abandoned.
    ///
    /// Identity checks apply only to claims recorded on this machine (or
    /// with no recorded host): a holder process that no longer exists makes
    /// the claim stale, and a live process whose executable base name
    /// differs from the recorded application's means the id was recycled,
    /// also stale. Independently of those, a file older than the stale
    /// timeout is stale; age is the only evidence available for claims from
    /// other machines or files with no readable identity.
    ///
    /// "Apparently" is meant literally: the holder can exit right after the
    /// probe, and a writer that crashed before its identity reached the
    /// disk is indistinguishable from a garbled file.
    pub fn is_apparently_stale(&self) -> bool {
        if let Some(info) = self.lock_info()
            && (info.host_name.is_empty() || info.host_name == local_host_name())
        {
            match sys::process_liveness(info.pid) {
                Liveness::NotFound => {
                    debug!(
                        "holder pid {} of '{}' no longer exists",
                        info.pid,
                        self.path().display()
                    );
                    return true;
                }
                Liveness::Alive | Liveness::PermissionDenied => {
                    // The id is taken, but possibly by an unrelated process
                    // started after the real holder died.
                    if let Some(running) = sys::executable_name(info.pid)
                        && let Some(recorded) = recorded_base_name(&info.application_name)
                        && running != recorded
                    {
                        debug!(
                            "pid {} now runs '{}' instead of '{}'; '{}' looks recycled",
                            info.pid,
                            running,
                            recorded,
                            self.path().display()
                        );
                        return true;
                    }
                }
            }
        }
        self.exceeds_stale_timeout()
    }

    /// Whether the lock file's last modification lies further in the past
    /// than the stale timeout. A timeout of zero disables this check, as do
    /// an unreadable modification time and a timestamp in the future.
    fn exceeds_stale_timeout(&self) -> bool {
        if self.stale_timeout().is_zero() {
            return false;
        }
        let Ok(modified) = fs::metadata(self.path()).and_then(|meta| meta.modified()) else {
            return false;
        };
        let modified: DateTime<Utc> = modified.into();
        let age = Utc::now().signed_duration_since(modified);
        // Timeouts wider than i64 milliseconds saturate; no age exceeds them.
        let timeout = i64::try_from(self.stale_timeout().as_millis()).unwrap_or(i64::MAX);
        age.num_milliseconds() > timeout
    }

    /// Remove a lock file previously judged stale.
    ///
    /// The file is re-opened for writing and the native locks are re-taken
    /// before the unlink; a live holder still owns those locks, and losing
    /// to it here aborts the removal. Returns false when the file is
    /// already gone (another cleaner won) or when the native locks could
    /// not be taken. Either way the caller must go back to `try_lock`
    /// rather than assume the path is free.
    pub fn remove_stale_lock(&self) -> bool {
        let file = match OpenOptions::new().write(true).open(self.path()) {
            Ok(file) => file,
            // Already gone; someone else cleaned up first.
            Err(_) => return false,
        };
        // A platform without native locks has no lock holder to detect, so
        // Unsupported does not veto the removal.
        if let Err(e) = sys::set_native_locks(&file)
            && e.kind() != io::ErrorKind::Unsupported
        {
            debug!(
                "native locks on stale candidate '{}' are still held: {}",
                self.path().display(),
                e
            );
            return false;
        }
        let removed = fs::remove_file(self.path()).is_ok();
        if removed {
            warn!("removed stale lock file '{}'", self.path().display());
        }
        removed
    }
}

/// Base file name of the recorded application, resolving a symbolic link
/// first so a renamed launcher still matches its target. `None` when the
/// recorded name is empty, which leaves nothing to compare against.
fn recorded_base_name(application_name: &str) -> Option<String> {
    let path = Path::new(application_name);
    let resolved = match fs::read_link(path) {
        Ok(target) => target,
        Err(_) => path.to_path_buf(),
    };
    resolved
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}
