//! Platform layer for native locks and process queries.
//!
//! Everything the lock protocol needs from the operating system lives behind
//! this seam: byte-range and descriptor locks on an open file, a
//! non-destructive liveness probe for a process id, and a best-effort lookup
//! of a process's executable name. One implementation is selected per target
//! at build time.
//!
//! # Cross-Platform Behavior
//!
//! - **Unix**: `flock()` plus, where it is independent of `flock()`, a
//!   whole-file `fcntl()` write lock; liveness via `kill(pid, 0)`;
//!   executable names from `/proc/<pid>/exe` (Linux), `proc_pidpath`
//!   (macOS), or the `KERN_PROC_PATHNAME` sysctl (FreeBSD).
//! - **Other targets**: native locks are reported as unsupported and every
//!   process is presumed alive, so exclusive file creation and the lock-file
//!   age are the only guarantees left. Acquisition still works; staleness
//!   detection is just more conservative.

use std::fs::File;
use std::io;

#[cfg(unix)]
mod unix;
#[cfg(unix)]
use unix as imp;

#[cfg(not(unix))]
mod unsupported;
#[cfg(not(unix))]
use unsupported as imp;

/// Outcome of a liveness probe against a process id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Liveness {
    /// A process with this id exists.
    Alive,
    /// No process currently has this id.
    NotFound,
    /// A process exists but we lack permission to signal it. Still alive.
    PermissionDenied,
}

/// Apply the platform's native exclusive locks to an open lock file.
///
/// These locks back up the exclusive-create claim: they keep byte-range and
/// descriptor lock holders out, and they are what `remove_stale_lock`
/// re-takes to prove a file's holder is really gone. Failure is not fatal to
/// acquisition; callers log it and carry on with the created file as the
/// sole claim.
pub(crate) fn set_native_locks(file: &File) -> io::Result<()> {
    imp::set_native_locks(file)
}

/// Probe whether the process with `pid` is alive, without signalling it.
pub(crate) fn process_liveness(pid: u32) -> Liveness {
    imp::process_liveness(pid)
}

/// Base name of the executable behind `pid`, when the platform can tell.
pub(crate) fn executable_name(pid: u32) -> Option<String> {
    imp::executable_name(pid)
}
