//! Lock files for inter-process mutual exclusion.
//!
//! Cooperating processes agree that whoever owns the file at an agreed path
//! holds the lock. The protocol needs nothing from the processes beyond the
//! filesystem they share:
//!
//! - **Claim**: create the file with exclusive-create semantics; exactly one
//!   contender can succeed. Native advisory locks are layered on top for
//!   filesystems where exclusive create is weaker than advertised.
//! - **Identity**: the file records the holder's process id, application
//!   name, and host name as three lines of plain text.
//! - **Release**: close the descriptor and delete the file.
//!
//! # Stale Locks
//!
//! A holder that crashes cannot delete its file, so competitors are allowed
//! to judge a claim abandoned: the recorded process no longer exists, the
//! process id has been recycled by a different executable, or the file has
//! outlived a configurable age. [`LockFile::lock`] performs this recovery
//! automatically while it waits; [`LockFile::try_lock`] never does.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use holdfast::LockFile;
//!
//! # fn main() -> holdfast::Result<()> {
//! let mut lock = LockFile::new("/tmp/myapp.lock");
//! lock.lock(Some(Duration::from_secs(5)))?;
//! // ... the critical section ...
//! lock.unlock();
//! # Ok(())
//! # }
//! ```

mod handle;
mod info;
mod stale;


// Re-export public API
pub use handle::{DEFAULT_STALE_TIMEOUT, LockFile};
pub use info::LockInfo;
