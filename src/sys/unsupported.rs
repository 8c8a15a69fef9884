//! Fallback for targets without a native locking layer.
//!
//! Exclusive file creation remains the only cross-process guarantee here.
//! Liveness cannot be probed, so holders are presumed alive and only the
//! lock-file age can ever mark a claim stale.

use std::fs::File;
use std::io;

use super::Liveness;

pub(crate) fn set_native_locks(_file: &File) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "native file locks are not supported on this platform",
    ))
}

pub(crate) fn process_liveness(_pid: u32) -> Liveness {
    // Never judge a holder dead on evidence this platform cannot gather.
    Liveness::Alive
}

pub(crate) fn executable_name(_pid: u32) -> Option<String> {
    None
}
