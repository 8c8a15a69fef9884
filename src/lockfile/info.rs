//! Holder identity stored in lock files.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Identity of the process that wrote a lock file.
///
/// Stored as three newline-terminated text lines: process id, application
/// name, host name. The format is plain text so that an operator (or a
/// foreign tool) can read a lock file with nothing but `cat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockInfo {
    /// Process ID of the lock holder.
    pub pid: u32,

    /// Path or name of the holder's executable, as the holder saw it.
    pub application_name: String,

    /// Host the holder ran on; empty when it could not be determined.
    pub host_name: String,
}

impl LockInfo {
    /// Capture the identity of the current process.
    pub fn capture() -> Self {
        Self {
            pid: std::process::id(),
            application_name: current_application_name(),
            host_name: local_host_name(),
        }
    }

    /// Encode the identity into the on-disk payload.
    pub fn encode(&self) -> Vec<u8> {
        format!(
            "{}\n{}\n{}\n",
            self.pid, self.application_name, self.host_name
        )
        .into_bytes()
    }

    /// Decode an on-disk payload.
    ///
    /// The process id line must parse; the remaining lines are optional and
    /// decode as empty strings when missing, so payloads from older or
    /// partial writers still yield a usable identity. Returns `None` for
    /// anything else (non-UTF-8 bytes, an empty file, a garbled pid).
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(bytes).ok()?;
        let mut lines = text.split('\n').map(strip_carriage_return);
        let pid = lines.next()?.trim().parse::<u32>().ok()?;
        let application_name = lines.next().unwrap_or_default();
        let host_name = lines.next().unwrap_or_default();
        Some(Self {
            pid,
            application_name,
            host_name,
        })
    }

    /// Read and decode the identity recorded in the lock file at `path`.
    pub fn read_from(path: &Path) -> Option<Self> {
        fs::read(path).ok().and_then(|bytes| Self::decode(&bytes))
    }
}

fn strip_carriage_return(line: &str) -> String {
    line.strip_suffix('\r').unwrap_or(line).to_string()
}

/// Get the executable path of the current process for the payload.
pub(crate) fn current_application_name() -> String {
    std::env::current_exe()
        .ok()
        .or_else(|| std::env::args_os().next().map(PathBuf::from))
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Get the local machine's host name; empty when unavailable.
pub(crate) fn local_host_name() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_default()
}
