//! Command implementations for the holdfast CLI.
//!
//! Each handler returns the exit code for the process; unexpected I/O
//! failures bubble up as anyhow errors and exit as `USER_ERROR`.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use holdfast::{LockError, LockFile};
use serde_json::json;

use crate::cli::{Command, HoldArgs, RemoveStaleArgs, StatusArgs};
use crate::exit_codes;

/// Dispatch a parsed command to its handler.
pub fn dispatch(command: Command) -> anyhow::Result<i32> {
    match command {
        Command::Status(args) => cmd_status(args),
        Command::Hold(args) => cmd_hold(args),
        Command::RemoveStale(args) => cmd_remove_stale(args),
    }
}

/// Build a lock handle with the stale timeout from the command line.
fn configured_lock(path: PathBuf, stale_timeout_ms: u64) -> LockFile {
    let mut lock = LockFile::new(path);
    lock.set_stale_timeout(Duration::from_millis(stale_timeout_ms));
    lock
}

/// Show the recorded holder of a lock file and whether it looks stale.
fn cmd_status(args: StatusArgs) -> anyhow::Result<i32> {
    let lock = configured_lock(args.path, args.stale_timeout_ms);

    let exists = lock.path().exists();
    let info = lock.lock_info();
    let stale = exists && lock.is_apparently_stale();
    let age = file_age(lock.path());

    // Scripts can branch on the exit code alone: 0 free, LOCK_HELD taken
    let code = if exists {
        exit_codes::LOCK_HELD
    } else {
        exit_codes::SUCCESS
    };

    if args.json {
        let payload = json!({
            "path": lock.path().display().to_string(),
            "held": exists,
            "apparently_stale": stale,
            "age_ms": age.map(|a| a.num_milliseconds()),
            "info": info,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(code);
    }

    if !exists {
        println!("not locked: {}", lock.path().display());
        return Ok(code);
    }

    println!("locked: {}", lock.path().display());
    match info {
        Some(info) => {
            println!(
                "  holder: pid {} ({}) on '{}'",
                info.pid, info.application_name, info.host_name
            );
        }
        None => println!("  holder: no readable identity"),
    }
    println!(
        "  age: {}",
        age.map(age_string).unwrap_or_else(|| "unknown".to_string())
    );
    println!("  stale: {}", if stale { "yes" } else { "no" });

    Ok(code)
}

/// Acquire a lock, hold it for `--hold-ms`, then release it.
fn cmd_hold(args: HoldArgs) -> anyhow::Result<i32> {
    let mut lock = configured_lock(args.path, args.stale_timeout_ms);

    // Without --wait-ms a single attempt is made; a zero timeout still
    // recovers abandoned locks.
    let timeout = Duration::from_millis(args.wait_ms.unwrap_or(0));
    match lock.lock(Some(timeout)) {
        Ok(()) => {}
        Err(err @ LockError::LockFailed { .. }) => {
            eprintln!("{err}");
            if let Some(info) = lock.lock_info() {
                eprintln!(
                    "  holder: pid {} ({}) on '{}'",
                    info.pid, info.application_name, info.host_name
                );
            }
            return Ok(exit_codes::LOCK_HELD);
        }
        Err(err) => return Err(err.into()),
    }

    // The marker line is what callers sequence on
    println!("held {}", lock.path().display());
    io::stdout().flush().context("flush stdout")?;

    if args.hold_ms > 0 {
        thread::sleep(Duration::from_millis(args.hold_ms));
    }

    lock.unlock();
    println!("released {}", lock.path().display());
    Ok(exit_codes::SUCCESS)
}

/// Remove a lock file if (and only if) its holder appears to be gone.
fn cmd_remove_stale(args: RemoveStaleArgs) -> anyhow::Result<i32> {
    let lock = configured_lock(args.path, args.stale_timeout_ms);

    if !lock.path().exists() {
        println!("not locked: {}", lock.path().display());
        return Ok(exit_codes::SUCCESS);
    }

    if !lock.is_apparently_stale() {
        println!("lock looks live, leaving it: {}", lock.path().display());
        return Ok(exit_codes::LOCK_HELD);
    }

    if lock.remove_stale_lock() {
        println!("removed stale lock: {}", lock.path().display());
        Ok(exit_codes::SUCCESS)
    } else {
        // Lost the removal race, or the holder's native locks are active
        println!("could not remove: {}", lock.path().display());
        Ok(exit_codes::LOCK_HELD)
    }
}

/// Age of a file since its last modification.
fn file_age(path: &Path) -> Option<chrono::Duration> {
    let modified = std::fs::metadata(path).and_then(|meta| meta.modified()).ok()?;
    let modified: DateTime<Utc> = modified.into();
    Some(Utc::now().signed_duration_since(modified))
}

/// Format an age as a short human-readable string.
fn age_string(age: chrono::Duration) -> String {
    let seconds = age.num_seconds();
    let minutes = age.num_minutes();
    let hours = age.num_hours();
    let days = age.num_days();

    if days > 0 {
        format!("{}d {}h", days, hours % 24)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::process::Command as StdCommand;
    use tempfile::TempDir;

    fn hold_args(path: PathBuf) -> HoldArgs {
        HoldArgs {
            path,
            wait_ms: None,
            hold_ms: 0,
            stale_timeout_ms: 30_000,
        }
    }

    /// Spawn and reap a short-lived child, yielding a dead process id.
    fn reaped_child_pid() -> u32 {
        let mut child = StdCommand::new("true").spawn().expect("spawn true");
        let pid = child.id();
        child.wait().expect("wait for child");
        pid
    }

    #[test]
    fn test_hold_and_release_cycle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cycle.lock");

        let code = cmd_hold(hold_args(path.clone())).unwrap();
        assert_eq!(code, exit_codes::SUCCESS);
        assert!(!path.exists());
    }

    #[test]
    fn test_hold_reports_contended_lock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("contended.lock");

        let mut holder = LockFile::new(&path);
        holder.try_lock().unwrap();

        let code = cmd_hold(hold_args(path.clone())).unwrap();
        assert_eq!(code, exit_codes::LOCK_HELD);
        assert!(holder.is_locked());
    }

    #[test]
    fn test_remove_stale_declines_live_lock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("live.lock");

        let mut holder = LockFile::new(&path);
        holder.try_lock().unwrap();

        let args = RemoveStaleArgs {
            path: path.clone(),
            stale_timeout_ms: 30_000,
        };
        let code = cmd_remove_stale(args).unwrap();
        assert_eq!(code, exit_codes::LOCK_HELD);
        assert!(path.exists());
    }

    #[test]
    fn test_remove_stale_clears_dead_holder() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dead.lock");
        fs::write(&path, format!("{}\n/bin/true\n\n", reaped_child_pid())).unwrap();

        let args = RemoveStaleArgs {
            path: path.clone(),
            stale_timeout_ms: 0,
        };
        let code = cmd_remove_stale(args).unwrap();
        assert_eq!(code, exit_codes::SUCCESS);
        assert!(!path.exists());
    }

    #[test]
    fn test_status_of_missing_lock() {
        let dir = TempDir::new().unwrap();
        let args = StatusArgs {
            path: dir.path().join("absent.lock"),
            stale_timeout_ms: 30_000,
            json: false,
        };
        assert_eq!(cmd_status(args).unwrap(), exit_codes::SUCCESS);
    }

    #[test]
    fn test_status_json_leaves_lock_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("held.lock");

        let mut holder = LockFile::new(&path);
        holder.try_lock().unwrap();

        let args = StatusArgs {
            path: path.clone(),
            stale_timeout_ms: 30_000,
            json: true,
        };
        assert_eq!(cmd_status(args).unwrap(), exit_codes::LOCK_HELD);
        assert!(path.exists());
        assert!(holder.is_locked());
    }

    #[test]
    fn test_age_string_granularity() {
        assert_eq!(age_string(chrono::Duration::seconds(5)), "5s");
        assert_eq!(age_string(chrono::Duration::seconds(65)), "1m 5s");
        assert_eq!(age_string(chrono::Duration::minutes(150)), "2h 30m");
        assert_eq!(age_string(chrono::Duration::hours(53)), "2d 5h");
    }
}
