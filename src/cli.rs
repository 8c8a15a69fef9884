//! CLI argument parsing for holdfast.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Holdfast: lock files between processes, with stale-lock recovery.
///
/// A lock file claims its path for exactly one process at a time. This tool
/// can report who holds a lock, hold one itself for the duration of a
/// script step, and remove locks whose holders are gone.
#[derive(Parser, Debug)]
#[command(name = "holdfast")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Available commands for holdfast.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show who holds a lock file and whether it looks stale.
    ///
    /// Reads the identity recorded in the lock file without acquiring or
    /// modifying anything.
    Status(StatusArgs),

    /// Acquire a lock, hold it for a while, then release it.
    ///
    /// Prints `held <path>` once the lock is acquired, so scripts can
    /// sequence on the acquisition, and `released <path>` afterwards.
    Hold(HoldArgs),

    /// Remove a lock file whose holder appears to be gone.
    ///
    /// Refuses to touch a lock that looks live.
    RemoveStale(RemoveStaleArgs),
}

/// Arguments for `holdfast status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Path of the lock file to inspect.
    pub path: PathBuf,

    /// Age in milliseconds beyond which a lock counts as abandoned
    /// (0 disables the age check).
    #[arg(long, default_value_t = 30_000)]
    pub stale_timeout_ms: u64,

    /// Emit machine-readable JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `holdfast hold`.
#[derive(Args, Debug)]
pub struct HoldArgs {
    /// Path of the lock file to acquire.
    pub path: PathBuf,

    /// How long to keep trying, in milliseconds. When omitted, a single
    /// attempt is made; abandoned locks are recovered either way.
    #[arg(long)]
    pub wait_ms: Option<u64>,

    /// How long to hold the lock before releasing, in milliseconds.
    #[arg(long, default_value_t = 0)]
    pub hold_ms: u64,

    /// Age in milliseconds beyond which a lock counts as abandoned
    /// (0 disables the age check).
    #[arg(long, default_value_t = 30_000)]
    pub stale_timeout_ms: u64,
}

/// Arguments for `holdfast remove-stale`.
#[derive(Args, Debug)]
pub struct RemoveStaleArgs {
    /// Path of the lock file to remove.
    pub path: PathBuf,

    /// Age in milliseconds beyond which a lock counts as abandoned
    /// (0 disables the age check).
    #[arg(long, default_value_t = 30_000)]
    pub stale_timeout_ms: u64,
}
