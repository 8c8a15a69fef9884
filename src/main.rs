//! Holdfast: inspect, hold, and recover lock files from the command line.
//!
//! This is the main entry point for the `holdfast` CLI. It parses arguments,
//! initializes logging, dispatches to the appropriate command handler, and
//! converts failures into exit codes.

mod cli;
mod commands;
mod exit_codes;

use std::process::ExitCode;

use cli::Cli;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse_args();

    match commands::dispatch(cli.command) {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_codes::USER_ERROR as u8)
        }
    }
}
