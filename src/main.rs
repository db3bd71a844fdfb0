//! Application entry point.
//!
//! Parses command-line arguments and delegates execution to [`runner::run`].

use clap::Parser;
use fwgen::{cli::Cli, runner};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let max_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::ERROR
    };
    fmt()
        .with_max_level(max_level)
        .with_writer(std::io::stderr)
        .init();
    match runner::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // The failure contract is a single line on stderr and exit code 1.
            eprintln!("ERROR: {err:#}");
            ExitCode::FAILURE
        }
    }
}
