//! # lime-dev CLI
//!
//! This is the binary entry point for the `lime-dev` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Initializing logging from the global `--log-level` flag.
//! - Executing the appropriate command and turning failures into a non-zero
//!   exit status.
//!
//! The core application logic is defined in the `lib.rs` library crate, so
//! the binary stays a thin wrapper around the reusable library.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
