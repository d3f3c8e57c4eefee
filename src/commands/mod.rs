//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `lime-dev` command-line tool. Each subcommand is defined in its own file.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and the shared
//!   [`Context`] built from the global flags.
//!
//! Commands that act on several repositories print one line per repository
//! (`<id>: ok (...)` or `<id>: FAILED (...)`) and return an error when any
//! repository failed, which makes the process exit with status 1.

pub mod aliases;
pub mod completions;
pub mod env;
pub mod mode;
pub mod setup;
pub mod status;
pub mod upstream;
pub mod validate;

use std::fmt;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::ValueEnum;
use serde::Serialize;

use lime_dev::config::{self, ConfigModel};
use lime_dev::mode::Mode;
use lime_dev::output::{marker, repository_lines, Marker, OutputConfig};
use lime_dev::path::WorkspacePaths;
use lime_dev::report::{Outcome, RunReport};
use lime_dev::resolver::{OverrideResolver, ResolvedRepository};

/// Where the active mode came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSource {
    Flag,
    Environment,
    Default,
}

impl fmt::Display for ModeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModeSource::Flag => "--mode flag",
            ModeSource::Environment => "LIME_RELEASE_MODE",
            ModeSource::Default => "default",
        })
    }
}

/// Settings shared by every command, derived from the global flags.
#[derive(Debug, Clone)]
pub struct Context {
    pub paths: WorkspacePaths,
    pub config_path: PathBuf,
    pub mode: Mode,
    pub mode_source: ModeSource,
    pub output: OutputConfig,
}

impl Context {
    /// Load the configuration. Any parse error is fatal for the command.
    pub fn load_config(&self) -> Result<ConfigModel> {
        config::from_file(&self.config_path).map_err(|e| {
            anyhow!(
                "Failed to load config from {}: {}",
                self.config_path.display(),
                e
            )
        })
    }

    /// Resolve the selected repositories, or all of them when none are given.
    pub fn resolve(&self, model: &ConfigModel, selected: &[String]) -> Result<Vec<ResolvedRepository>> {
        let resolver = OverrideResolver::new(model);
        if selected.is_empty() {
            Ok(resolver.resolve_all(&self.mode))
        } else {
            Ok(resolver.resolve_selected(selected, &self.mode)?)
        }
    }
}

/// Output format of per-repository reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print a report as text lines or JSON.
pub fn print_report<T: Outcome + Serialize>(
    report: &RunReport<T>,
    format: OutputFormat,
    describe: impl Fn(&T) -> String,
) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report.to_json())?),
        OutputFormat::Text => {
            for line in repository_lines(report, describe) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

/// Turn report failures into the command's error.
pub fn finish<T: Outcome>(report: &RunReport<T>, out: &OutputConfig, format: OutputFormat) -> Result<()> {
    if !report.has_failures() {
        return Ok(());
    }
    if format == OutputFormat::Text {
        println!();
        print!(
            "{} {}",
            marker(out, Marker::Failed),
            report.failure_summary()
        );
    }
    let failed = report.entries().iter().filter(|e| !e.is_ok()).count();
    Err(anyhow!(
        "{} of {} repositories failed",
        failed,
        report.entries().len()
    ))
}
