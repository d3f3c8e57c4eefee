//! # Status Command Implementation
//!
//! This module implements the `status` subcommand: a read-only report of
//! every repository's on-disk state compared with its resolved definition.
//! Nothing is fetched, so ahead/behind information reflects the last fetch.
//!
//! Absent repositories are reported but do not fail the command. A
//! directory that is not a git repository, or a remote that points at a
//! different URL than configured, does.

use anyhow::Result;
use clap::Args;

use lime_dev::output::{heading, marker, Marker};
use lime_dev::synchronizer::{RepositoryCheck, RepositorySynchronizer};

use super::{finish, print_report, Context, OutputFormat};

/// Show per-repository sync status without changing anything
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Only report these repositories (repeatable)
    #[arg(long = "repo", value_name = "ID")]
    pub repos: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Execute the `status` command.
pub fn execute(args: StatusArgs, ctx: &Context) -> Result<()> {
    let out = &ctx.output;
    let model = ctx.load_config()?;
    let repositories = ctx.resolve(&model, &args.repos)?;

    if args.format == OutputFormat::Text {
        println!(
            "{} {} ({} mode, {})",
            marker(out, Marker::Status),
            heading(out, "Repository status"),
            ctx.mode,
            ctx.paths.repos_dir().display()
        );
    }

    let synchronizer = RepositorySynchronizer::new(ctx.paths.clone());
    let report = synchronizer.check_all(&repositories);
    print_report(&report, args.format, RepositoryCheck::describe)?;
    finish(&report, out, args.format)
}
