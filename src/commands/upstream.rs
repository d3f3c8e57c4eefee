//! # Upstream Command Implementation
//!
//! This module implements the `upstream` subcommand, which runs only the
//! upstream workflow provisioning for repositories already present on disk:
//! the `upstream` remote, the alias catalog, exclusion rules and the
//! pre-commit hook. Repositories that are not cloned are skipped.

use std::time::Duration;

use anyhow::Result;
use clap::Args;

use lime_dev::cancel::CancellationToken;
use lime_dev::output::{heading, marker, Marker};
use lime_dev::upstream::{UpstreamOptions, UpstreamOutcome, UpstreamWorkflowManager};

use super::{finish, print_report, Context, OutputFormat};

/// Provision upstream remotes, aliases, exclusion rules and hooks
#[derive(Args, Debug)]
pub struct UpstreamArgs {
    /// Only provision these repositories (repeatable)
    #[arg(long = "repo", value_name = "ID")]
    pub repos: Vec<String>,

    /// Replace a foreign pre-commit hook (it is backed up first)
    #[arg(long)]
    pub force_hook: bool,

    /// Do not fetch the upstream remotes
    #[arg(long)]
    pub no_fetch: bool,

    /// Abort fetches still running after this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Execute the `upstream` command.
pub fn execute(args: UpstreamArgs, ctx: &Context) -> Result<()> {
    let out = &ctx.output;
    let model = ctx.load_config()?;
    let repositories = ctx.resolve(&model, &args.repos)?;

    if args.format == OutputFormat::Text {
        println!(
            "{} {}",
            marker(out, Marker::Upstream),
            heading(out, "Provisioning upstream workflow")
        );
    }

    let options = UpstreamOptions {
        force_hook: args.force_hook,
        no_fetch: args.no_fetch,
        cancel: match args.timeout {
            Some(secs) => CancellationToken::with_timeout(Duration::from_secs(secs)),
            None => CancellationToken::new(),
        },
    };
    let manager = UpstreamWorkflowManager::new(ctx.paths.clone(), &model);
    let report = manager.provision_all(&repositories, &options);

    print_report(&report, args.format, UpstreamOutcome::describe)?;
    finish(&report, out, args.format)
}
