//! # Setup Command Implementation
//!
//! This module implements the `setup` subcommand, which brings the whole
//! workspace in line with the configuration.
//!
//! ## Functionality
//!
//! - **Synchronization**: clones missing repositories and fast-forwards the
//!   present ones to their resolved branch and remote. Diverged branches and
//!   local commits are never touched.
//! - **Upstream workflow**: afterwards provisions the `upstream` remote,
//!   aliases, exclusion rules and pre-commit hook (skip with
//!   `--skip-upstream`).
//!
//! A failing repository never stops the others. The command exits with an
//! error when any repository failed in either phase.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use serde_json::json;

use lime_dev::cancel::CancellationToken;
use lime_dev::output::{heading, marker, Marker};
use lime_dev::synchronizer::{RepositorySynchronizer, SyncOptions, SyncOutcome};
use lime_dev::upstream::{UpstreamOptions, UpstreamOutcome, UpstreamWorkflowManager};

use super::{finish, print_report, Context, OutputFormat};

/// Clone or update every repository, then provision the upstream workflow
#[derive(Args, Debug)]
pub struct SetupArgs {
    /// Only set up these repositories (repeatable)
    #[arg(long = "repo", value_name = "ID")]
    pub repos: Vec<String>,

    /// Skip the upstream workflow provisioning
    #[arg(long)]
    pub skip_upstream: bool,

    /// Replace a foreign pre-commit hook (it is backed up first)
    #[arg(long)]
    pub force_hook: bool,

    /// Process repositories one at a time instead of in parallel
    #[arg(long)]
    pub sequential: bool,

    /// Abort clones and fetches still running after this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Execute the `setup` command.
pub fn execute(args: SetupArgs, ctx: &Context) -> Result<()> {
    let out = &ctx.output;
    let model = ctx.load_config()?;
    let repositories = ctx.resolve(&model, &args.repos)?;

    let cancel = match args.timeout {
        Some(secs) => CancellationToken::with_timeout(Duration::from_secs(secs)),
        None => CancellationToken::new(),
    };

    let text = args.format == OutputFormat::Text;
    if text {
        println!(
            "{} {} ({} mode, {} repositories)",
            marker(out, Marker::Sync),
            heading(out, "Synchronizing repositories"),
            ctx.mode,
            repositories.len()
        );
    }

    let synchronizer = RepositorySynchronizer::new(ctx.paths.clone());
    let sync_report = synchronizer.synchronize_all(
        &repositories,
        &SyncOptions {
            sequential: args.sequential,
            cancel: cancel.clone(),
        },
    );
    if text {
        print_report(&sync_report, args.format, SyncOutcome::describe)?;
    }

    let upstream_report = if args.skip_upstream {
        None
    } else {
        if text {
            println!();
            println!(
                "{} {}",
                marker(out, Marker::Upstream),
                heading(out, "Provisioning upstream workflow")
            );
        }
        let manager = UpstreamWorkflowManager::new(ctx.paths.clone(), &model);
        let report = manager.provision_all(
            &repositories,
            &UpstreamOptions {
                force_hook: args.force_hook,
                no_fetch: false,
                cancel,
            },
        );
        if text {
            print_report(&report, args.format, UpstreamOutcome::describe)?;
        }
        Some(report)
    };

    if !text {
        let value = json!({
            "mode": ctx.mode.name(),
            "sync": sync_report.to_json(),
            "upstream": upstream_report.as_ref().map(|r| r.to_json()),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    }

    let sync_result = finish(&sync_report, out, args.format);
    let upstream_result = match &upstream_report {
        Some(report) => finish(report, out, args.format),
        None => Ok(()),
    };
    sync_result.and(upstream_result)?;

    if text {
        println!();
        println!("{} Workspace is set up", marker(out, Marker::Ok));
    }
    Ok(())
}

