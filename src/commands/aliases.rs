//! # Aliases Command Implementation
//!
//! This module implements the `aliases` subcommand, which shows the upstream
//! git alias catalog as it is rendered for each repository. With
//! `--installed` it reads the aliases back from each repository's git
//! config and marks missing or outdated ones.

use anyhow::{anyhow, Result};
use clap::Args;

use lime_dev::output::{dim, heading, marker, Marker};
use lime_dev::upstream::aliases::CATALOG;
use lime_dev::upstream::UpstreamWorkflowManager;

use super::Context;

/// Show the upstream git aliases per repository
#[derive(Args, Debug)]
pub struct AliasesArgs {
    /// Only show these repositories (repeatable)
    #[arg(long = "repo", value_name = "ID")]
    pub repos: Vec<String>,

    /// Compare with the aliases installed in each repository
    #[arg(long)]
    pub installed: bool,
}

/// Execute the `aliases` command.
pub fn execute(args: AliasesArgs, ctx: &Context) -> Result<()> {
    let out = &ctx.output;
    let model = ctx.load_config()?;
    let repositories = ctx.resolve(&model, &args.repos)?;
    let manager = UpstreamWorkflowManager::new(ctx.paths.clone(), &model);

    let mut failures = 0;
    for (index, repo) in repositories.iter().enumerate() {
        if index > 0 {
            println!();
        }
        let rendered = match manager.rendered_aliases(repo) {
            Ok(rendered) => rendered,
            Err(e) => {
                println!("{}: FAILED ({})", repo.id, e);
                failures += 1;
                continue;
            }
        };
        println!("{}", heading(out, &format!("[{}]", repo.id)));

        if !args.installed {
            for ((name, command), template) in rendered.iter().zip(CATALOG) {
                println!("  {} = {}", name, command);
                println!("    {}", dim(out, template.description));
            }
            continue;
        }

        let installed = match manager.installed_aliases(repo) {
            Ok(installed) => installed,
            Err(e) => {
                println!("  {} not available: {}", marker(out, Marker::Warning), e);
                continue;
            }
        };
        for ((name, expected), (_, actual)) in rendered.iter().zip(&installed) {
            let state = match actual {
                Some(actual) if actual == expected => "installed",
                Some(_) => "outdated",
                None => "missing",
            };
            println!("  {} {}", name, dim(out, state));
        }
    }

    if failures > 0 {
        return Err(anyhow!("{} repositories have invalid alias branches", failures));
    }
    Ok(())
}
