//! # Mode Command Implementation
//!
//! This module implements the `mode` subcommand.
//!
//! - **Show**: prints the active mode, where it came from, and the
//!   repositories resolved under it.
//! - **Verify**: checks that every override entry of the active mode (or of
//!   every mode with `--all`) names a declared repository and resolves to a
//!   usable branch.

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};

use lime_dev::branch::BranchName;
use lime_dev::mode::Mode;
use lime_dev::output::{dim, heading, marker, Marker};
use lime_dev::resolver::OverrideResolver;

use super::Context;

/// Show or verify the active override mode
#[derive(Args, Debug)]
pub struct ModeArgs {
    #[command(subcommand)]
    pub command: ModeCommand,
}

#[derive(Subcommand, Debug)]
pub enum ModeCommand {
    /// Print the active mode and the repositories it resolves
    Show,

    /// Check the override sets for mistakes
    Verify(VerifyArgs),
}

/// Arguments for mode verification
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Verify every mode defined in the configuration, not only the active one
    #[arg(long)]
    pub all: bool,
}

/// Execute the `mode` command
pub fn execute(args: ModeArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ModeCommand::Show => execute_show(ctx),
        ModeCommand::Verify(verify_args) => execute_verify(verify_args, ctx),
    }
}

fn execute_show(ctx: &Context) -> Result<()> {
    let out = &ctx.output;
    println!("Mode: {} {}", ctx.mode, dim(out, &format!("(from {})", ctx.mode_source)));

    let model = ctx.load_config()?;
    let resolver = OverrideResolver::new(&model);
    let overrides = model.overrides_for(&ctx.mode);
    if !ctx.mode.is_default() && overrides.is_none() {
        println!(
            "{} No [{}_overrides] section; base definitions apply",
            marker(out, Marker::Warning),
            ctx.mode
        );
    }

    println!();
    println!("{}", heading(out, "Resolved repositories"));
    for repo in resolver.resolve_all(&ctx.mode) {
        let overridden = overrides.is_some_and(|set| set.contains_key(&repo.id));
        println!(
            "  {}: {} {} ({}){}",
            repo.id,
            repo.url,
            repo.branch,
            repo.remote,
            if overridden { " [override]" } else { "" }
        );
    }
    Ok(())
}

fn execute_verify(args: VerifyArgs, ctx: &Context) -> Result<()> {
    let out = &ctx.output;
    let model = ctx.load_config()?;
    let resolver = OverrideResolver::new(&model);

    let modes: Vec<Mode> = if args.all {
        model.override_modes().map(Mode::named).collect()
    } else {
        vec![ctx.mode.clone()]
    };
    if modes.is_empty() {
        println!("No override sections defined");
        return Ok(());
    }

    let mut problems = Vec::new();
    for mode in &modes {
        for id in resolver.dangling_overrides(mode) {
            problems.push(format!(
                "[{}_overrides] entry '{}' does not name a declared repository",
                mode, id
            ));
        }
        for repo in resolver.resolve_all(mode) {
            if let Err(e) = BranchName::parse(&repo.branch) {
                problems.push(format!("{} mode: {}: {}", mode, repo.id, e));
            }
        }
    }

    if problems.is_empty() {
        let names: Vec<&str> = modes.iter().map(Mode::name).collect();
        println!(
            "{} Mode{} {} verified",
            marker(out, Marker::Ok),
            if names.len() == 1 { "" } else { "s" },
            names.join(", ")
        );
        return Ok(());
    }

    for problem in &problems {
        println!("{} {}", marker(out, Marker::Failed), problem);
    }
    Err(anyhow!("Mode verification found {} problem(s)", problems.len()))
}
