//! # Env Command Implementation
//!
//! This module implements the `env` subcommand, which prints the environment
//! projected from the configuration for the active mode. The shell format
//! is meant to be evaluated by build scripts:
//!
//! ```bash
//! eval "$(lime-dev env)"
//! ```

use anyhow::Result;
use clap::{Args, ValueEnum};

use lime_dev::environment;
use lime_dev::shell;

use super::Context;

/// Environment output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum EnvFormat {
    /// `export NAME=value` lines
    #[default]
    Shell,
    /// A JSON object
    Json,
}

/// Print the environment projected from the configuration
#[derive(Args, Debug)]
pub struct EnvArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = EnvFormat::Shell)]
    pub format: EnvFormat,
}

/// Execute the `env` command.
pub fn execute(args: EnvArgs, ctx: &Context) -> Result<()> {
    let model = ctx.load_config()?;
    let resolved = ctx.resolve(&model, &[])?;
    let vars = environment::project(
        &resolved,
        model.build_targets(),
        model.versions(),
        &ctx.paths,
        &ctx.mode,
    );

    match args.format {
        EnvFormat::Shell => {
            for (name, value) in &vars {
                println!("export {}={}", name, shell::quote(value));
            }
        }
        EnvFormat::Json => println!("{}", serde_json::to_string_pretty(&vars)?),
    }
    Ok(())
}
