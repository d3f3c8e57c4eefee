//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use lime_dev::defaults::{self, CONFIG_ENV, ROOT_ENV};
use lime_dev::mode::Mode;
use lime_dev::output::OutputConfig;
use lime_dev::path::WorkspacePaths;

use crate::commands::{self, Context, ModeSource};

/// lime-dev - Manage a LibreMesh multi-repository development workspace
#[derive(Parser, Debug)]
#[command(name = "lime-dev")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Workspace root directory
    #[arg(long, global = true, value_name = "DIR", env = ROOT_ENV)]
    root: Option<PathBuf>,

    /// Configuration file (defaults to <root>/configs/versions.conf)
    #[arg(long, global = true, value_name = "FILE", env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Override mode to resolve with (e.g. release); wins over LIME_RELEASE_MODE
    #[arg(long, global = true, value_name = "NAME")]
    mode: Option<String>,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clone or update every repository, then provision the upstream workflow
    Setup(commands::setup::SetupArgs),

    /// Show per-repository sync status without changing anything
    Status(commands::status::StatusArgs),

    /// Show or verify the active override mode
    Mode(commands::mode::ModeArgs),

    /// Show the upstream git aliases per repository
    Aliases(commands::aliases::AliasesArgs),

    /// Provision upstream remotes, aliases, exclusion rules and hooks
    Upstream(commands::upstream::UpstreamArgs),

    /// Print the environment projected from the configuration
    Env(commands::env::EnvArgs),

    /// Validate the configuration file
    Validate(commands::validate::ValidateArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        let root = self.root.unwrap_or_else(defaults::default_root);
        let paths = WorkspacePaths::new(root);
        let config_path = self.config.unwrap_or_else(|| paths.config_file());
        let (mode, mode_source) = match self.mode.as_deref() {
            Some(name) => (Mode::named(name), ModeSource::Flag),
            None => match Mode::from_env() {
                Mode::Default => (Mode::Default, ModeSource::Default),
                mode => (mode, ModeSource::Environment),
            },
        };

        let ctx = Context {
            paths,
            config_path,
            mode,
            mode_source,
            output: OutputConfig::from_env_and_flag(&self.color),
        };
        log::debug!(
            "Workspace {} with config {} in {} mode",
            ctx.paths.root().display(),
            ctx.config_path.display(),
            ctx.mode
        );

        match self.command {
            Commands::Setup(args) => commands::setup::execute(args, &ctx),
            Commands::Status(args) => commands::status::execute(args, &ctx),
            Commands::Mode(args) => commands::mode::execute(args, &ctx),
            Commands::Aliases(args) => commands::aliases::execute(args, &ctx),
            Commands::Upstream(args) => commands::upstream::execute(args, &ctx),
            Commands::Env(args) => commands::env::execute(args, &ctx),
            Commands::Validate(args) => commands::validate::execute(args, &ctx),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

/// Logs go to stderr. `RUST_LOG` wins over `--log-level` when set.
fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}
