//! `lime-dev completions <shell>`: print a completion script on stdout.
//!
//! ```bash
//! lime-dev completions bash > ~/.local/share/bash-completion/completions/lime-dev
//! lime-dev completions zsh > ~/.zfunc/_lime-dev
//! ```

use std::io::{self, Write};

use anyhow::Result;
use clap::{Args, CommandFactory, ValueEnum};
use clap_complete::{generate, Shell};

use crate::cli::Cli;

const BIN_NAME: &str = "lime-dev";

/// Shells lime-dev ships completions for.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

impl From<CompletionShell> for Shell {
    fn from(shell: CompletionShell) -> Self {
        match shell {
            CompletionShell::Bash => Shell::Bash,
            CompletionShell::Zsh => Shell::Zsh,
            CompletionShell::Fish => Shell::Fish,
        }
    }
}

/// Generate shell completion scripts
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    #[arg(value_enum)]
    pub shell: CompletionShell,
}

pub fn execute(args: CompletionsArgs) -> Result<()> {
    let mut stdout = io::stdout().lock();
    write_script(args.shell, &mut stdout)?;
    stdout.flush()?;
    Ok(())
}

/// Render the script for `shell` into `out`.
fn write_script(shell: CompletionShell, out: &mut dyn Write) -> Result<()> {
    let mut cmd = Cli::command();
    generate(Shell::from(shell), &mut cmd, BIN_NAME, out);
    Ok(())
}
