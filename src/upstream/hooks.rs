//! # Upstream Pre-commit Hook
//!
//! Installs a `pre-commit` hook that runs the upstream validator, but only
//! when the most recent commit message carries the upstream marker. Without
//! the marker the hook exits 0 and prints nothing.
//!
//! Hooks written by lime-dev carry [`HOOK_MARKER`]. A pre-commit hook
//! without the marker belongs to someone else: it is left alone unless the
//! caller forces installation, in which case it is moved to
//! `pre-commit.backup` first.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::defaults::UPSTREAM_MARKER;
use crate::error::{Error, Result};
use crate::filesystem;
use crate::shell;

/// Hook marker comment to identify lime-dev hooks
pub const HOOK_MARKER: &str = "# lime-dev-upstream-hook";

const HOOK_NAME: &str = "pre-commit";
const BACKUP_NAME: &str = "pre-commit.backup";

/// What [`install`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookInstall {
    Unchanged,
    Written(PathBuf),
    /// A foreign hook was backed up before writing ours.
    Replaced { hook: PathBuf, backup: PathBuf },
}

/// Generate the pre-commit hook script
pub fn generate_hook_script(repo_name: &str, validator: &Path) -> String {
    let validator = shell::quote(&validator.to_string_lossy());
    let repo = shell::quote(repo_name);
    let marker = shell::quote(UPSTREAM_MARKER);

    format!(
        r#"#!/bin/sh
{HOOK_MARKER}
# Installed by lime-dev. Commits whose previous message contains {marker}
# are checked by the upstream validator before they are recorded.
#
# To reinstall: lime-dev upstream --force-hook

if ! git log -1 --pretty=%B 2>/dev/null | grep -qF {marker}; then
    exit 0
fi

VALIDATOR={validator}
if [ ! -x "$VALIDATOR" ]; then
    echo "Warning: upstream validator not found at $VALIDATOR, skipping"
    exit 0
fi

echo "Validating staged changes of {repo} for upstream..."
git diff --cached --name-only -z | xargs -0 "$VALIDATOR" {repo}
"#
    )
}

/// Find the .git directory for a repository
pub fn find_git_dir(repo_path: &Path) -> Result<PathBuf> {
    let git_dir = repo_path.join(".git");

    if git_dir.is_dir() {
        Ok(git_dir)
    } else if git_dir.is_file() {
        // Worktree or submodule - .git is a file pointing to the actual git dir
        let content = fs::read_to_string(&git_dir)?;
        let gitdir = content
            .strip_prefix("gitdir: ")
            .ok_or_else(|| Error::NotARepository {
                path: repo_path.display().to_string(),
            })?
            .trim();

        let path = if Path::new(gitdir).is_absolute() {
            PathBuf::from(gitdir)
        } else {
            repo_path.join(gitdir)
        };

        Ok(path)
    } else {
        Err(Error::NotARepository {
            path: repo_path.display().to_string(),
        })
    }
}

/// Path of the pre-commit hook of the repository at `repo_path`.
pub fn hook_path(repo_path: &Path) -> Result<PathBuf> {
    Ok(find_git_dir(repo_path)?.join("hooks").join(HOOK_NAME))
}

/// Install the upstream hook into the repository at `repo_path`.
pub fn install(
    id: &str,
    repo_path: &Path,
    validator: &Path,
    force: bool,
) -> Result<HookInstall> {
    let failed = |cause: String| Error::HookInstallFailed {
        id: id.to_string(),
        cause,
    };

    let hook = hook_path(repo_path).map_err(|e| failed(e.to_string()))?;
    let script = generate_hook_script(id, validator);

    let mut backup = None;
    if hook.exists() {
        let existing = fs::read_to_string(&hook).map_err(|e| failed(e.to_string()))?;
        if existing == script {
            return Ok(HookInstall::Unchanged);
        }
        if !existing.contains(HOOK_MARKER) {
            if !force {
                return Err(failed(format!(
                    "a pre-commit hook not installed by lime-dev exists at {}; \
                     use --force-hook to replace it (it will be backed up)",
                    hook.display()
                )));
            }
            let backup_path = hook.with_file_name(BACKUP_NAME);
            fs::rename(&hook, &backup_path).map_err(|e| failed(e.to_string()))?;
            warn!(
                "Backed up existing {} hook to {}",
                id,
                backup_path.display()
            );
            backup = Some(backup_path);
        }
    }

    filesystem::write_atomic(&hook, script.as_bytes(), Some(0o755))
        .map_err(|e| failed(e.to_string()))?;
    info!("Installed pre-commit hook: {}", hook.display());

    Ok(match backup {
        Some(backup) => HookInstall::Replaced { hook, backup },
        None => HookInstall::Written(hook),
    })
}

/// Whether the repository's pre-commit hook was written by lime-dev.
pub fn is_installed(repo_path: &Path) -> Result<bool> {
    let hook = hook_path(repo_path)?;
    if !hook.exists() {
        return Ok(false);
    }
    Ok(fs::read_to_string(&hook)?.contains(HOOK_MARKER))
}
