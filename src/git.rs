//! Thin wrapper around the system `git` command.
//!
//! Every repository operation goes through the `git` binary, which
//! automatically handles:
//! - SSH keys from ~/.ssh/
//! - Git credential helpers
//! - Personal access tokens
//! - Any authentication configured in ~/.gitconfig
//!
//! Long-running commands (clone, fetch) take a [`CancellationToken`] and are
//! killed when it fires. Interactive credential prompts are disabled so a
//! missing credential fails instead of hanging.

use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use log::debug;

use crate::cancel::CancellationToken;
use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Captured result of a finished git command.
#[derive(Debug)]
struct GitOutput {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

fn command(dir: Option<&Path>, args: &[&str]) -> Command {
    let mut cmd = Command::new("git");
    if let Some(dir) = dir {
        cmd.arg("-C").arg(dir);
    }
    cmd.args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

fn spawn_error(dir: Option<&Path>, args: &[&str], e: std::io::Error) -> Error {
    Error::GitCommand {
        command: args.join(" "),
        dir: dir.map(|d| d.display().to_string()).unwrap_or_default(),
        stderr: e.to_string(),
    }
}

/// Run git to completion.
fn run(dir: Option<&Path>, args: &[&str]) -> Result<GitOutput> {
    debug!("git {}", args.join(" "));
    let output = command(dir, args)
        .output()
        .map_err(|e| spawn_error(dir, args, e))?;
    Ok(GitOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Run git while polling `cancel`; the child is killed once it fires.
fn run_cancellable(dir: Option<&Path>, args: &[&str], cancel: &CancellationToken) -> Result<GitOutput> {
    debug!("git {} (cancellable)", args.join(" "));
    let mut child = command(dir, args)
        .spawn()
        .map_err(|e| spawn_error(dir, args, e))?;

    // Drain both pipes on their own threads so a chatty child never blocks.
    let drain = |pipe: Option<Box<dyn Read + Send>>| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(mut pipe) = pipe {
                let _ = pipe.read_to_end(&mut buf);
            }
            buf
        })
    };
    let stdout = drain(child.stdout.take().map(|p| Box::new(p) as Box<dyn Read + Send>));
    let stderr = drain(child.stderr.take().map(|p| Box::new(p) as Box<dyn Read + Send>));

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::Cancelled {
                operation: format!("git {}", args.join(" ")),
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok(GitOutput {
        status,
        stdout: String::from_utf8_lossy(&stdout.join().unwrap_or_default()).into_owned(),
        stderr: String::from_utf8_lossy(&stderr.join().unwrap_or_default()).into_owned(),
    })
}

/// Turn a failed command into `Error::GitCommand`.
fn check(dir: Option<&Path>, args: &[&str], output: GitOutput) -> Result<String> {
    if output.status.success() {
        Ok(output.stdout)
    } else {
        Err(Error::GitCommand {
            command: args.join(" "),
            dir: dir.map(|d| d.display().to_string()).unwrap_or_default(),
            stderr: describe_failure(output.stderr.trim()),
        })
    }
}

/// Add a hint to the common authentication failures.
fn describe_failure(stderr: &str) -> String {
    if stderr.contains("Authentication failed")
        || stderr.contains("Permission denied")
        || stderr.contains("Could not read from remote repository")
        || stderr.contains("terminal prompts disabled")
    {
        format!(
            "Authentication failed. Make sure you have access to the repository.\n\
            For private repos, ensure you have:\n\
            - SSH key added to ssh-agent\n\
            - Git credentials configured\n\
            - Personal access token set up\n\
            Error: {}",
            stderr
        )
    } else {
        stderr.to_string()
    }
}

/// Run a query whose exit code 1 means "no value".
fn query(dir: &Path, args: &[&str]) -> Result<Option<String>> {
    let output = run(Some(dir), args)?;
    match output.status.code() {
        Some(0) => Ok(Some(output.stdout.trim().to_string())),
        Some(1) => Ok(None),
        _ => check(Some(dir), args, output).map(|_| None),
    }
}

/// Clone `url` at `branch` into `target_dir`, naming the remote `remote`.
///
/// The parent directory is created when missing. On failure git removes
/// the directory it created, unless the clone was killed by cancellation.
pub fn clone(
    url: &str,
    branch: &str,
    remote: &str,
    target_dir: &Path,
    cancel: &CancellationToken,
) -> Result<()> {
    if let Some(parent) = target_dir.parent() {
        fs::create_dir_all(parent)?;
    }
    let target = target_dir.to_string_lossy().into_owned();
    let args = [
        "clone",
        "--branch",
        branch,
        "--origin",
        remote,
        "--",
        url,
        target.as_str(),
    ];
    let output = run_cancellable(None, &args, cancel)?;
    check(None, &args, output).map(|_| ())
}

/// Fetch `remote` into its remote-tracking refs. Tags on fetched history
/// follow automatically; existing local tags are never overwritten.
pub fn fetch(repo: &Path, remote: &str, cancel: &CancellationToken) -> Result<()> {
    let args = ["fetch", "--quiet", remote];
    let output = run_cancellable(Some(repo), &args, cancel)?;
    check(Some(repo), &args, output).map(|_| ())
}

/// URL of `remote`, or `None` when the remote is not configured.
pub fn remote_url(repo: &Path, remote: &str) -> Result<Option<String>> {
    let key = format!("remote.{}.url", remote);
    query(repo, &["config", "--get", key.as_str()])
}

pub fn add_remote(repo: &Path, remote: &str, url: &str) -> Result<()> {
    let args = ["remote", "add", remote, url];
    check(Some(repo), &args, run(Some(repo), &args)?).map(|_| ())
}

pub fn set_remote_url(repo: &Path, remote: &str, url: &str) -> Result<()> {
    let args = ["remote", "set-url", remote, url];
    check(Some(repo), &args, run(Some(repo), &args)?).map(|_| ())
}

/// Commit id `reference` points at, or `None` when it does not exist.
pub fn rev_parse(repo: &Path, reference: &str) -> Result<Option<String>> {
    let spec = format!("{}^{{commit}}", reference);
    query(repo, &["rev-parse", "--verify", "--quiet", spec.as_str()])
}

/// Whether `ancestor` is reachable from `descendant`.
pub fn is_ancestor(repo: &Path, ancestor: &str, descendant: &str) -> Result<bool> {
    let args = ["merge-base", "--is-ancestor", ancestor, descendant];
    let output = run(Some(repo), &args)?;
    match output.status.code() {
        Some(0) => Ok(true),
        Some(1) => Ok(false),
        _ => check(Some(repo), &args, output).map(|_| false),
    }
}

/// Currently checked out branch, `None` on a detached HEAD.
pub fn current_branch(repo: &Path) -> Result<Option<String>> {
    query(repo, &["symbolic-ref", "--quiet", "--short", "HEAD"])
}

/// Whether tracked files have uncommitted changes.
pub fn is_dirty(repo: &Path) -> Result<bool> {
    let args = ["status", "--porcelain", "--untracked-files=no"];
    let stdout = check(Some(repo), &args, run(Some(repo), &args)?)?;
    Ok(!stdout.trim().is_empty())
}

/// Create `branch` at `start_point` and set it to track it.
pub fn create_tracking_branch(repo: &Path, branch: &str, start_point: &str) -> Result<()> {
    let args = ["branch", "--track", branch, start_point];
    check(Some(repo), &args, run(Some(repo), &args)?).map(|_| ())
}

/// Move a branch that is not checked out, guarded by its expected old value.
pub fn update_branch_ref(repo: &Path, branch: &str, new: &str, old: &str) -> Result<()> {
    let reference = format!("refs/heads/{}", branch);
    let args = ["update-ref", reference.as_str(), new, old];
    check(Some(repo), &args, run(Some(repo), &args)?).map(|_| ())
}

/// Fast-forward the checked out branch to `target`.
pub fn merge_ff_only(repo: &Path, target: &str) -> Result<()> {
    let args = ["merge", "--ff-only", "--quiet", target];
    check(Some(repo), &args, run(Some(repo), &args)?).map(|_| ())
}

pub fn checkout(repo: &Path, branch: &str) -> Result<()> {
    let args = ["checkout", "--quiet", branch];
    check(Some(repo), &args, run(Some(repo), &args)?).map(|_| ())
}

/// Detach HEAD at `commit`.
pub fn checkout_detached(repo: &Path, commit: &str) -> Result<()> {
    let args = ["checkout", "--quiet", "--detach", commit];
    check(Some(repo), &args, run(Some(repo), &args)?).map(|_| ())
}

/// Value of a local config key, `None` when unset.
pub fn config_get(repo: &Path, key: &str) -> Result<Option<String>> {
    query(repo, &["config", "--local", "--get", key])
}

pub fn config_set(repo: &Path, key: &str, value: &str) -> Result<()> {
    let args = ["config", "--local", key, value];
    check(Some(repo), &args, run(Some(repo), &args)?).map(|_| ())
}

/// Whether `path` looks like a git working tree.
pub fn is_repository(path: &Path) -> bool {
    path.join(".git").exists()
}
