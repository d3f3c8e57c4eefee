//! # Error Handling
//!
//! This module defines the centralized error type for `lime-dev`. It uses the
//! `thiserror` library to build one `Error` enum covering every anticipated
//! failure mode, each variant carrying the context needed to explain the
//! failure to the user (the repository identifier, the config line, the git
//! command that failed).
//!
//! ## Fatal vs per-repository errors
//!
//! Errors fall into two groups:
//!
//! - **Configuration-level** (`ConfigParse`, `MalformedRepositoryEntry`,
//!   `Io` while reading the config): the run aborts before any repository is
//!   touched.
//! - **Per-repository** (`CloneFailed`, `FetchFailed`, `Diverged`,
//!   `RemoteMismatch`, `HookInstallFailed`, ...): collected into a
//!   [`crate::report::RunReport`] while the remaining repositories are
//!   processed.
//!
//! [`Error::is_fatal`] encodes that split.

use thiserror::Error;

/// Main error type for lime-dev operations
#[derive(Error, Debug)]
pub enum Error {
    /// A line in the configuration file could not be parsed.
    #[error("Configuration parsing error in [{section}] at line {line}: {message}")]
    ConfigParse {
        section: String,
        line: usize,
        message: String,
    },

    /// A repository cell does not have the `url|branch|remote` shape.
    #[error("Malformed repository entry '{id}' at line {line}: expected url|branch|remote")]
    MalformedRepositoryEntry { id: String, line: usize },

    /// A repository identifier was requested that the configuration does not declare.
    #[error("Unknown repository: {id}")]
    UnknownRepository { id: String },

    /// A branch name failed validation before being rendered into a command.
    #[error("Invalid branch name '{name}': {reason}")]
    InvalidBranchName { name: String, reason: String },

    /// Cloning a repository failed.
    #[error("Clone failed for {id}: {cause}")]
    CloneFailed { id: String, cause: String },

    /// Fetching from a remote failed, or the branch is missing on the remote.
    #[error("Fetch failed for {id}: {cause}")]
    FetchFailed { id: String, cause: String },

    /// Local and remote branch histories diverged; nothing was rewritten.
    #[error("Branch diverged for {id}: local {local_ref} and remote {remote_ref} have no linear history")]
    Diverged {
        id: String,
        local_ref: String,
        remote_ref: String,
    },

    /// The configured remote does not point where the configuration says.
    #[error("Remote mismatch for {id}: {remote} is {actual}, expected {expected}")]
    RemoteMismatch {
        id: String,
        remote: String,
        expected: String,
        actual: String,
    },

    /// Creating, fast-forwarding or checking out the local branch failed.
    #[error("Branch update failed for {id}: {cause}")]
    UpdateFailed { id: String, cause: String },

    /// The repository path exists but is not a git working tree.
    #[error("Not a git repository: {path}")]
    NotARepository { path: String },

    /// The upstream pre-commit hook could not be installed.
    #[error("Hook installation failed for {id}: {cause}")]
    HookInstallFailed { id: String, cause: String },

    /// A git alias could not be written to the repository config.
    #[error("Alias installation failed for {id} ({alias}): {cause}")]
    AliasInstallFailed {
        id: String,
        alias: String,
        cause: String,
    },

    /// The exclusion rule file could not be written.
    #[error("Writing exclusion rules failed for {id}: {cause}")]
    ExclusionWriteFailed { id: String, cause: String },

    /// Another invocation holds the lock for this repository.
    #[error("Repository {id} is locked by another lime-dev process ({path})")]
    RepositoryLocked { id: String, path: String },

    /// The operation was cancelled or ran past its deadline.
    #[error("Operation cancelled: {operation}")]
    Cancelled { operation: String },

    /// A git command exited unsuccessfully.
    #[error("Git command failed in {dir}: git {command} - {stderr}")]
    GitCommand {
        command: String,
        dir: String,
        stderr: String,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

impl Error {
    /// Whether this error must abort the whole run rather than a single
    /// repository.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ConfigParse { .. } | Error::MalformedRepositoryEntry { .. }
        )
    }

    /// Short machine-readable name of the variant, used in JSON reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ConfigParse { .. } => "config-parse",
            Error::MalformedRepositoryEntry { .. } => "malformed-repository-entry",
            Error::UnknownRepository { .. } => "unknown-repository",
            Error::InvalidBranchName { .. } => "invalid-branch-name",
            Error::CloneFailed { .. } => "clone-failed",
            Error::FetchFailed { .. } => "fetch-failed",
            Error::Diverged { .. } => "diverged",
            Error::RemoteMismatch { .. } => "remote-mismatch",
            Error::UpdateFailed { .. } => "update-failed",
            Error::NotARepository { .. } => "not-a-repository",
            Error::HookInstallFailed { .. } => "hook-install-failed",
            Error::AliasInstallFailed { .. } => "alias-install-failed",
            Error::ExclusionWriteFailed { .. } => "exclusion-write-failed",
            Error::RepositoryLocked { .. } => "repository-locked",
            Error::Cancelled { .. } => "cancelled",
            Error::GitCommand { .. } => "git-command",
            Error::Io(_) => "io",
            Error::Regex(_) => "regex",
            Error::Glob(_) => "glob",
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config_parse() {
        let error = Error::ConfigParse {
            section: "build_targets".to_string(),
            line: 12,
            message: "expected key=value".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Configuration parsing error"));
        assert!(display.contains("[build_targets]"));
        assert!(display.contains("line 12"));
        assert!(display.contains("expected key=value"));
    }

    #[test]
    fn test_error_display_malformed_entry() {
        let error = Error::MalformedRepositoryEntry {
            id: "repo_y".to_string(),
            line: 3,
        };
        let display = format!("{}", error);
        assert!(display.contains("repo_y"));
        assert!(display.contains("url|branch|remote"));
    }

    #[test]
    fn test_error_display_diverged() {
        let error = Error::Diverged {
            id: "lime-app".to_string(),
            local_ref: "1a2b3c".to_string(),
            remote_ref: "4d5e6f".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("lime-app"));
        assert!(display.contains("1a2b3c"));
        assert!(display.contains("4d5e6f"));
    }

    #[test]
    fn test_error_display_remote_mismatch() {
        let error = Error::RemoteMismatch {
            id: "openwrt".to_string(),
            remote: "origin".to_string(),
            expected: "https://git.openwrt.org/openwrt/openwrt.git".to_string(),
            actual: "https://example.com/fork.git".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("origin"));
        assert!(display.contains("expected https://git.openwrt.org/openwrt/openwrt.git"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert!(display.contains("File not found"));
    }

    #[test]
    fn test_error_from_glob_error() {
        let glob_error = glob::Pattern::new("[unclosed").unwrap_err();
        let error: Error = glob_error.into();
        assert!(format!("{}", error).contains("Glob pattern error"));
    }

    #[test]
    fn test_fatal_split() {
        assert!(Error::MalformedRepositoryEntry {
            id: "x".to_string(),
            line: 1
        }
        .is_fatal());
        assert!(!Error::CloneFailed {
            id: "x".to_string(),
            cause: "network".to_string()
        }
        .is_fatal());
        assert!(!Error::Cancelled {
            operation: "fetch".to_string()
        }
        .is_fatal());
    }

    #[test]
    fn test_kind_names() {
        let error = Error::HookInstallFailed {
            id: "lime-app".to_string(),
            cause: "foreign hook".to_string(),
        };
        assert_eq!(error.kind(), "hook-install-failed");
        assert_eq!(
            Error::UnknownRepository {
                id: "nope".to_string()
            }
            .kind(),
            "unknown-repository"
        );
    }
}
