//! # Git Operations Seam and Local Repository State
//!
//! The synchronizer and the upstream workflow manager never call `git`
//! directly. They go through the [`GitOperations`] trait, whose default
//! implementation [`SystemGit`] forwards to [`crate::git`]. Tests swap in
//! scripted implementations to exercise every branch of the sync state
//! machine without a network or real repositories.
//!
//! [`LocalRepositoryState`] is the on-disk observation of one repository.
//! It is recomputed whenever it is needed and never persisted.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::cancel::CancellationToken;
use crate::error::Result;

/// Trait for git operations - allows mocking in tests
pub trait GitOperations: Send + Sync {
    fn is_repository(&self, path: &Path) -> bool;

    fn clone_repo(
        &self,
        url: &str,
        branch: &str,
        remote: &str,
        target: &Path,
        cancel: &CancellationToken,
    ) -> Result<()>;

    fn fetch(&self, repo: &Path, remote: &str, cancel: &CancellationToken) -> Result<()>;

    fn remote_url(&self, repo: &Path, remote: &str) -> Result<Option<String>>;

    fn add_remote(&self, repo: &Path, remote: &str, url: &str) -> Result<()>;

    fn set_remote_url(&self, repo: &Path, remote: &str, url: &str) -> Result<()>;

    fn rev_parse(&self, repo: &Path, reference: &str) -> Result<Option<String>>;

    fn is_ancestor(&self, repo: &Path, ancestor: &str, descendant: &str) -> Result<bool>;

    fn current_branch(&self, repo: &Path) -> Result<Option<String>>;

    fn is_dirty(&self, repo: &Path) -> Result<bool>;

    fn create_tracking_branch(&self, repo: &Path, branch: &str, start_point: &str) -> Result<()>;

    fn update_branch_ref(&self, repo: &Path, branch: &str, new: &str, old: &str) -> Result<()>;

    fn merge_ff_only(&self, repo: &Path, target: &str) -> Result<()>;

    fn checkout(&self, repo: &Path, branch: &str) -> Result<()>;

    fn checkout_detached(&self, repo: &Path, commit: &str) -> Result<()>;

    fn config_get(&self, repo: &Path, key: &str) -> Result<Option<String>>;

    fn config_set(&self, repo: &Path, key: &str, value: &str) -> Result<()>;
}

/// The default implementation of `GitOperations`, which uses the system's
/// `git` command to perform real Git operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemGit;

impl GitOperations for SystemGit {
    fn is_repository(&self, path: &Path) -> bool {
        crate::git::is_repository(path)
    }

    fn clone_repo(
        &self,
        url: &str,
        branch: &str,
        remote: &str,
        target: &Path,
        cancel: &CancellationToken,
    ) -> Result<()> {
        crate::git::clone(url, branch, remote, target, cancel)
    }

    fn fetch(&self, repo: &Path, remote: &str, cancel: &CancellationToken) -> Result<()> {
        crate::git::fetch(repo, remote, cancel)
    }

    fn remote_url(&self, repo: &Path, remote: &str) -> Result<Option<String>> {
        crate::git::remote_url(repo, remote)
    }

    fn add_remote(&self, repo: &Path, remote: &str, url: &str) -> Result<()> {
        crate::git::add_remote(repo, remote, url)
    }

    fn set_remote_url(&self, repo: &Path, remote: &str, url: &str) -> Result<()> {
        crate::git::set_remote_url(repo, remote, url)
    }

    fn rev_parse(&self, repo: &Path, reference: &str) -> Result<Option<String>> {
        crate::git::rev_parse(repo, reference)
    }

    fn is_ancestor(&self, repo: &Path, ancestor: &str, descendant: &str) -> Result<bool> {
        crate::git::is_ancestor(repo, ancestor, descendant)
    }

    fn current_branch(&self, repo: &Path) -> Result<Option<String>> {
        crate::git::current_branch(repo)
    }

    fn is_dirty(&self, repo: &Path) -> Result<bool> {
        crate::git::is_dirty(repo)
    }

    fn create_tracking_branch(&self, repo: &Path, branch: &str, start_point: &str) -> Result<()> {
        crate::git::create_tracking_branch(repo, branch, start_point)
    }

    fn update_branch_ref(&self, repo: &Path, branch: &str, new: &str, old: &str) -> Result<()> {
        crate::git::update_branch_ref(repo, branch, new, old)
    }

    fn merge_ff_only(&self, repo: &Path, target: &str) -> Result<()> {
        crate::git::merge_ff_only(repo, target)
    }

    fn checkout(&self, repo: &Path, branch: &str) -> Result<()> {
        crate::git::checkout(repo, branch)
    }

    fn checkout_detached(&self, repo: &Path, commit: &str) -> Result<()> {
        crate::git::checkout_detached(repo, commit)
    }

    fn config_get(&self, repo: &Path, key: &str) -> Result<Option<String>> {
        crate::git::config_get(repo, key)
    }

    fn config_set(&self, repo: &Path, key: &str, value: &str) -> Result<()> {
        crate::git::config_set(repo, key, value)
    }
}

/// What is on disk for one repository right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalRepositoryState {
    pub path: PathBuf,
    pub exists: bool,
    pub is_repository: bool,
    pub current_branch: Option<String>,
    /// URL of the remote the configuration names, if configured.
    pub remote_url: Option<String>,
    pub head: Option<String>,
    pub dirty: bool,
}

impl LocalRepositoryState {
    /// Observe `path`, reading the URL of `remote`.
    pub fn observe(git: &dyn GitOperations, path: &Path, remote: &str) -> Result<Self> {
        let exists = path.exists();
        let is_repository = exists && git.is_repository(path);
        if !is_repository {
            return Ok(Self {
                path: path.to_path_buf(),
                exists,
                is_repository,
                current_branch: None,
                remote_url: None,
                head: None,
                dirty: false,
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            exists,
            is_repository,
            current_branch: git.current_branch(path)?,
            remote_url: git.remote_url(path, remote)?,
            head: git.rev_parse(path, "HEAD")?,
            dirty: git.is_dirty(path)?,
        })
    }
}

/// Abbreviate a commit id for display.
pub fn short_id(commit: &str) -> &str {
    commit.get(..10).unwrap_or(commit)
}
