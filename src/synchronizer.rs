//! # Repository Synchronizer
//!
//! Brings each configured repository's checkout in line with its resolved
//! definition. For one repository, [`RepositorySynchronizer::ensure`] walks
//! this state machine:
//!
//! ```text
//! Absent ──clone──────────────────────────────────────────┐
//! Present ──repoint remote?──fetch──┬─ tag pin ─────── detach at tag ┤
//!                                   ├─ branch missing ──── create ──┤
//!                                   ├─ equal ──────────── no-op ────┤──▶ Synced
//!                                   ├─ behind ─────── fast-forward ─┘
//!                                   └─ ahead or diverged ──▶ Diverged (untouched)
//! ```
//!
//! Every step runs under the repository's [`RepoLock`]. Local commits are
//! never discarded and tracked files are only changed by fast-forwards or
//! by switching branches in a clean worktree. Running `ensure` twice with
//! nothing new upstream performs no mutation the second time.
//!
//! A pinned name that the remote only publishes as a tag is held as a
//! detached HEAD on the tagged commit. Tags are never fast-forwarded.
//!
//! [`RepositorySynchronizer::synchronize_all`] processes repositories in
//! parallel with `rayon`. A failure in one repository is recorded in the
//! [`RunReport`] and the others carry on.

use std::fs;
use std::path::Path;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::branch::BranchName;
use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::lock::RepoLock;
use crate::path::WorkspacePaths;
use crate::report::{Outcome, RepoResult, RunReport};
use crate::repository::{short_id, GitOperations, LocalRepositoryState, SystemGit};
use crate::resolver::ResolvedRepository;

/// How the local branch relates to the remote branch after a sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum SyncStatus {
    Cloned,
    UpToDate,
    BranchCreated,
    FastForwarded { from: String, to: String },
}

/// Change made to the configured remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum RemoteChange {
    Added { url: String },
    Repointed { from: String, to: String },
}

/// What happened to the checked-out branch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum CheckoutAction {
    #[default]
    Unchanged,
    Switched { from: Option<String> },
    /// HEAD was detached at the pinned tag.
    Detached { from: Option<String> },
    /// The worktree had local modifications so the branch was not switched.
    SkippedDirty { current: Option<String> },
}

/// Result of a successful [`RepositorySynchronizer::ensure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub id: String,
    pub branch: String,
    #[serde(flatten)]
    pub status: SyncStatus,
    pub head: Option<String>,
    pub remote_change: Option<RemoteChange>,
    pub checkout: CheckoutAction,
}

impl Outcome for SyncOutcome {}

impl SyncOutcome {
    /// Short description for the per-repository status line.
    pub fn describe(&self) -> String {
        let mut parts = vec![match &self.status {
            SyncStatus::Cloned => format!("cloned {}", self.branch),
            SyncStatus::UpToDate => format!("{} up to date", self.branch),
            SyncStatus::BranchCreated => format!("created {}", self.branch),
            SyncStatus::FastForwarded { from, to } => format!(
                "{} fast-forwarded {}..{}",
                self.branch,
                short_id(from),
                short_id(to)
            ),
        }];
        match &self.remote_change {
            Some(RemoteChange::Added { url }) => parts.push(format!("added remote {}", url)),
            Some(RemoteChange::Repointed { from, to }) => {
                parts.push(format!("remote repointed {} -> {}", from, to))
            }
            None => {}
        }
        match &self.checkout {
            CheckoutAction::Unchanged => {}
            CheckoutAction::Switched { .. } => parts.push(format!("checked out {}", self.branch)),
            CheckoutAction::Detached { .. } => parts.push(format!("detached at tag {}", self.branch)),
            CheckoutAction::SkippedDirty { current } => parts.push(format!(
                "worktree dirty, stayed on {}",
                current.as_deref().unwrap_or("detached HEAD")
            )),
        }
        parts.join(", ")
    }
}

/// Relation between a local branch and its remote-tracking ref, as last
/// fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tracking {
    UpToDate,
    Behind,
    Ahead,
    Diverged,
    /// HEAD sits on the pinned tag.
    AtTag,
    /// Local branch or remote-tracking ref is missing.
    Unknown,
}

/// Read-only verification of one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryCheck {
    pub id: String,
    pub expected_branch: String,
    pub state: LocalRepositoryState,
    pub tracking: Tracking,
}

impl Outcome for RepositoryCheck {}

impl RepositoryCheck {
    pub fn on_expected_branch(&self) -> bool {
        self.state.current_branch.as_deref() == Some(self.expected_branch.as_str())
    }

    pub fn describe(&self) -> String {
        if !self.state.exists {
            return "absent".to_string();
        }
        let mut parts = vec![match &self.state.current_branch {
            _ if self.tracking == Tracking::AtTag => format!("at tag {}", self.expected_branch),
            Some(current) if self.on_expected_branch() => format!("on {}", current),
            Some(current) => format!("on {} (expected {})", current, self.expected_branch),
            None => format!("detached HEAD (expected {})", self.expected_branch),
        }];
        let tracking = match self.tracking {
            Tracking::UpToDate => Some("up to date"),
            Tracking::Behind => Some("behind remote"),
            Tracking::Ahead => Some("ahead of remote"),
            Tracking::Diverged => Some("diverged from remote"),
            Tracking::AtTag => None,
            Tracking::Unknown => Some("not tracked"),
        };
        parts.extend(tracking.map(str::to_string));
        if self.state.dirty {
            parts.push("dirty".to_string());
        }
        parts.join(", ")
    }
}

/// Options for a multi-repository run.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub sequential: bool,
    pub cancel: CancellationToken,
}

pub struct RepositorySynchronizer {
    git: Box<dyn GitOperations>,
    paths: WorkspacePaths,
}

impl RepositorySynchronizer {
    pub fn new(paths: WorkspacePaths) -> Self {
        Self::with_git(paths, Box::new(SystemGit))
    }

    pub fn with_git(paths: WorkspacePaths, git: Box<dyn GitOperations>) -> Self {
        Self { git, paths }
    }

    pub fn paths(&self) -> &WorkspacePaths {
        &self.paths
    }

    /// Make the checkout at `local_path` match `resolved`.
    pub fn ensure(
        &self,
        resolved: &ResolvedRepository,
        local_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<SyncOutcome> {
        let branch = BranchName::parse(&resolved.branch)?;
        let _lock = RepoLock::acquire(&self.paths.locks_dir(), &resolved.id)?;

        if !local_path.exists() {
            return self.clone_fresh(resolved, &branch, local_path, cancel);
        }
        if !self.git.is_repository(local_path) {
            return Err(Error::NotARepository {
                path: local_path.display().to_string(),
            });
        }

        let remote_change = self.reconcile_remote(resolved, local_path)?;

        debug!("Fetching {} from {}", resolved.id, resolved.remote);
        self.git
            .fetch(local_path, &resolved.remote, cancel)
            .map_err(|e| classify(e, |cause| fetch_failed(&resolved.id, cause)))?;

        let remote_ref = format!("refs/remotes/{}/{}", resolved.remote, branch);
        let remote_tip = match self.git.rev_parse(local_path, &remote_ref)? {
            Some(tip) => tip,
            None => {
                let tag = format!("refs/tags/{}", branch);
                let tagged = self.git.rev_parse(local_path, &tag)?.ok_or_else(|| {
                    fetch_failed(
                        &resolved.id,
                        format!("branch {} not found on remote {}", branch, resolved.remote),
                    )
                })?;
                let checkout = self.hold_tag(resolved, &branch, local_path, &tagged)?;
                return Ok(SyncOutcome {
                    id: resolved.id.clone(),
                    branch: branch.to_string(),
                    status: SyncStatus::UpToDate,
                    head: self.git.rev_parse(local_path, "HEAD")?,
                    remote_change,
                    checkout,
                });
            }
        };

        let status = self.advance_branch(resolved, &branch, local_path, &remote_ref, &remote_tip)?;
        let checkout = self.align_checkout(resolved, &branch, local_path)?;

        Ok(SyncOutcome {
            id: resolved.id.clone(),
            branch: branch.to_string(),
            status,
            head: self.git.rev_parse(local_path, "HEAD")?,
            remote_change,
            checkout,
        })
    }

    fn clone_fresh(
        &self,
        resolved: &ResolvedRepository,
        branch: &BranchName,
        local_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<SyncOutcome> {
        info!("Cloning {} ({}) into {}", resolved.id, branch, local_path.display());
        let cloned = self.git.clone_repo(
            &resolved.url,
            branch.as_str(),
            &resolved.remote,
            local_path,
            cancel,
        );
        if let Err(e) = cloned {
            // A killed clone can leave a partial directory behind.
            if local_path.exists() {
                let _ = fs::remove_dir_all(local_path);
            }
            return Err(classify(e, |cause| Error::CloneFailed {
                id: resolved.id.clone(),
                cause,
            }));
        }

        Ok(SyncOutcome {
            id: resolved.id.clone(),
            branch: branch.to_string(),
            status: SyncStatus::Cloned,
            head: self.git.rev_parse(local_path, "HEAD")?,
            remote_change: None,
            checkout: CheckoutAction::Unchanged,
        })
    }

    /// Ensure the configured remote exists and points at the resolved URL.
    fn reconcile_remote(
        &self,
        resolved: &ResolvedRepository,
        local_path: &Path,
    ) -> Result<Option<RemoteChange>> {
        match self.git.remote_url(local_path, &resolved.remote)? {
            Some(actual) if actual == resolved.url => Ok(None),
            Some(actual) => {
                warn!(
                    "Repointing {} remote {} from {} to {}",
                    resolved.id, resolved.remote, actual, resolved.url
                );
                self.git
                    .set_remote_url(local_path, &resolved.remote, &resolved.url)
                    .map_err(|_| Error::RemoteMismatch {
                        id: resolved.id.clone(),
                        remote: resolved.remote.clone(),
                        expected: resolved.url.clone(),
                        actual: actual.clone(),
                    })?;
                Ok(Some(RemoteChange::Repointed {
                    from: actual,
                    to: resolved.url.clone(),
                }))
            }
            None => {
                info!("Adding remote {} to {}", resolved.remote, resolved.id);
                self.git
                    .add_remote(local_path, &resolved.remote, &resolved.url)
                    .map_err(|e| classify(e, |cause| update_failed(&resolved.id, cause)))?;
                Ok(Some(RemoteChange::Added {
                    url: resolved.url.clone(),
                }))
            }
        }
    }

    /// Move the local branch toward the fetched remote tip, never backwards.
    fn advance_branch(
        &self,
        resolved: &ResolvedRepository,
        branch: &BranchName,
        local_path: &Path,
        remote_ref: &str,
        remote_tip: &str,
    ) -> Result<SyncStatus> {
        let local_ref = format!("refs/heads/{}", branch);
        let local_tip = match self.git.rev_parse(local_path, &local_ref)? {
            Some(tip) => tip,
            None => {
                info!("Creating branch {} in {}", branch, resolved.id);
                self.git
                    .create_tracking_branch(local_path, branch.as_str(), remote_ref)
                    .map_err(|e| classify(e, |cause| update_failed(&resolved.id, cause)))?;
                return Ok(SyncStatus::BranchCreated);
            }
        };

        if local_tip == remote_tip {
            debug!("{} already at {}", resolved.id, short_id(&local_tip));
            return Ok(SyncStatus::UpToDate);
        }

        if self.git.is_ancestor(local_path, &local_tip, remote_tip)? {
            info!(
                "Fast-forwarding {} {} to {}",
                resolved.id,
                branch,
                short_id(remote_tip)
            );
            let checked_out = self.git.current_branch(local_path)?;
            let advanced = if checked_out.as_deref() == Some(branch.as_str()) {
                self.git.merge_ff_only(local_path, remote_ref)
            } else {
                self.git
                    .update_branch_ref(local_path, branch.as_str(), remote_tip, &local_tip)
            };
            advanced.map_err(|e| classify(e, |cause| update_failed(&resolved.id, cause)))?;
            return Ok(SyncStatus::FastForwarded {
                from: local_tip,
                to: remote_tip.to_string(),
            });
        }

        // Ahead or diverged: the local tip is not on the remote. Leave it.
        Err(Error::Diverged {
            id: resolved.id.clone(),
            local_ref: format!("{}@{}", local_ref, short_id(&local_tip)),
            remote_ref: format!("{}@{}", remote_ref, short_id(remote_tip)),
        })
    }

    /// Keep HEAD on the commit `tag` names, detaching it there when the
    /// worktree is clean.
    fn hold_tag(
        &self,
        resolved: &ResolvedRepository,
        tag: &BranchName,
        local_path: &Path,
        tagged: &str,
    ) -> Result<CheckoutAction> {
        if self.git.rev_parse(local_path, "HEAD")?.as_deref() == Some(tagged) {
            debug!("{} already at tag {}", resolved.id, tag);
            return Ok(CheckoutAction::Unchanged);
        }
        let current = self.git.current_branch(local_path)?;
        if self.git.is_dirty(local_path)? {
            warn!(
                "{} has local modifications; not moving to tag {}",
                resolved.id, tag
            );
            return Ok(CheckoutAction::SkippedDirty { current });
        }
        info!("Detaching {} at tag {}", resolved.id, tag);
        self.git
            .checkout_detached(local_path, tagged)
            .map_err(|e| classify(e, |cause| update_failed(&resolved.id, cause)))?;
        Ok(CheckoutAction::Detached { from: current })
    }

    /// Check out the resolved branch when the worktree is clean.
    fn align_checkout(
        &self,
        resolved: &ResolvedRepository,
        branch: &BranchName,
        local_path: &Path,
    ) -> Result<CheckoutAction> {
        let current = self.git.current_branch(local_path)?;
        if current.as_deref() == Some(branch.as_str()) {
            return Ok(CheckoutAction::Unchanged);
        }
        if self.git.is_dirty(local_path)? {
            warn!(
                "{} has local modifications; not switching from {} to {}",
                resolved.id,
                current.as_deref().unwrap_or("detached HEAD"),
                branch
            );
            return Ok(CheckoutAction::SkippedDirty { current });
        }
        info!("Checking out {} in {}", branch, resolved.id);
        self.git
            .checkout(local_path, branch.as_str())
            .map_err(|e| classify(e, |cause| update_failed(&resolved.id, cause)))?;
        Ok(CheckoutAction::Switched { from: current })
    }

    /// Observe the repository's directory without changing anything.
    pub fn inspect(&self, resolved: &ResolvedRepository) -> Result<LocalRepositoryState> {
        LocalRepositoryState::observe(
            self.git.as_ref(),
            &self.paths.repo_path(&resolved.id),
            &resolved.remote,
        )
    }

    /// Verify a repository against its definition without touching it.
    ///
    /// An absent repository is reported, not failed. A directory that is
    /// not a repository or a remote pointing elsewhere is an error.
    pub fn check(&self, resolved: &ResolvedRepository) -> Result<RepositoryCheck> {
        let state = self.inspect(resolved)?;
        let mut tracking = Tracking::Unknown;

        if state.exists {
            if !state.is_repository {
                return Err(Error::NotARepository {
                    path: state.path.display().to_string(),
                });
            }
            if let Some(actual) = &state.remote_url {
                if actual != &resolved.url {
                    return Err(Error::RemoteMismatch {
                        id: resolved.id.clone(),
                        remote: resolved.remote.clone(),
                        expected: resolved.url.clone(),
                        actual: actual.clone(),
                    });
                }
            }
            tracking = self.tracking(resolved, &state.path)?;
        }

        Ok(RepositoryCheck {
            id: resolved.id.clone(),
            expected_branch: resolved.branch.clone(),
            state,
            tracking,
        })
    }

    fn tracking(&self, resolved: &ResolvedRepository, local_path: &Path) -> Result<Tracking> {
        let local = self
            .git
            .rev_parse(local_path, &format!("refs/heads/{}", resolved.branch))?;
        let remote = self.git.rev_parse(
            local_path,
            &format!("refs/remotes/{}/{}", resolved.remote, resolved.branch),
        )?;
        if remote.is_none() {
            let tag = self
                .git
                .rev_parse(local_path, &format!("refs/tags/{}", resolved.branch))?;
            if tag.is_some() && tag == self.git.rev_parse(local_path, "HEAD")? {
                return Ok(Tracking::AtTag);
            }
        }
        let (Some(local), Some(remote)) = (local, remote) else {
            return Ok(Tracking::Unknown);
        };
        Ok(if local == remote {
            Tracking::UpToDate
        } else if self.git.is_ancestor(local_path, &local, &remote)? {
            Tracking::Behind
        } else if self.git.is_ancestor(local_path, &remote, &local)? {
            Tracking::Ahead
        } else {
            Tracking::Diverged
        })
    }

    /// Ensure every repository, collecting per-repository results.
    ///
    /// Results keep the order of `repositories` whether or not the run is
    /// parallel.
    pub fn synchronize_all(
        &self,
        repositories: &[ResolvedRepository],
        options: &SyncOptions,
    ) -> RunReport<SyncOutcome> {
        let run_one = |resolved: &ResolvedRepository| {
            let local_path = self.paths.repo_path(&resolved.id);
            let result = if options.cancel.is_cancelled() {
                Err(Error::Cancelled {
                    operation: format!("sync of {}", resolved.id),
                })
            } else {
                self.ensure(resolved, &local_path, &options.cancel)
            };
            match &result {
                Ok(outcome) => info!("{}: {}", resolved.id, outcome.describe()),
                Err(e) => warn!("{}: {}", resolved.id, e),
            }
            RepoResult::new(resolved.id.clone(), result)
        };

        let entries = if options.sequential {
            repositories.iter().map(run_one).collect()
        } else {
            repositories.par_iter().map(run_one).collect()
        };
        RunReport::new(entries)
    }

    /// Check every repository without mutating anything.
    pub fn check_all(&self, repositories: &[ResolvedRepository]) -> RunReport<RepositoryCheck> {
        let entries = repositories
            .par_iter()
            .map(|resolved| RepoResult::new(resolved.id.clone(), self.check(resolved)))
            .collect();
        RunReport::new(entries)
    }
}

/// Wrap a low-level failure in the operation's error, keeping
/// cancellation and lock contention as they are.
fn classify(error: Error, wrap: impl FnOnce(String) -> Error) -> Error {
    match error {
        e @ (Error::Cancelled { .. } | Error::RepositoryLocked { .. }) => e,
        Error::GitCommand { stderr, .. } => wrap(stderr),
        other => wrap(other.to_string()),
    }
}

fn fetch_failed(id: &str, cause: String) -> Error {
    Error::FetchFailed {
        id: id.to_string(),
        cause,
    }
}

fn update_failed(id: &str, cause: String) -> Error {
    Error::UpdateFailed {
        id: id.to_string(),
        cause,
    }
}
