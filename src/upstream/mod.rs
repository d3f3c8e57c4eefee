//! # Upstream Contribution Workflow
//!
//! For every repository present on disk, [`UpstreamWorkflowManager`] runs
//! four independent, re-runnable steps:
//!
//! - **Remote**: point the `upstream` remote at the repository's public
//!   project and fetch it.
//! - **Aliases**: install the [`aliases::CATALOG`] into the local git config.
//! - **Exclusions**: write the repository's exclusion rule file.
//! - **Hook**: install the upstream pre-commit hook.
//!
//! A failing step is recorded and the remaining steps still run. Running
//! the workflow twice with the same inputs reports every step as
//! [`StepOutcome::Unchanged`] the second time.

pub mod aliases;
pub mod exclusions;
pub mod hooks;
pub mod remotes;

use std::fmt;
use std::path::Path;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::branch::BranchName;
use crate::cancel::CancellationToken;
use crate::config::ConfigModel;
use crate::defaults::UPSTREAM_REMOTE;
use crate::error::{Error, Result};
use crate::filesystem;
use crate::lock::RepoLock;
use crate::path::WorkspacePaths;
use crate::report::{Outcome, RepoResult, RunReport};
use crate::repository::{GitOperations, SystemGit};
use crate::resolver::ResolvedRepository;

use self::aliases::AliasContext;
use self::hooks::HookInstall;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    Remote,
    Aliases,
    Exclusions,
    Hook,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Remote => "remote",
            Step::Aliases => "aliases",
            Step::Exclusions => "exclusions",
            Step::Hook => "hook",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Unchanged,
    Updated(String),
    Skipped(String),
}

#[derive(Debug)]
pub struct StepReport {
    pub step: Step,
    pub result: Result<StepOutcome>,
}

impl StepReport {
    pub fn describe(&self) -> String {
        match &self.result {
            Ok(StepOutcome::Unchanged) => format!("{} unchanged", self.step),
            Ok(StepOutcome::Updated(detail)) => format!("{} updated ({})", self.step, detail),
            Ok(StepOutcome::Skipped(reason)) => format!("{} skipped ({})", self.step, reason),
            Err(e) => format!("{} failed: {}", self.step, e),
        }
    }
}

impl Serialize for StepReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let (status, detail) = match &self.result {
            Ok(StepOutcome::Unchanged) => ("unchanged", None),
            Ok(StepOutcome::Updated(detail)) => ("updated", Some(detail.clone())),
            Ok(StepOutcome::Skipped(reason)) => ("skipped", Some(reason.clone())),
            Err(e) => ("failed", Some(e.to_string())),
        };
        let mut state = serializer.serialize_struct("StepReport", 3)?;
        state.serialize_field("step", &self.step)?;
        state.serialize_field("status", status)?;
        state.serialize_field("detail", &detail)?;
        state.end()
    }
}

/// Per-repository result of the upstream workflow.
#[derive(Debug, Serialize)]
pub struct UpstreamOutcome {
    pub id: String,
    pub steps: Vec<StepReport>,
}

impl Outcome for UpstreamOutcome {
    fn errors(&self) -> Vec<&Error> {
        self.steps
            .iter()
            .filter_map(|s| s.result.as_ref().err())
            .collect()
    }
}

impl UpstreamOutcome {
    pub fn step(&self, step: Step) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.step == step)
    }

    pub fn describe(&self) -> String {
        self.steps
            .iter()
            .map(StepReport::describe)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpstreamOptions {
    /// Replace a foreign pre-commit hook, backing it up.
    pub force_hook: bool,
    /// Skip fetching the upstream remote after provisioning it.
    pub no_fetch: bool,
    pub cancel: CancellationToken,
}

pub struct UpstreamWorkflowManager<'a> {
    git: Box<dyn GitOperations>,
    paths: WorkspacePaths,
    config: &'a ConfigModel,
}

impl<'a> UpstreamWorkflowManager<'a> {
    pub fn new(paths: WorkspacePaths, config: &'a ConfigModel) -> Self {
        Self::with_git(paths, config, Box::new(SystemGit))
    }

    pub fn with_git(
        paths: WorkspacePaths,
        config: &'a ConfigModel,
        git: Box<dyn GitOperations>,
    ) -> Self {
        Self { git, paths, config }
    }

    /// Branch the upstream aliases are rendered for: the upstream project's
    /// main branch, falling back to the resolved branch for repositories
    /// with no known upstream.
    pub fn main_branch(&self, resolved: &ResolvedRepository) -> Result<BranchName> {
        let branch = remotes::upstream_for(self.config, &resolved.id)
            .and_then(|u| u.branch)
            .unwrap_or_else(|| resolved.branch.clone());
        BranchName::parse(&branch)
    }

    /// The alias catalog as it would be installed for `resolved`.
    pub fn rendered_aliases(
        &self,
        resolved: &ResolvedRepository,
    ) -> Result<Vec<(&'static str, String)>> {
        let branch = self.main_branch(resolved)?;
        aliases::render_catalog(&AliasContext {
            branch: &branch,
            upstream: UPSTREAM_REMOTE,
        })
    }

    /// The aliases currently present in the repository's git config.
    pub fn installed_aliases(
        &self,
        resolved: &ResolvedRepository,
    ) -> Result<Vec<(&'static str, Option<String>)>> {
        let repo = self.paths.repo_path(&resolved.id);
        if !self.git.is_repository(&repo) {
            return Err(Error::NotARepository {
                path: repo.display().to_string(),
            });
        }
        aliases::CATALOG
            .iter()
            .map(|alias| {
                Ok((
                    alias.name,
                    self.git.config_get(&repo, &aliases::config_key(alias.name))?,
                ))
            })
            .collect()
    }

    /// Run every step for one repository.
    ///
    /// Repositories that are not cloned yet have every step skipped.
    pub fn provision(
        &self,
        resolved: &ResolvedRepository,
        options: &UpstreamOptions,
    ) -> Result<UpstreamOutcome> {
        let repo = self.paths.repo_path(&resolved.id);
        if !repo.exists() || !self.git.is_repository(&repo) {
            debug!("{} is not cloned; skipping upstream workflow", resolved.id);
            let skipped = [Step::Remote, Step::Aliases, Step::Exclusions, Step::Hook]
                .into_iter()
                .map(|step| StepReport {
                    step,
                    result: Ok(StepOutcome::Skipped("repository not present".to_string())),
                })
                .collect();
            return Ok(UpstreamOutcome {
                id: resolved.id.clone(),
                steps: skipped,
            });
        }

        let _lock = RepoLock::acquire(&self.paths.locks_dir(), &resolved.id)?;

        let steps = vec![
            StepReport {
                step: Step::Remote,
                result: self.provision_remote(resolved, &repo, options),
            },
            StepReport {
                step: Step::Aliases,
                result: self.provision_aliases(resolved, &repo),
            },
            StepReport {
                step: Step::Exclusions,
                result: self.provision_exclusions(resolved),
            },
            StepReport {
                step: Step::Hook,
                result: self.provision_hook(resolved, &repo, options),
            },
        ];
        for step in &steps {
            if let Err(e) = &step.result {
                warn!("{}: upstream {} step failed: {}", resolved.id, step.step, e);
            }
        }

        Ok(UpstreamOutcome {
            id: resolved.id.clone(),
            steps,
        })
    }

    fn provision_remote(
        &self,
        resolved: &ResolvedRepository,
        repo: &Path,
        options: &UpstreamOptions,
    ) -> Result<StepOutcome> {
        let Some(upstream) = remotes::upstream_for(self.config, &resolved.id) else {
            return Ok(StepOutcome::Skipped("no upstream URL".to_string()));
        };

        let outcome = match self.git.remote_url(repo, UPSTREAM_REMOTE)? {
            Some(actual) if actual == upstream.url => StepOutcome::Unchanged,
            Some(actual) => {
                warn!(
                    "Repointing {} remote {} from {} to {}",
                    resolved.id, UPSTREAM_REMOTE, actual, upstream.url
                );
                self.git
                    .set_remote_url(repo, UPSTREAM_REMOTE, &upstream.url)
                    .map_err(|_| Error::RemoteMismatch {
                        id: resolved.id.clone(),
                        remote: UPSTREAM_REMOTE.to_string(),
                        expected: upstream.url.clone(),
                        actual: actual.clone(),
                    })?;
                StepOutcome::Updated(format!("repointed to {}", upstream.url))
            }
            None => {
                info!("Adding {} remote to {}", UPSTREAM_REMOTE, resolved.id);
                self.git.add_remote(repo, UPSTREAM_REMOTE, &upstream.url)?;
                StepOutcome::Updated(format!("added {}", upstream.url))
            }
        };

        if !options.no_fetch {
            self.git
                .fetch(repo, UPSTREAM_REMOTE, &options.cancel)
                .map_err(|e| match e {
                    Error::Cancelled { .. } => e,
                    Error::GitCommand { stderr, .. } => Error::FetchFailed {
                        id: resolved.id.clone(),
                        cause: stderr,
                    },
                    other => Error::FetchFailed {
                        id: resolved.id.clone(),
                        cause: other.to_string(),
                    },
                })?;
        }
        Ok(outcome)
    }

    fn provision_aliases(&self, resolved: &ResolvedRepository, repo: &Path) -> Result<StepOutcome> {
        let rendered = self.rendered_aliases(resolved)?;
        let mut written = 0;
        for (name, command) in &rendered {
            let failed = |e: Error| Error::AliasInstallFailed {
                id: resolved.id.clone(),
                alias: name.to_string(),
                cause: e.to_string(),
            };
            let key = aliases::config_key(name);
            let current = self.git.config_get(repo, &key).map_err(failed)?;
            if current.as_deref() == Some(command.as_str()) {
                continue;
            }
            self.git.config_set(repo, &key, command).map_err(failed)?;
            written += 1;
        }

        if written == 0 {
            Ok(StepOutcome::Unchanged)
        } else {
            info!("Installed {} upstream aliases in {}", written, resolved.id);
            Ok(StepOutcome::Updated(format!(
                "{} of {} aliases written",
                written,
                rendered.len()
            )))
        }
    }

    fn provision_exclusions(&self, resolved: &ResolvedRepository) -> Result<StepOutcome> {
        let patterns = exclusions::rules_for(self.config, &resolved.id);
        let content = exclusions::render(&resolved.id, &patterns);
        let path = self.paths.exclusion_file(&resolved.id);

        let changed = filesystem::write_if_changed(&path, &content, None).map_err(|e| {
            Error::ExclusionWriteFailed {
                id: resolved.id.clone(),
                cause: e.to_string(),
            }
        })?;
        if changed {
            info!("Wrote {} exclusion rules to {}", patterns.len(), path.display());
            Ok(StepOutcome::Updated(format!(
                "{} patterns in {}",
                patterns.len(),
                path.display()
            )))
        } else {
            Ok(StepOutcome::Unchanged)
        }
    }

    fn provision_hook(
        &self,
        resolved: &ResolvedRepository,
        repo: &Path,
        options: &UpstreamOptions,
    ) -> Result<StepOutcome> {
        let validator = self.paths.validator_script();
        Ok(
            match hooks::install(&resolved.id, repo, &validator, options.force_hook)? {
                HookInstall::Unchanged => StepOutcome::Unchanged,
                HookInstall::Written(hook) => StepOutcome::Updated(hook.display().to_string()),
                HookInstall::Replaced { backup, .. } => {
                    StepOutcome::Updated(format!("previous hook saved as {}", backup.display()))
                }
            },
        )
    }

    /// Provision every repository in parallel.
    pub fn provision_all(
        &self,
        repositories: &[ResolvedRepository],
        options: &UpstreamOptions,
    ) -> RunReport<UpstreamOutcome> {
        let entries = repositories
            .par_iter()
            .map(|resolved| {
                let result = self.provision(resolved, options);
                if let Err(e) = &result {
                    warn!("{}: {}", resolved.id, e);
                }
                RepoResult::new(resolved.id.clone(), result)
            })
            .collect();
        RunReport::new(entries)
    }
}
