//! Override resolution.
//!
//! Resolution turns a base [`RepositoryDefinition`] plus the override for the
//! active [`Mode`] into a [`ResolvedRepository`]. It reads nothing but the
//! [`ConfigModel`] and its arguments, so the same `(id, mode, config)` always
//! yields the same triple. Synchronization relies on that to be idempotent.

use serde::Serialize;

use crate::config::{ConfigModel, RepositoryDefinition};
use crate::error::{Error, Result};
use crate::mode::Mode;

/// The effective, mode-specific definition of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResolvedRepository {
    pub id: String,
    pub url: String,
    pub branch: String,
    pub remote: String,
}

impl From<&RepositoryDefinition> for ResolvedRepository {
    fn from(def: &RepositoryDefinition) -> Self {
        Self {
            id: def.id.clone(),
            url: def.url.clone(),
            branch: def.branch.clone(),
            remote: def.remote.clone(),
        }
    }
}

/// Resolves repositories against one configuration.
#[derive(Debug, Clone, Copy)]
pub struct OverrideResolver<'a> {
    config: &'a ConfigModel,
}

impl<'a> OverrideResolver<'a> {
    pub fn new(config: &'a ConfigModel) -> Self {
        Self { config }
    }

    /// Resolve one repository.
    ///
    /// Fields the override leaves unset keep the base value.
    pub fn resolve(&self, id: &str, mode: &Mode) -> Result<ResolvedRepository> {
        let base = self
            .config
            .get_repository(id)
            .ok_or_else(|| Error::UnknownRepository { id: id.to_string() })?;

        let mut resolved = ResolvedRepository::from(base);
        if let Some(over) = self.config.get_override_for(mode, id) {
            if let Some(url) = &over.url {
                resolved.url.clone_from(url);
            }
            if let Some(branch) = &over.branch {
                resolved.branch.clone_from(branch);
            }
            if let Some(remote) = &over.remote {
                resolved.remote.clone_from(remote);
            }
        }
        Ok(resolved)
    }

    /// Resolve every declared repository, in declaration order.
    pub fn resolve_all(&self, mode: &Mode) -> Vec<ResolvedRepository> {
        self.config
            .repositories()
            .iter()
            .filter_map(|def| self.resolve(&def.id, mode).ok())
            .collect()
    }

    /// Resolve the given identifiers, failing on the first unknown one.
    pub fn resolve_selected(&self, ids: &[String], mode: &Mode) -> Result<Vec<ResolvedRepository>> {
        ids.iter().map(|id| self.resolve(id, mode)).collect()
    }

    /// Override entries of `mode` that name undeclared repositories.
    pub fn dangling_overrides(&self, mode: &Mode) -> Vec<String> {
        self.config
            .overrides_for(mode)
            .map(|set| {
                set.keys()
                    .filter(|id| self.config.get_repository(id).is_none())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}
