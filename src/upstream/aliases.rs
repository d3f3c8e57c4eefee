//! Git alias catalog for the upstream contribution workflow.
//!
//! Each alias is an [`AliasTemplate`] with named placeholders. Rendering
//! fills them from a validated [`BranchName`] and the upstream remote name,
//! shell-quoting every value, so a configured branch can never inject
//! commands into an alias.

use regex::{Captures, Regex};

use crate::branch::BranchName;
use crate::error::Result;
use crate::shell;

/// Placeholders look like `{branch}`.
const PLACEHOLDER: &str = r"\{([a-z_]+)\}";

/// A named git alias whose command is rendered per repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AliasTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub template: &'static str,
}

/// Values substituted into alias templates.
#[derive(Debug, Clone)]
pub struct AliasContext<'a> {
    pub branch: &'a BranchName,
    pub upstream: &'a str,
}

impl AliasTemplate {
    /// Expand the template's placeholders.
    ///
    /// Unknown placeholders are left as written.
    pub fn render(&self, context: &AliasContext<'_>) -> Result<String> {
        let regex = Regex::new(PLACEHOLDER)?;
        let rendered = regex.replace_all(self.template, |caps: &Captures<'_>| match &caps[1] {
            "branch" => shell::quote(context.branch.as_str()),
            "upstream" => shell::quote(context.upstream),
            _ => caps[0].to_string(),
        });
        Ok(rendered.into_owned())
    }
}

/// The alias catalog, in installation order.
pub const CATALOG: &[AliasTemplate] = &[
    AliasTemplate {
        name: "upstream-status",
        description: "Commits ahead of and behind upstream",
        template: "!git fetch {upstream} && git rev-list --left-right --count {branch}...{upstream}/{branch}",
    },
    AliasTemplate {
        name: "upstream-sync",
        description: "Fast-forward the main branch to upstream",
        template: "!git fetch {upstream} && git checkout {branch} && git merge --ff-only {upstream}/{branch}",
    },
    AliasTemplate {
        name: "upstream-merge",
        description: "Merge upstream into the current branch",
        template: "!git fetch {upstream} && git merge {upstream}/{branch}",
    },
    AliasTemplate {
        name: "upstream-rebase",
        description: "Rebase the main branch onto upstream",
        template: "!git fetch {upstream} && git checkout {branch} && git rebase {upstream}/{branch}",
    },
    AliasTemplate {
        name: "feature-start",
        description: "Start a feature branch from upstream",
        template: "!f() { git fetch {upstream} && git checkout -b \"$1\" {upstream}/{branch}; }; f",
    },
    AliasTemplate {
        name: "feature-sync",
        description: "Rebase the current feature branch onto upstream",
        template: "!git fetch {upstream} && git rebase {upstream}/{branch}",
    },
    AliasTemplate {
        name: "feature-finish",
        description: "Merge the current feature branch into the main branch",
        template: "!f() { b=$(git rev-parse --abbrev-ref HEAD) && git checkout {branch} && git merge --no-ff \"$b\"; }; f",
    },
    AliasTemplate {
        name: "clean-merged",
        description: "Delete local branches merged into the main branch",
        template: "!git for-each-ref --merged={branch} --format='%(refname:short)' refs/heads/ | grep -vxF {branch} | xargs -r git branch -d",
    },
    AliasTemplate {
        name: "upstream-patches",
        description: "Write patch files for commits not in upstream",
        template: "!git format-patch -o upstream-patches {upstream}/{branch}..HEAD",
    },
    AliasTemplate {
        name: "upstream-diff",
        description: "Diff against upstream",
        template: "!git diff {upstream}/{branch}...HEAD",
    },
    AliasTemplate {
        name: "upstream-log",
        description: "Log of commits not in upstream",
        template: "!git log --oneline {upstream}/{branch}..HEAD",
    },
];

/// Render the whole catalog as `(alias, command)` pairs.
pub fn render_catalog(context: &AliasContext<'_>) -> Result<Vec<(&'static str, String)>> {
    CATALOG
        .iter()
        .map(|alias| Ok((alias.name, alias.render(context)?)))
        .collect()
}

/// The git config key of an alias.
pub fn config_key(name: &str) -> String {
    format!("alias.{}", name)
}
