//! Workspace layout and path naming helpers for lime-dev

use std::path::{Path, PathBuf};

/// The on-disk layout of a lime-dev workspace.
///
/// ```text
/// <root>/
///   configs/versions.conf
///   repos/<id>/                          one working tree per repository
///   repos/.locks/<id>.lock               per-repository lock files
///   build/ cache/ logs/
///   tools/upstream/exclusions/<id>.exclude
///   tools/upstream/validate-upstream.sh
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePaths {
    root: PathBuf,
}

impl WorkspacePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(crate::defaults::CONFIG_FILE)
    }

    pub fn repos_dir(&self) -> PathBuf {
        self.root.join("repos")
    }

    /// Working directory of a repository.
    pub fn repo_path(&self, id: &str) -> PathBuf {
        self.repos_dir().join(id)
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.repos_dir().join(".locks")
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root.join("build")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn tools_dir(&self) -> PathBuf {
        self.root.join("tools")
    }

    pub fn exclusions_dir(&self) -> PathBuf {
        self.tools_dir().join("upstream").join("exclusions")
    }

    /// Exclusion rule file of a repository.
    pub fn exclusion_file(&self, id: &str) -> PathBuf {
        self.exclusions_dir().join(format!("{}.exclude", id))
    }

    /// Validation script the upstream pre-commit hook invokes.
    pub fn validator_script(&self) -> PathBuf {
        self.tools_dir()
            .join("upstream")
            .join("validate-upstream.sh")
    }
}

/// Turn an identifier into an environment variable prefix.
///
/// `lime-app` becomes `LIME_APP`; anything that is not ASCII alphanumeric
/// becomes `_`, and a leading digit gets a `_` prefix.
pub fn env_name(id: &str) -> String {
    let mut name: String = id
        .chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() => c.to_ascii_uppercase(),
            _ => '_',
        })
        .collect();
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let paths = WorkspacePaths::new("/work");
        assert_eq!(paths.repo_path("lime-app"), PathBuf::from("/work/repos/lime-app"));
        assert_eq!(paths.locks_dir(), PathBuf::from("/work/repos/.locks"));
        assert_eq!(
            paths.exclusion_file("openwrt"),
            PathBuf::from("/work/tools/upstream/exclusions/openwrt.exclude")
        );
        assert_eq!(
            paths.config_file(),
            PathBuf::from("/work/configs/versions.conf")
        );
    }

    #[test]
    fn test_env_name() {
        assert_eq!(env_name("lime-app"), "LIME_APP");
        assert_eq!(env_name("openwrt"), "OPENWRT");
        assert_eq!(env_name("lime.packages"), "LIME_PACKAGES");
        assert_eq!(env_name("24ch"), "_24CH");
    }
}
