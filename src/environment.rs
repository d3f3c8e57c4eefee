//! Environment projection.
//!
//! Flattens the resolved configuration into the variable names external
//! build tooling reads. Projection is a pure function; exporting the result
//! into a process or a file is up to the caller.
//!
//! ## Variables
//!
//! | Name | Value |
//! |------|-------|
//! | `LIME_DEV_ROOT` | workspace root |
//! | `LIME_REPOS_DIR` | repositories root |
//! | `LIME_BUILD_DIR`, `LIME_CACHE_DIR`, `LIME_LOG_DIR`, `LIME_TOOLS_DIR` | workspace directories |
//! | `LIME_MODE` | active mode name |
//! | `LIME_RELEASE_MODE` | `true` in release mode, `false` otherwise |
//! | `<ID>_PATH`, `<ID>_URL`, `<ID>_BRANCH`, `<ID>_REMOTE` | per repository |
//! | `LIME_TARGET_<NAME>` | each build target |
//! | `LIME_BUILD_TARGET` | the `default` build target |
//! | `<NAME>_VERSION` | each firmware version |

use std::collections::BTreeMap;

use crate::mode::Mode;
use crate::path::{env_name, WorkspacePaths};
use crate::resolver::ResolvedRepository;

/// Name of the build target exported as `LIME_BUILD_TARGET`.
pub const DEFAULT_TARGET: &str = "default";

/// Project the resolved configuration into environment variables.
///
/// The map is ordered by name so rendering it is stable across runs.
pub fn project(
    resolved: &[ResolvedRepository],
    targets: &BTreeMap<String, String>,
    versions: &BTreeMap<String, String>,
    paths: &WorkspacePaths,
    mode: &Mode,
) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    let mut set = |name: String, value: String| {
        vars.insert(name, value);
    };

    let display = |p: std::path::PathBuf| p.display().to_string();
    set("LIME_DEV_ROOT".into(), paths.root().display().to_string());
    set("LIME_REPOS_DIR".into(), display(paths.repos_dir()));
    set("LIME_BUILD_DIR".into(), display(paths.build_dir()));
    set("LIME_CACHE_DIR".into(), display(paths.cache_dir()));
    set("LIME_LOG_DIR".into(), display(paths.log_dir()));
    set("LIME_TOOLS_DIR".into(), display(paths.tools_dir()));
    set("LIME_MODE".into(), mode.name().to_string());
    set("LIME_RELEASE_MODE".into(), mode.is_release().to_string());

    for repo in resolved {
        let prefix = env_name(&repo.id);
        set(format!("{}_PATH", prefix), display(paths.repo_path(&repo.id)));
        set(format!("{}_URL", prefix), repo.url.clone());
        set(format!("{}_BRANCH", prefix), repo.branch.clone());
        set(format!("{}_REMOTE", prefix), repo.remote.clone());
    }

    for (name, target) in targets {
        set(format!("LIME_TARGET_{}", env_name(name)), target.clone());
        if name == DEFAULT_TARGET {
            set("LIME_BUILD_TARGET".into(), target.clone());
        }
    }

    for (name, version) in versions {
        set(version_var(name), version.clone());
    }

    vars
}

/// `openwrt` and `openwrt_version` both become `OPENWRT_VERSION`.
fn version_var(name: &str) -> String {
    let base = env_name(name);
    if base.ends_with("_VERSION") {
        base
    } else {
        format!("{}_VERSION", base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(id: &str, branch: &str) -> ResolvedRepository {
        ResolvedRepository {
            id: id.to_string(),
            url: format!("https://host/{}.git", id),
            branch: branch.to_string(),
            remote: "origin".to_string(),
        }
    }

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_project_paths_and_mode() {
        let paths = WorkspacePaths::new("/work");
        let vars = project(&[], &BTreeMap::new(), &BTreeMap::new(), &paths, &Mode::Default);
        assert_eq!(vars["LIME_DEV_ROOT"], "/work");
        assert_eq!(vars["LIME_REPOS_DIR"], "/work/repos");
        assert_eq!(vars["LIME_BUILD_DIR"], "/work/build");
        assert_eq!(vars["LIME_MODE"], "default");
        assert_eq!(vars["LIME_RELEASE_MODE"], "false");
    }

    #[test]
    fn test_project_release_flag() {
        let paths = WorkspacePaths::new("/work");
        let vars = project(&[], &BTreeMap::new(), &BTreeMap::new(), &paths, &Mode::release());
        assert_eq!(vars["LIME_MODE"], "release");
        assert_eq!(vars["LIME_RELEASE_MODE"], "true");
    }

    #[test]
    fn test_project_repositories() {
        let paths = WorkspacePaths::new("/work");
        let repos = vec![repo("lime-app", "master"), repo("openwrt", "openwrt-24.10")];
        let vars = project(&repos, &BTreeMap::new(), &BTreeMap::new(), &paths, &Mode::Default);
        assert_eq!(vars["LIME_APP_PATH"], "/work/repos/lime-app");
        assert_eq!(vars["LIME_APP_BRANCH"], "master");
        assert_eq!(vars["OPENWRT_URL"], "https://host/openwrt.git");
        assert_eq!(vars["OPENWRT_REMOTE"], "origin");
    }

    #[test]
    fn test_project_targets_and_versions() {
        let paths = WorkspacePaths::new("/work");
        let targets = map(&[("default", "x86_64"), ("multi", "ath79_generic")]);
        let versions = map(&[("openwrt_version", "24.10.1"), ("libremesh", "2024.1")]);
        let vars = project(&[], &targets, &versions, &paths, &Mode::Default);
        assert_eq!(vars["LIME_TARGET_DEFAULT"], "x86_64");
        assert_eq!(vars["LIME_TARGET_MULTI"], "ath79_generic");
        assert_eq!(vars["LIME_BUILD_TARGET"], "x86_64");
        assert_eq!(vars["OPENWRT_VERSION"], "24.10.1");
        assert_eq!(vars["LIBREMESH_VERSION"], "2024.1");
    }

    #[test]
    fn test_no_build_target_without_default() {
        let paths = WorkspacePaths::new("/work");
        let targets = map(&[("multi", "ath79_generic")]);
        let vars = project(&[], &targets, &BTreeMap::new(), &paths, &Mode::Default);
        assert!(!vars.contains_key("LIME_BUILD_TARGET"));
    }

    #[test]
    fn test_projection_is_pure() {
        let paths = WorkspacePaths::new("/work");
        let repos = vec![repo("lime-app", "master")];
        let targets = map(&[("default", "x86_64")]);
        let a = project(&repos, &targets, &BTreeMap::new(), &paths, &Mode::release());
        let b = project(&repos, &targets, &BTreeMap::new(), &paths, &Mode::release());
        assert_eq!(a, b);
    }
}
