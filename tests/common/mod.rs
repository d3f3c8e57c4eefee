//! Shared test utilities for integration and E2E tests.
//!
//! This module provides a workspace fixture, local "remote" repositories
//! backed by bare git repos, and config snippets, so tests exercise real git
//! without touching the network.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let remote = BareRemote::new();
//!     let fixture = TestFixture::new().with_config(&configs::single("lime-app", &remote.url(), "main"));
//!     fixture.command().arg("setup").assert().success();
//! }
//! ```

#![allow(dead_code)]

use assert_fs::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    #[allow(unused_imports)]
    pub use super::{git, BareRemote};
    #[allow(unused_imports)]
    pub use super::TestFixture;
}

/// Common configuration snippets for testing.
#[allow(dead_code)]
pub mod configs {
    /// A configuration with a single repository and a release override.
    pub const MINIMAL: &str = "\
[repositories]
lime-app=https://github.com/libremesh/lime-app.git|develop|origin

[release_overrides]
lime-app=|v2024.1|

[build_targets]
default=x86_64
multi=ath79_generic
";

    /// A configuration that does not parse.
    pub const INVALID: &str = "\
[repositories]
lime-app=https://github.com/libremesh/lime-app.git
";

    /// A configuration whose override names an undeclared repository.
    pub const DANGLING_OVERRIDE: &str = "\
[repositories]
lime-app=https://github.com/libremesh/lime-app.git|develop|origin

[release_overrides]
ghost=https://example.org/ghost.git|main|origin
";

    /// One repository at `url` tracking `branch` on `origin`.
    pub fn single(id: &str, url: &str, branch: &str) -> String {
        format!("[repositories]\n{}={}|{}|origin\n", id, url, branch)
    }
}

/// Run git in `dir` with a fixed identity and return trimmed stdout.
///
/// Panics with git's stderr when the command fails.
#[allow(dead_code)]
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args([
            "-c",
            "user.name=Lime Tester",
            "-c",
            "user.email=tester@example.org",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {} failed in {}: {}",
        args.join(" "),
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A bare repository standing in for a hosted remote, plus a scratch clone
/// used to push new commits to it.
///
/// The remote starts with one commit on `main`.
#[allow(dead_code)]
pub struct BareRemote {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl BareRemote {
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        let bare = temp_dir.path().join("remote.git");
        let work = temp_dir.path().join("work");
        fs::create_dir_all(&bare).expect("Failed to create bare dir");
        fs::create_dir_all(&work).expect("Failed to create work dir");

        git(&bare, &["init", "--quiet", "--bare"]);
        git(&work, &["init", "--quiet"]);
        git(&work, &["checkout", "--quiet", "-b", "main"]);
        fs::write(work.join("README.md"), "# remote\n").expect("Failed to write README");
        git(&work, &["add", "README.md"]);
        git(&work, &["commit", "--quiet", "-m", "Initial commit"]);
        git(&work, &["remote", "add", "origin", &bare.to_string_lossy()]);
        git(&work, &["push", "--quiet", "origin", "main"]);
        git(&bare, &["symbolic-ref", "HEAD", "refs/heads/main"]);

        Self { temp_dir }
    }

    /// URL to clone from.
    pub fn url(&self) -> String {
        self.bare_path().to_string_lossy().into_owned()
    }

    pub fn bare_path(&self) -> PathBuf {
        self.temp_dir.path().join("remote.git")
    }

    fn work_path(&self) -> PathBuf {
        self.temp_dir.path().join("work")
    }

    /// Create `branch` from `main` and push it.
    pub fn branch(&self, branch: &str) {
        let work = self.work_path();
        git(&work, &["checkout", "--quiet", "-b", branch, "main"]);
        git(&work, &["push", "--quiet", "origin", branch]);
    }

    /// Commit `content` to `file` on `branch`, push, and return the new tip.
    pub fn commit(&self, branch: &str, file: &str, content: &str) -> String {
        let work = self.work_path();
        git(&work, &["checkout", "--quiet", branch]);
        fs::write(work.join(file), content).expect("Failed to write file");
        git(&work, &["add", file]);
        git(&work, &["commit", "--quiet", "-m", &format!("Update {}", file)]);
        git(&work, &["push", "--quiet", "origin", branch]);
        self.head(branch)
    }

    /// Tag the current tip of `main` as `name`, push the tag, and return
    /// the tagged commit.
    pub fn tag(&self, name: &str) -> String {
        let work = self.work_path();
        git(&work, &["checkout", "--quiet", "main"]);
        git(&work, &["tag", name]);
        git(&work, &["push", "--quiet", "origin", name]);
        git(&work, &["rev-parse", "HEAD"])
    }

    /// Tip of `branch` in the bare repository.
    pub fn head(&self, branch: &str) -> String {
        git(&self.bare_path(), &["rev-parse", &format!("refs/heads/{}", branch)])
    }
}

impl Default for BareRemote {
    fn default() -> Self {
        Self::new()
    }
}

/// A temporary workspace root with an optional `configs/versions.conf`.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::new().with_config(configs::MINIMAL);
/// fixture.command().arg("validate").assert().success();
/// ```
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write `configs/versions.conf` with the given content.
    pub fn with_config(self, content: &str) -> Self {
        self.temp_dir
            .child("configs/versions.conf")
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    /// Add the minimal valid configuration.
    #[allow(dead_code)]
    pub fn with_minimal_config(self) -> Self {
        self.with_config(configs::MINIMAL)
    }

    /// Add a file with the given path and content.
    #[allow(dead_code)]
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Workspace root.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the path to the config file.
    #[allow(dead_code)]
    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join("configs/versions.conf")
    }

    /// Checkout location of repository `id`.
    #[allow(dead_code)]
    pub fn repo_path(&self, id: &str) -> PathBuf {
        self.temp_dir.path().join("repos").join(id)
    }

    /// Create a child path in the temp directory.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Create a command rooted at this fixture, with ambient lime-dev
    /// variables cleared so the host environment cannot leak in.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("lime-dev");
        cmd.current_dir(self.path())
            .env_remove("LIME_RELEASE_MODE")
            .env_remove("LIME_DEV_CONFIG")
            .env_remove("RUST_LOG")
            .env("GIT_TERMINAL_PROMPT", "0")
            .arg("--root")
            .arg(self.path())
            .arg("--color")
            .arg("never");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_with_config() {
        let fixture = TestFixture::new().with_config(configs::MINIMAL);
        assert!(fixture.config_path().exists());
    }

    #[test]
    fn test_bare_remote_has_main() {
        let remote = BareRemote::new();
        assert_eq!(remote.head("main").len(), 40);
    }

    #[test]
    fn test_configs_are_readable_ini() {
        // The workspace config must stay readable by generic INI tooling.
        for content in [configs::MINIMAL, configs::DANGLING_OVERRIDE] {
            let ini = ini::Ini::load_from_str(content).expect("Config should be valid INI");
            let repos = ini.section(Some("repositories")).expect("repositories section");
            assert!(repos.get("lime-app").is_some());
        }
    }
}
