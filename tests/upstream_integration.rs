//! Integration tests for upstream workflow provisioning against real git.

mod common;

use std::fs;

use common::{git, BareRemote};
use lime_dev::cancel::CancellationToken;
use lime_dev::config;
use lime_dev::path::WorkspacePaths;
use lime_dev::resolver::ResolvedRepository;
use lime_dev::synchronizer::RepositorySynchronizer;
use lime_dev::upstream::hooks::HOOK_MARKER;
use lime_dev::upstream::{Step, StepOutcome, UpstreamOptions, UpstreamWorkflowManager};

struct Workspace {
    root: assert_fs::TempDir,
    origin: BareRemote,
    upstream: BareRemote,
}

impl Workspace {
    /// A workspace with `lime-app` cloned from `origin`.
    fn cloned() -> Self {
        let workspace = Self {
            root: assert_fs::TempDir::new().unwrap(),
            origin: BareRemote::new(),
            upstream: BareRemote::new(),
        };
        let sync = RepositorySynchronizer::new(workspace.paths());
        sync.ensure(
            &workspace.resolved(),
            &workspace.paths().repo_path("lime-app"),
            &CancellationToken::new(),
        )
        .unwrap();
        workspace
    }

    fn paths(&self) -> WorkspacePaths {
        WorkspacePaths::new(self.root.path())
    }

    fn resolved(&self) -> ResolvedRepository {
        ResolvedRepository {
            id: "lime-app".to_string(),
            url: self.origin.url(),
            branch: "main".to_string(),
            remote: "origin".to_string(),
        }
    }

    fn config(&self) -> config::ConfigModel {
        config::parse(&format!(
            "[repositories]\n\
             lime-app={}|main|origin\n\
             [upstream_remotes]\n\
             lime-app={}|main\n\
             [upstream_exclusions]\n\
             lime-app=dev.sh,.vscode/\n",
            self.origin.url(),
            self.upstream.url()
        ))
        .unwrap()
    }
}

fn options() -> UpstreamOptions {
    UpstreamOptions {
        force_hook: false,
        no_fetch: false,
        cancel: CancellationToken::new(),
    }
}

#[test]
fn test_provision_configures_repository() {
    let ws = Workspace::cloned();
    let model = ws.config();
    let manager = UpstreamWorkflowManager::new(ws.paths(), &model);
    let repo = ws.paths().repo_path("lime-app");

    let outcome = manager.provision(&ws.resolved(), &options()).unwrap();
    for step in &outcome.steps {
        assert!(
            matches!(step.result, Ok(StepOutcome::Updated(_))),
            "{}",
            step.describe()
        );
    }

    assert_eq!(git(&repo, &["remote", "get-url", "upstream"]), ws.upstream.url());
    assert_eq!(
        git(&repo, &["rev-parse", "refs/remotes/upstream/main"]),
        ws.upstream.head("main")
    );
    assert_eq!(
        git(&repo, &["config", "--get", "alias.upstream-sync"]),
        "!git fetch upstream && git checkout main && git merge --ff-only upstream/main"
    );

    let hook = repo.join(".git/hooks/pre-commit");
    assert!(fs::read_to_string(&hook).unwrap().contains(HOOK_MARKER));
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&hook).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    let exclusions = fs::read_to_string(ws.paths().exclusion_file("lime-app")).unwrap();
    let patterns: Vec<&str> = exclusions
        .lines()
        .filter(|l| !l.starts_with('#') && !l.is_empty())
        .collect();
    assert_eq!(patterns, vec!["dev.sh", ".vscode/"]);
}

#[test]
fn test_second_provision_is_unchanged() {
    let ws = Workspace::cloned();
    let model = ws.config();
    let manager = UpstreamWorkflowManager::new(ws.paths(), &model);

    manager.provision(&ws.resolved(), &options()).unwrap();
    let again = manager.provision(&ws.resolved(), &options()).unwrap();
    for step in &again.steps {
        assert_eq!(
            step.result.as_ref().ok(),
            Some(&StepOutcome::Unchanged),
            "{}",
            step.describe()
        );
    }
}

#[test]
fn test_foreign_hook_needs_force() {
    let ws = Workspace::cloned();
    let model = ws.config();
    let manager = UpstreamWorkflowManager::new(ws.paths(), &model);
    let hook = ws.paths().repo_path("lime-app").join(".git/hooks/pre-commit");
    fs::write(&hook, "#!/bin/sh\necho mine\n").unwrap();

    let outcome = manager.provision(&ws.resolved(), &options()).unwrap();
    assert!(outcome.step(Step::Hook).unwrap().result.is_err());
    // The other steps still ran.
    assert!(outcome.step(Step::Aliases).unwrap().result.is_ok());
    assert_eq!(fs::read_to_string(&hook).unwrap(), "#!/bin/sh\necho mine\n");

    let forced = UpstreamOptions {
        force_hook: true,
        ..options()
    };
    let outcome = manager.provision(&ws.resolved(), &forced).unwrap();
    assert!(outcome.step(Step::Hook).unwrap().result.is_ok());
    assert!(fs::read_to_string(&hook).unwrap().contains(HOOK_MARKER));
    assert_eq!(
        fs::read_to_string(hook.with_file_name("pre-commit.backup")).unwrap(),
        "#!/bin/sh\necho mine\n"
    );
}

#[test]
fn test_absent_repository_is_skipped() {
    let root = assert_fs::TempDir::new().unwrap();
    let model = config::parse("[repositories]\nlime-app=https://example.org/a.git|main|origin\n")
        .unwrap();
    let manager = UpstreamWorkflowManager::new(WorkspacePaths::new(root.path()), &model);
    let resolved = ResolvedRepository {
        id: "lime-app".to_string(),
        url: "https://example.org/a.git".to_string(),
        branch: "main".to_string(),
        remote: "origin".to_string(),
    };

    let outcome = manager.provision(&resolved, &options()).unwrap();
    assert!(outcome
        .steps
        .iter()
        .all(|s| matches!(s.result, Ok(StepOutcome::Skipped(_)))));
    assert!(!root.path().join("tools").exists());
}
