//! End-to-end tests for the `env` command.

mod common;
use common::prelude::*;

#[test]
fn test_env_shell_default_mode() {
    let fixture = TestFixture::new().with_minimal_config();

    fixture
        .command()
        .arg("env")
        .assert()
        .success()
        .stdout(predicate::str::contains("export LIME_MODE=default"))
        .stdout(predicate::str::contains("export LIME_RELEASE_MODE=false"))
        .stdout(predicate::str::contains("export LIME_APP_BRANCH=develop"))
        .stdout(predicate::str::contains(
            "export LIME_APP_URL=https://github.com/libremesh/lime-app.git",
        ))
        .stdout(predicate::str::contains("export LIME_BUILD_TARGET=x86_64"))
        .stdout(predicate::str::contains("export LIME_TARGET_MULTI=ath79_generic"));
}

#[test]
fn test_env_release_activation_from_environment() {
    let fixture = TestFixture::new().with_minimal_config();

    fixture
        .command()
        .env("LIME_RELEASE_MODE", "true")
        .arg("env")
        .assert()
        .success()
        .stdout(predicate::str::contains("export LIME_MODE=release"))
        .stdout(predicate::str::contains("export LIME_RELEASE_MODE=true"))
        .stdout(predicate::str::contains("export LIME_APP_BRANCH=v2024.1"));
}

#[test]
fn test_env_other_activation_values_mean_default() {
    let fixture = TestFixture::new().with_minimal_config();

    fixture
        .command()
        .env("LIME_RELEASE_MODE", "1")
        .arg("env")
        .assert()
        .success()
        .stdout(predicate::str::contains("export LIME_APP_BRANCH=develop"));
}

#[test]
fn test_env_mode_flag_wins_over_environment() {
    let fixture = TestFixture::new().with_minimal_config();

    fixture
        .command()
        .env("LIME_RELEASE_MODE", "true")
        .args(["env", "--mode", "default"])
        .assert()
        .success()
        .stdout(predicate::str::contains("export LIME_MODE=default"));
}

#[test]
fn test_env_json() {
    let fixture = TestFixture::new().with_minimal_config();

    let output = fixture
        .command()
        .args(["env", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let vars: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(vars["LIME_APP_BRANCH"], "develop");
    assert_eq!(
        vars["LIME_APP_PATH"],
        fixture.repo_path("lime-app").display().to_string()
    );
    assert_eq!(
        vars["LIME_DEV_ROOT"],
        fixture.path().display().to_string()
    );
}
