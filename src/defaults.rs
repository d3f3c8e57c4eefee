//! Default values for lime-dev configuration.
//!
//! This module provides centralized default names and locations used across
//! commands, ensuring consistency and avoiding duplication.

use std::env;
use std::path::PathBuf;

/// Configuration file, relative to the workspace root.
pub const CONFIG_FILE: &str = "configs/versions.conf";

/// Environment variable carrying the release activation signal.
pub const RELEASE_MODE_ENV: &str = "LIME_RELEASE_MODE";

/// Environment variable overriding the workspace root.
pub const ROOT_ENV: &str = "LIME_DEV_ROOT";

/// Environment variable overriding the configuration file.
pub const CONFIG_ENV: &str = "LIME_DEV_CONFIG";

/// Name of the remote pointing at the public upstream project.
pub const UPSTREAM_REMOTE: &str = "upstream";

/// Token in a commit message that marks it for upstream submission.
pub const UPSTREAM_MARKER: &str = "[upstream]";

/// Returns the default workspace root.
///
/// `LIME_DEV_ROOT` wins when set; otherwise the current directory is used,
/// falling back to `.` if it cannot be determined.
pub fn default_root() -> PathBuf {
    env::var_os(ROOT_ENV)
        .map(PathBuf::from)
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_default_root_honors_env() {
        env::set_var(ROOT_ENV, "/tmp/lime-workspace");
        assert_eq!(default_root(), PathBuf::from("/tmp/lime-workspace"));
        env::remove_var(ROOT_ENV);
    }

    #[test]
    #[serial]
    fn test_default_root_falls_back_to_cwd() {
        env::remove_var(ROOT_ENV);
        let root = default_root();
        assert!(
            root.is_absolute() || root == PathBuf::from("."),
            "Expected absolute path or fallback, got: {:?}",
            root
        );
    }
}
