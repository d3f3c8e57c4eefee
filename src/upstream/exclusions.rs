//! Exclusion rules: files that must never reach an upstream submission.
//!
//! The built-in catalog maps repository identifiers to glob patterns. The
//! `[upstream_exclusions]` configuration section replaces a catalog entry
//! wholesale, and identifiers known to neither fall back to
//! [`COMMON_PATTERNS`].

use crate::config::ConfigModel;

/// Patterns excluded from every repository.
pub const COMMON_PATTERNS: &[&str] = &[
    ".vscode/",
    ".idea/",
    "*.swp",
    "*~",
    ".DS_Store",
    "*.local",
    ".env*",
    "CLAUDE.md",
    "NOTES.md",
    "TODO.local.md",
];

const LIME_APP: &[&str] = &[
    "node_modules/",
    "build/",
    ".cache/",
    "coverage/",
    "dev-scripts/",
    "*.dev.config.js",
    "preact.config.local.js",
];

const LIME_PACKAGES: &[&str] = &[
    "dev-scripts/",
    "tools/local/",
    "*.orig",
    "*.rej",
    "packages/*/files/etc/config/*.local",
];

const OPENWRT: &[&str] = &[
    "bin/",
    "build_dir/",
    "staging_dir/",
    "tmp/",
    "dl/",
    "feeds/",
    ".config",
    ".config.old",
    "feeds.conf",
];

const LIBREROUTEROS: &[&str] = &[
    "bin/",
    "build/",
    "dl/",
    "local.mk",
    "configs/*.local",
];

/// Built-in patterns for `id`, before any configuration override.
pub fn builtin(id: &str) -> Vec<String> {
    let specific: &[&str] = match id {
        "lime-app" => LIME_APP,
        "lime-packages" => LIME_PACKAGES,
        "openwrt" => OPENWRT,
        "librerouteros" => LIBREROUTEROS,
        _ => &[],
    };
    COMMON_PATTERNS
        .iter()
        .chain(specific)
        .map(|p| p.to_string())
        .collect()
}

/// The effective rule set for `id`.
pub fn rules_for(config: &ConfigModel, id: &str) -> Vec<String> {
    match config.exclusions_for(id) {
        Some(patterns) => patterns.to_vec(),
        None => builtin(id),
    }
}

/// Contents of the exclusion file for `id`.
pub fn render(id: &str, patterns: &[String]) -> String {
    let mut out = format!(
        "# Upstream exclusion rules for {}\n\
         # Generated by lime-dev; regenerated on every upstream provisioning run.\n\
         # Paths matching these patterns must not be part of upstream submissions.\n",
        id
    );
    for pattern in patterns {
        out.push_str(pattern);
        out.push('\n');
    }
    out
}
