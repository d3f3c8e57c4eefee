//! # Terminal Output
//!
//! Everything lime-dev prints to a terminal goes through this module:
//! per-repository report lines, status markers and headings.
//!
//! Report lines (`<id>: ok (...)` / `<id>: FAILED (...)`) are never styled,
//! so scripts can match them whatever `--color` says. Markers and headings
//! only decorate when [`OutputConfig::use_color`] is set, which follows
//! `--color` and, in `auto`, the usual `NO_COLOR`, `CLICOLOR`,
//! `CLICOLOR_FORCE` and `TERM=dumb` conventions.

use std::env;

use console::style;

use crate::report::{Outcome, RunReport};

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    /// Build from the `--color` value: `always`, `never` or `auto`.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => terminal_wants_color(),
        };
        Self { use_color }
    }

    /// The marker in front of a status or summary line.
    pub fn marker(&self, marker: Marker) -> &'static str {
        let (decorated, plain) = marker.glyphs();
        if self.use_color {
            decorated
        } else {
            plain
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

fn terminal_wants_color() -> bool {
    let set = |name: &str, value: &str| env::var(name).is_ok_and(|v| v == value);
    if env::var_os("NO_COLOR").is_some() || set("CLICOLOR", "0") {
        return false;
    }
    if env::var("CLICOLOR_FORCE").is_ok_and(|v| !v.is_empty() && v != "0") {
        return true;
    }
    !set("TERM", "dumb") && console::Term::stdout().features().colors_supported()
}

/// What a printed line is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Ok,
    Failed,
    Warning,
    /// Start of a configuration check.
    Check,
    /// A summary block follows.
    Summary,
    /// Overall verdict of a check.
    Verdict,
    Sync,
    Upstream,
    Status,
}

impl Marker {
    fn glyphs(self) -> (&'static str, &'static str) {
        match self {
            Marker::Ok => ("✅", "[OK]"),
            Marker::Failed => ("❌", "[ERR]"),
            Marker::Warning => ("⚠️", "[WARN]"),
            Marker::Check => ("🔍", "[SCAN]"),
            Marker::Summary => ("📊", "[INFO]"),
            Marker::Verdict => ("🎯", "[RESULT]"),
            Marker::Sync => ("🔄", "[SYNC]"),
            Marker::Upstream => ("🔗", "[UPSTREAM]"),
            Marker::Status => ("📊", "[STATUS]"),
        }
    }
}

/// Free-standing form of [`OutputConfig::marker`].
pub fn marker(config: &OutputConfig, marker: Marker) -> &'static str {
    config.marker(marker)
}

pub fn heading(config: &OutputConfig, text: &str) -> String {
    if config.use_color {
        style(text).bold().force_styling(true).to_string()
    } else {
        text.to_string()
    }
}

/// Secondary details, such as alias bodies or mode sources.
pub fn dim(config: &OutputConfig, text: &str) -> String {
    if config.use_color {
        style(text).dim().force_styling(true).to_string()
    } else {
        text.to_string()
    }
}

/// One unstyled line per repository, in report order.
///
/// An outcome that carries errors (a failed upstream step, say) is shown as
/// `FAILED` with its own description.
pub fn repository_lines<T: Outcome>(
    report: &RunReport<T>,
    describe: impl Fn(&T) -> String,
) -> Vec<String> {
    report
        .entries()
        .iter()
        .map(|entry| match &entry.result {
            Ok(outcome) if entry.is_ok() => format!("{}: ok ({})", entry.id, describe(outcome)),
            Ok(outcome) => format!("{}: FAILED ({})", entry.id, describe(outcome)),
            Err(e) => format!("{}: FAILED ({})", entry.id, e),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::report::RepoResult;

    #[derive(Debug)]
    struct Synced(&'static str);

    impl Outcome for Synced {}

    fn colored(use_color: bool) -> OutputConfig {
        OutputConfig { use_color }
    }

    #[test]
    fn test_color_flag() {
        assert!(OutputConfig::from_env_and_flag("always").use_color);
        assert!(!OutputConfig::from_env_and_flag("NEVER").use_color);
    }

    #[test]
    fn test_markers_fall_back_to_plain_tags() {
        assert_eq!(colored(false).marker(Marker::Failed), "[ERR]");
        assert_eq!(colored(true).marker(Marker::Failed), "❌");
        assert_eq!(marker(&colored(false), Marker::Sync), "[SYNC]");
    }

    #[test]
    fn test_heading_and_dim() {
        assert_eq!(heading(&colored(false), "Repositories"), "Repositories");
        assert!(heading(&colored(true), "Repositories").contains('\u{1b}'));
        assert!(dim(&colored(true), "x").contains('\u{1b}'));
    }

    #[test]
    fn test_repository_lines_are_plain() {
        let report = RunReport::new(vec![
            RepoResult::new("lime-app", Ok(Synced("main up to date"))),
            RepoResult::new(
                "openwrt",
                Err(Error::FetchFailed {
                    id: "openwrt".to_string(),
                    cause: "timeout".to_string(),
                }),
            ),
        ]);
        let lines = repository_lines(&report, |s| s.0.to_string());
        assert_eq!(
            lines,
            vec![
                "lime-app: ok (main up to date)".to_string(),
                "openwrt: FAILED (Fetch failed for openwrt: timeout)".to_string(),
            ]
        );
    }
}
