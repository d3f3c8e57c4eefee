//! Override activation mode.
//!
//! A [`Mode`] names the override set that applies during resolution. It is
//! always passed explicitly into the resolver; nothing in the library reads
//! it from process-wide state except [`Mode::from_env`], which only the
//! binary calls.

use std::env;
use std::fmt;

use crate::defaults::RELEASE_MODE_ENV;

/// Name of the mode selected by the release activation signal.
pub const RELEASE: &str = "release";

/// Name of the mode that applies no overrides.
pub const DEFAULT: &str = "default";

/// The active override mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Base repository definitions only.
    #[default]
    Default,
    /// Apply the `<name>_overrides` section on top of the base definitions.
    Named(String),
}

impl Mode {
    /// The release mode, backed by the `[release_overrides]` section.
    pub fn release() -> Self {
        Mode::Named(RELEASE.to_string())
    }

    /// Build a mode from its name; `default` and the empty string map to
    /// [`Mode::Default`].
    pub fn named(name: &str) -> Self {
        let name = name.trim();
        if name.is_empty() || name == DEFAULT {
            Mode::Default
        } else {
            Mode::Named(name.to_string())
        }
    }

    /// Interpret the value of the release activation signal.
    ///
    /// Only the token `true` (case-insensitive) selects release mode; an
    /// absent variable or any other value means default mode.
    pub fn from_activation_value(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("true") => Mode::release(),
            _ => Mode::Default,
        }
    }

    /// Read the activation signal from `LIME_RELEASE_MODE`.
    pub fn from_env() -> Self {
        Self::from_activation_value(env::var(RELEASE_MODE_ENV).ok().as_deref())
    }

    /// The mode's name (`default` for [`Mode::Default`]).
    pub fn name(&self) -> &str {
        match self {
            Mode::Default => DEFAULT,
            Mode::Named(name) => name,
        }
    }

    pub fn is_release(&self) -> bool {
        self.name() == RELEASE
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Mode::Default)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
