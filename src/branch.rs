//! Validated branch names.
//!
//! Branch names come from the configuration file and end up both as git
//! arguments and inside shell alias bodies. [`BranchName`] only admits a
//! conservative subset of what `git check-ref-format` allows, none of which
//! needs shell quoting.

use std::fmt;

use regex::Regex;

use crate::error::{Error, Result};

const ALLOWED: &str = r"^[A-Za-z0-9][A-Za-z0-9._/-]*$";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchName(String);

impl BranchName {
    pub fn parse(name: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidBranchName {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("empty"));
        }
        if !Regex::new(ALLOWED)?.is_match(name) {
            return Err(invalid(
                "only letters, digits, '.', '_', '-' and '/' are allowed, starting with a letter or digit",
            ));
        }
        if name.contains("..") || name.contains("//") || name.contains("/.") {
            return Err(invalid("contains '..', '//' or a component starting with '.'"));
        }
        if name.ends_with('/') || name.ends_with('.') || name.ends_with(".lock") {
            return Err(invalid("ends with '/', '.' or '.lock'"));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
