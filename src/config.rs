//! # Configuration Model and Parsing
//!
//! This module defines the in-memory model of the workspace configuration
//! file (`configs/versions.conf` by default) and the parser that builds it.
//!
//! ## Format
//!
//! The file is INI-like: `[section]` headers followed by `key=value` lines.
//! Lines starting with `#` or `;` are comments, blank lines are ignored and a
//! ` #` preceded by whitespace starts a trailing comment.
//!
//! ```text
//! [repositories]
//! lime-app=https://github.com/libremesh/lime-app.git|master|origin
//! openwrt=https://git.openwrt.org/openwrt/openwrt.git|openwrt-24.10|origin
//!
//! [release_overrides]
//! lime-app=https://github.com/libremesh/lime-app.git|v0.2.27|
//!
//! [build_targets]
//! default=x86_64
//! ```
//!
//! ## Sections
//!
//! - **`repositories`**: `id=url|branch|remote`, all three fields required.
//! - **`<mode>_overrides`**: same shape, empty fields keep the base value.
//!   `release_overrides` backs the `release` mode; any other prefix defines a
//!   further named mode.
//! - **`build_targets`**, **`firmware_versions`**, **`system_requirements`**,
//!   **`qemu_config`**: plain `key=value` maps.
//! - **`upstream_remotes`**: `id=url` or `id=url|branch`, the public project
//!   a repository contributes back to.
//! - **`upstream_exclusions`**: `id=pattern,pattern,...`, replacing the
//!   built-in exclusion catalog for that repository.
//!
//! Any other section is kept verbatim so newer files still load. A malformed
//! line inside a recognized section fails the whole load; no partial model is
//! returned.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::mode::{Mode, RELEASE};

const REPOSITORIES: &str = "repositories";
const OVERRIDES_SUFFIX: &str = "_overrides";
const BUILD_TARGETS: &str = "build_targets";
const FIRMWARE_VERSIONS: &str = "firmware_versions";
const SYSTEM_REQUIREMENTS: &str = "system_requirements";
const QEMU_CONFIG: &str = "qemu_config";
const UPSTREAM_REMOTES: &str = "upstream_remotes";
const UPSTREAM_EXCLUSIONS: &str = "upstream_exclusions";

/// Shape of repository identifiers and remote names. Identifiers become
/// directory names under `repos/` and remote names become git arguments, so
/// neither may start with `.` or `-` nor contain a path separator.
const NAME_PATTERN: &str = r"^[A-Za-z0-9][A-Za-z0-9._-]*$";

/// Separator between the fields of a repository cell.
pub const FIELD_SEPARATOR: char = '|';

/// A repository as declared in `[repositories]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryDefinition {
    /// Unique key, also the directory name under the repositories root.
    pub id: String,
    pub url: String,
    pub branch: String,
    /// Name of the git remote the repository tracks (usually `origin`).
    pub remote: String,
}

/// A partial repository definition from an override section.
///
/// `None` fields keep the base value during resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepositoryOverride {
    pub url: Option<String>,
    pub branch: Option<String>,
    pub remote: Option<String>,
}

/// The public upstream project of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpstreamDefinition {
    pub url: String,
    /// Main branch of the upstream project; falls back to the resolved branch.
    pub branch: Option<String>,
}

/// A section the parser does not know, kept as raw lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpaqueSection {
    pub name: String,
    pub lines: Vec<String>,
}

/// The parsed configuration.
///
/// Loaded once per run and read-only afterwards. Lookups return `Option`
/// since an undefined key is an expected condition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigModel {
    repositories: Vec<RepositoryDefinition>,
    overrides: BTreeMap<String, BTreeMap<String, RepositoryOverride>>,
    build_targets: BTreeMap<String, String>,
    versions: BTreeMap<String, String>,
    system_requirements: BTreeMap<String, String>,
    qemu_config: BTreeMap<String, String>,
    upstreams: BTreeMap<String, UpstreamDefinition>,
    exclusions: BTreeMap<String, Vec<String>>,
    opaque: Vec<OpaqueSection>,
}

impl ConfigModel {
    /// All repositories in declaration order.
    pub fn repositories(&self) -> &[RepositoryDefinition] {
        &self.repositories
    }

    pub fn repository_ids(&self) -> impl Iterator<Item = &str> {
        self.repositories.iter().map(|r| r.id.as_str())
    }

    pub fn get_repository(&self, id: &str) -> Option<&RepositoryDefinition> {
        self.repositories.iter().find(|r| r.id == id)
    }

    /// The release-mode override for `id`.
    pub fn get_override(&self, id: &str) -> Option<&RepositoryOverride> {
        self.overrides.get(RELEASE).and_then(|set| set.get(id))
    }

    /// The override for `id` under `mode`. Always `None` in default mode.
    pub fn get_override_for(&self, mode: &Mode, id: &str) -> Option<&RepositoryOverride> {
        match mode {
            Mode::Default => None,
            Mode::Named(name) => self.overrides.get(name).and_then(|set| set.get(id)),
        }
    }

    /// The override set of a named mode.
    pub fn overrides_for(&self, mode: &Mode) -> Option<&BTreeMap<String, RepositoryOverride>> {
        self.overrides.get(mode.name())
    }

    /// Names of every mode that has an override section.
    pub fn override_modes(&self) -> impl Iterator<Item = &str> {
        self.overrides.keys().map(String::as_str)
    }

    pub fn get_build_target(&self, name: &str) -> Option<&str> {
        self.build_targets.get(name).map(String::as_str)
    }

    pub fn build_targets(&self) -> &BTreeMap<String, String> {
        &self.build_targets
    }

    pub fn get_version(&self, name: &str) -> Option<&str> {
        self.versions.get(name).map(String::as_str)
    }

    pub fn versions(&self) -> &BTreeMap<String, String> {
        &self.versions
    }

    pub fn get_requirement(&self, name: &str) -> Option<&str> {
        self.system_requirements.get(name).map(String::as_str)
    }

    pub fn get_qemu_setting(&self, name: &str) -> Option<&str> {
        self.qemu_config.get(name).map(String::as_str)
    }

    /// Upstream declared in `[upstream_remotes]` for `id`.
    pub fn get_upstream(&self, id: &str) -> Option<&UpstreamDefinition> {
        self.upstreams.get(id)
    }

    /// Exclusion patterns declared in `[upstream_exclusions]` for `id`.
    pub fn exclusions_for(&self, id: &str) -> Option<&[String]> {
        self.exclusions.get(id).map(Vec::as_slice)
    }

    /// Identifiers with an `[upstream_remotes]` entry.
    pub fn upstream_ids(&self) -> impl Iterator<Item = &str> {
        self.upstreams.keys().map(String::as_str)
    }

    /// Identifiers with an `[upstream_exclusions]` entry.
    pub fn exclusion_ids(&self) -> impl Iterator<Item = &str> {
        self.exclusions.keys().map(String::as_str)
    }

    pub fn opaque_sections(&self) -> &[OpaqueSection] {
        &self.opaque
    }
}

/// Which part of the model the current section feeds.
enum Section {
    Repositories,
    Overrides(String),
    Map(MapSection),
    Upstreams,
    Exclusions,
    Opaque(usize),
}

#[derive(Clone, Copy)]
enum MapSection {
    BuildTargets,
    Versions,
    Requirements,
    Qemu,
}

impl Section {
    fn classify(name: &str, model: &mut ConfigModel) -> Self {
        match name {
            REPOSITORIES => Section::Repositories,
            BUILD_TARGETS => Section::Map(MapSection::BuildTargets),
            FIRMWARE_VERSIONS => Section::Map(MapSection::Versions),
            SYSTEM_REQUIREMENTS => Section::Map(MapSection::Requirements),
            QEMU_CONFIG => Section::Map(MapSection::Qemu),
            UPSTREAM_REMOTES => Section::Upstreams,
            UPSTREAM_EXCLUSIONS => Section::Exclusions,
            _ => match name.strip_suffix(OVERRIDES_SUFFIX) {
                Some(mode) if !mode.is_empty() => {
                    model.overrides.entry(mode.to_string()).or_default();
                    Section::Overrides(mode.to_string())
                }
                _ => {
                    let index = match model.opaque.iter().position(|s| s.name == name) {
                        Some(index) => index,
                        None => {
                            model.opaque.push(OpaqueSection {
                                name: name.to_string(),
                                lines: Vec::new(),
                            });
                            model.opaque.len() - 1
                        }
                    };
                    Section::Opaque(index)
                }
            },
        }
    }
}

/// Parse configuration text into a [`ConfigModel`].
pub fn parse(content: &str) -> Result<ConfigModel> {
    let mut model = ConfigModel::default();
    let mut current: Option<(String, Section)> = None;

    for (index, raw) in content.lines().enumerate() {
        let line_no = index + 1;
        let line = strip_comment(raw);
        if line.is_empty() {
            continue;
        }

        if line.starts_with('[') {
            let name = parse_header(line).ok_or_else(|| Error::ConfigParse {
                section: current
                    .as_ref()
                    .map(|(name, _)| name.clone())
                    .unwrap_or_default(),
                line: line_no,
                message: format!("invalid section header '{}'", line),
            })?;
            let section = Section::classify(&name, &mut model);
            current = Some((name, section));
            continue;
        }

        let Some((section_name, section)) = current.as_ref() else {
            return Err(Error::ConfigParse {
                section: String::new(),
                line: line_no,
                message: "entry outside of any section".to_string(),
            });
        };

        let entry = || split_entry(line, section_name, line_no);
        match section {
            Section::Opaque(index) => model.opaque[*index].lines.push(line.to_string()),
            Section::Repositories => {
                let (key, value) = entry()?;
                let definition = parse_repository(key, value, section_name, line_no)?;
                if model.get_repository(key).is_some() {
                    return Err(duplicate(section_name, line_no, key));
                }
                model.repositories.push(definition);
            }
            Section::Overrides(mode) => {
                let (key, value) = entry()?;
                let partial = parse_override(key, value, section_name, line_no)?;
                let set = model.overrides.entry(mode.clone()).or_default();
                if set.insert(key.to_string(), partial).is_some() {
                    return Err(duplicate(section_name, line_no, key));
                }
            }
            Section::Map(which) => {
                let (key, value) = entry()?;
                let map = match which {
                    MapSection::BuildTargets => &mut model.build_targets,
                    MapSection::Versions => &mut model.versions,
                    MapSection::Requirements => &mut model.system_requirements,
                    MapSection::Qemu => &mut model.qemu_config,
                };
                map.insert(key.to_string(), value.to_string());
            }
            Section::Upstreams => {
                let (key, value) = entry()?;
                check_name("repository id", key, section_name, line_no)?;
                let upstream = parse_upstream(value).ok_or_else(|| Error::ConfigParse {
                    section: section_name.clone(),
                    line: line_no,
                    message: format!("expected url or url|branch for '{}'", key),
                })?;
                model.upstreams.insert(key.to_string(), upstream);
            }
            Section::Exclusions => {
                let (key, value) = entry()?;
                check_name("repository id", key, section_name, line_no)?;
                let patterns = parse_patterns(value, section_name, line_no)?;
                model.exclusions.insert(key.to_string(), patterns);
            }
        }
    }

    Ok(model)
}

/// Read and parse a configuration file.
pub fn from_file(path: &Path) -> Result<ConfigModel> {
    let content = fs::read_to_string(path)?;
    parse(&content)
}

/// Trim a line and drop comments. Returns an empty string for comment lines.
fn strip_comment(line: &str) -> &str {
    let trimmed = line.trim();
    if trimmed.starts_with('#') || trimmed.starts_with(';') {
        return "";
    }

    let mut previous_is_space = false;
    for (pos, c) in trimmed.char_indices() {
        if c == '#' && previous_is_space {
            return trimmed[..pos].trim_end();
        }
        previous_is_space = c.is_whitespace();
    }
    trimmed
}

fn parse_header(line: &str) -> Option<String> {
    let name = line.strip_prefix('[')?.strip_suffix(']')?.trim();
    if name.is_empty() || name.contains(['[', ']']) {
        None
    } else {
        Some(name.to_string())
    }
}

fn split_entry<'a>(line: &'a str, section: &str, line_no: usize) -> Result<(&'a str, &'a str)> {
    let malformed = |message: String| Error::ConfigParse {
        section: section.to_string(),
        line: line_no,
        message,
    };

    let (key, value) = line
        .split_once('=')
        .ok_or_else(|| malformed(format!("expected key=value, found '{}'", line)))?;
    let (key, value) = (key.trim(), value.trim());

    if key.is_empty() {
        return Err(malformed("missing key before '='".to_string()));
    }
    if key.chars().any(char::is_whitespace) {
        return Err(malformed(format!("key '{}' contains whitespace", key)));
    }
    if value.is_empty() {
        return Err(malformed(format!("missing value for '{}'", key)));
    }
    Ok((key, value))
}

/// Split a cell into exactly three trimmed fields.
fn split_cell(value: &str) -> Option<[&str; 3]> {
    let fields: Vec<&str> = value.split(FIELD_SEPARATOR).map(str::trim).collect();
    match fields.as_slice() {
        [url, branch, remote] => Some([url, branch, remote]),
        _ => None,
    }
}

/// Reject a repository id or remote name outside [`NAME_PATTERN`].
fn check_name(what: &str, name: &str, section: &str, line_no: usize) -> Result<()> {
    if Regex::new(NAME_PATTERN)?.is_match(name) && !name.contains("..") {
        return Ok(());
    }
    Err(Error::ConfigParse {
        section: section.to_string(),
        line: line_no,
        message: format!(
            "invalid {} '{}': use letters, digits, '.', '_' and '-', starting with a letter or digit",
            what, name
        ),
    })
}

fn parse_repository(
    id: &str,
    value: &str,
    section: &str,
    line_no: usize,
) -> Result<RepositoryDefinition> {
    let malformed = || Error::MalformedRepositoryEntry {
        id: id.to_string(),
        line: line_no,
    };

    check_name("repository id", id, section, line_no)?;
    let [url, branch, remote] = split_cell(value).ok_or_else(malformed)?;
    if url.is_empty() || branch.is_empty() || remote.is_empty() {
        return Err(malformed());
    }
    check_name("remote name", remote, section, line_no)?;

    Ok(RepositoryDefinition {
        id: id.to_string(),
        url: url.to_string(),
        branch: branch.to_string(),
        remote: remote.to_string(),
    })
}

fn parse_override(
    id: &str,
    value: &str,
    section: &str,
    line_no: usize,
) -> Result<RepositoryOverride> {
    check_name("repository id", id, section, line_no)?;
    let [url, branch, remote] = split_cell(value).ok_or_else(|| Error::MalformedRepositoryEntry {
        id: id.to_string(),
        line: line_no,
    })?;

    if !remote.is_empty() {
        check_name("remote name", remote, section, line_no)?;
    }
    let field = |s: &str| (!s.is_empty()).then(|| s.to_string());
    Ok(RepositoryOverride {
        url: field(url),
        branch: field(branch),
        remote: field(remote),
    })
}

fn parse_upstream(value: &str) -> Option<UpstreamDefinition> {
    let mut fields = value.split(FIELD_SEPARATOR).map(str::trim);
    let url = fields.next().filter(|u| !u.is_empty())?;
    let branch = fields.next().filter(|b| !b.is_empty()).map(str::to_string);
    if fields.next().is_some() {
        return None;
    }
    Some(UpstreamDefinition {
        url: url.to_string(),
        branch,
    })
}

fn parse_patterns(value: &str, section: &str, line_no: usize) -> Result<Vec<String>> {
    let patterns: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();

    for pattern in &patterns {
        glob::Pattern::new(pattern.trim_end_matches('/')).map_err(|e| Error::ConfigParse {
            section: section.to_string(),
            line: line_no,
            message: format!("invalid glob pattern '{}': {}", pattern, e),
        })?;
    }

    if patterns.is_empty() {
        return Err(Error::ConfigParse {
            section: section.to_string(),
            line: line_no,
            message: "empty pattern list".to_string(),
        });
    }
    Ok(patterns)
}

fn duplicate(section: &str, line_no: usize, key: &str) -> Error {
    Error::ConfigParse {
        section: section.to_string(),
        line: line_no,
        message: format!("duplicate entry '{}'", key),
    }
}
