//! # lime-dev Library
//!
//! This library provides the core of the `lime-dev` tool: configuration
//! resolution and multi-repository synchronization for a LibreMesh
//! development workspace. A workspace holds several independent git
//! repositories (`lime-app`, `lime-packages`, `librerouteros`, `openwrt`)
//! that must be cloned, pinned to configured branches and remotes, and kept
//! consistent with a single configuration file.
//!
//! ## Quick Example
//!
//! ```
//! use lime_dev::config;
//! use lime_dev::mode::Mode;
//! use lime_dev::resolver::OverrideResolver;
//!
//! let model = config::parse(
//!     "[repositories]\n\
//!      lime-app=https://github.com/libremesh/lime-app.git|develop|origin\n\
//!      [release_overrides]\n\
//!      lime-app=https://github.com/libremesh/lime-app.git|v2024.1|origin\n",
//! )
//! .unwrap();
//!
//! let resolver = OverrideResolver::new(&model);
//! assert_eq!(resolver.resolve("lime-app", &Mode::Default).unwrap().branch, "develop");
//! assert_eq!(resolver.resolve("lime-app", &Mode::release()).unwrap().branch, "v2024.1");
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: parses the section-based `versions.conf`
//!   into an immutable [`config::ConfigModel`].
//! - **Resolution (`resolver`, `mode`)**: merges base definitions with the
//!   override set of the active [`mode::Mode`].
//! - **Environment (`environment`)**: flattens resolved settings into the
//!   variables build tooling consumes.
//! - **Synchronization (`synchronizer`, `repository`, `git`)**: clones,
//!   fetches and fast-forwards repositories without ever discarding local
//!   work.
//! - **Upstream workflow (`upstream`)**: provisions the `upstream` remote,
//!   git aliases, exclusion rules and the pre-commit hook.
//!
//! ## Data Flow
//!
//! ```text
//! config ──▶ resolver ──┬──▶ environment
//!                       └──▶ synchronizer ──▶ upstream
//! ```
//!
//! Per-repository failures are collected into a [`report::RunReport`];
//! only configuration errors abort a run.

pub mod branch;
pub mod cancel;
pub mod config;
pub mod defaults;
pub mod environment;
pub mod error;
pub mod filesystem;
pub mod git;
pub mod lock;
pub mod mode;
pub mod output;
pub mod path;
pub mod report;
pub mod repository;
pub mod resolver;
pub mod shell;
pub mod synchronizer;
pub mod upstream;
