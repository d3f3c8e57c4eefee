//! # Validate Command Implementation
//!
//! This module implements the `validate` subcommand, which checks the
//! configuration file without touching any repository.
//!
//! ## Functionality
//!
//! - **Parsing**: the file must parse; any section or line error is fatal.
//! - **Branches**: every branch, base or overridden in any mode, must be a
//!   valid branch name.
//! - **References**: override, upstream and exclusion entries should name
//!   declared repositories (warning otherwise).
//! - **Environment names**: two identifiers must not project to the same
//!   environment variable prefix (warning).
//!
//! This command is a safe, read-only operation that does not modify any files.

use std::collections::BTreeMap;

use anyhow::Result;
use clap::Args;

use lime_dev::branch::BranchName;
use lime_dev::config::{self, ConfigModel};
use lime_dev::environment::DEFAULT_TARGET;
use lime_dev::mode::Mode;
use lime_dev::output::{marker, Marker, OutputConfig};
use lime_dev::path::env_name;
use lime_dev::resolver::OverrideResolver;

use super::Context;

/// Validate the configuration file
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Use strict validation (fail on warnings).
    #[arg(long)]
    pub strict: bool,
}

/// Findings of one validation pass.
#[derive(Debug, Default)]
struct Findings {
    errors: Vec<String>,
    warnings: Vec<String>,
}

/// Execute the `validate` command.
pub fn execute(args: ValidateArgs, ctx: &Context) -> Result<()> {
    let out = &ctx.output;
    let config_path = &ctx.config_path;
    println!(
        "{} Validating configuration: {}",
        marker(out, Marker::Check),
        config_path.display()
    );

    let model = match config::from_file(config_path) {
        Ok(model) => {
            println!(
                "{} Configuration file parsed successfully",
                marker(out, Marker::Ok)
            );
            model
        }
        Err(e) => {
            println!(
                "{} Configuration parsing failed: {}",
                marker(out, Marker::Failed),
                e
            );
            return Err(anyhow::anyhow!("Configuration parsing failed: {}", e));
        }
    };

    print_summary(&model, out);

    let findings = check(&model);
    println!();
    for error in &findings.errors {
        println!("{} {}", marker(out, Marker::Failed), error);
    }
    for warning in &findings.warnings {
        println!("{} {}", marker(out, Marker::Warning), warning);
    }

    println!("\n{} Validation Result:", marker(out, Marker::Verdict));

    if !findings.errors.is_empty() {
        println!(
            "{} Configuration has errors that must be fixed",
            marker(out, Marker::Failed)
        );
        return Err(anyhow::anyhow!("Configuration validation failed"));
    }

    if !findings.warnings.is_empty() && args.strict {
        println!(
            "{} Configuration has warnings (strict mode enabled)",
            marker(out, Marker::Failed)
        );
        return Err(anyhow::anyhow!(
            "Configuration validation failed in strict mode"
        ));
    }

    if findings.warnings.is_empty() {
        println!("{} Configuration is valid", marker(out, Marker::Ok));
    } else {
        println!(
            "{} Configuration is valid but has warnings",
            marker(out, Marker::Warning)
        );
    }
    Ok(())
}

fn print_summary(model: &ConfigModel, out: &OutputConfig) {
    let modes: Vec<&str> = model.override_modes().collect();
    println!("\n{} Configuration Summary:", marker(out, Marker::Summary));
    println!("   Repositories: {}", model.repositories().len());
    println!(
        "   Override modes: {}",
        if modes.is_empty() {
            "none".to_string()
        } else {
            modes.join(", ")
        }
    );
    println!("   Build targets: {}", model.build_targets().len());
    println!("   Firmware versions: {}", model.versions().len());
    if !model.opaque_sections().is_empty() {
        let names: Vec<&str> = model
            .opaque_sections()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        println!("   Other sections: {}", names.join(", "));
    }
}

fn check(model: &ConfigModel) -> Findings {
    let mut findings = Findings::default();
    let resolver = OverrideResolver::new(model);

    let mut modes = vec![Mode::Default];
    modes.extend(model.override_modes().map(Mode::named));

    for mode in &modes {
        for repo in resolver.resolve_all(mode) {
            if let Err(e) = BranchName::parse(&repo.branch) {
                findings
                    .errors
                    .push(format!("{} ({} mode): {}", repo.id, mode, e));
            }
        }
        for id in resolver.dangling_overrides(mode) {
            findings.warnings.push(format!(
                "[{}_overrides] entry '{}' does not name a declared repository",
                mode, id
            ));
        }
    }

    let mut prefixes: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for id in model.repository_ids() {
        prefixes.entry(env_name(id)).or_default().push(id);
    }
    for (prefix, ids) in prefixes.iter().filter(|(_, ids)| ids.len() > 1) {
        findings.warnings.push(format!(
            "repositories {} share the environment prefix {}_",
            ids.join(", "),
            prefix
        ));
    }

    let referenced = model
        .upstream_ids()
        .map(|id| ("upstream_remotes", id))
        .chain(model.exclusion_ids().map(|id| ("upstream_exclusions", id)));
    for (section, id) in referenced {
        if model.get_repository(id).is_none() {
            findings.warnings.push(format!(
                "[{}] entry '{}' does not name a declared repository",
                section, id
            ));
        }
    }

    if !model.build_targets().is_empty() && model.get_build_target(DEFAULT_TARGET).is_none() {
        findings.warnings.push(format!(
            "[build_targets] has no '{}' entry; LIME_BUILD_TARGET will be unset",
            DEFAULT_TARGET
        ));
    }

    findings
}
