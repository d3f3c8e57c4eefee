//! Aggregate run reports.
//!
//! Per-repository failures never stop a run. Each repository ends up as one
//! [`RepoResult`] in a [`RunReport`], which decides the exit status and
//! renders the itemized failure list.

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{Error, Result};

/// An outcome that may carry failures of its own sub-steps.
pub trait Outcome {
    /// Errors hidden inside an otherwise successful outcome.
    fn errors(&self) -> Vec<&Error> {
        Vec::new()
    }
}

/// The result of processing one repository.
#[derive(Debug)]
pub struct RepoResult<T> {
    pub id: String,
    pub result: Result<T>,
}

impl<T: Outcome> RepoResult<T> {
    pub fn new(id: impl Into<String>, result: Result<T>) -> Self {
        Self {
            id: id.into(),
            result,
        }
    }

    /// Every error attributed to this repository.
    pub fn errors(&self) -> Vec<&Error> {
        match &self.result {
            Ok(outcome) => outcome.errors(),
            Err(e) => vec![e],
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors().is_empty()
    }
}

/// Results of one run over a set of repositories, in processing order.
#[derive(Debug)]
pub struct RunReport<T> {
    entries: Vec<RepoResult<T>>,
}

impl<T: Outcome> RunReport<T> {
    pub fn new(entries: Vec<RepoResult<T>>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[RepoResult<T>] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&RepoResult<T>> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// `(id, error)` for every failure, in processing order.
    pub fn failures(&self) -> Vec<(&str, &Error)> {
        self.entries
            .iter()
            .flat_map(|entry| {
                entry
                    .errors()
                    .into_iter()
                    .map(move |e| (entry.id.as_str(), e))
            })
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.entries.iter().any(|e| !e.is_ok())
    }

    /// 0 when every repository succeeded, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        i32::from(self.has_failures())
    }

    /// Human-readable list of failed repositories and why.
    pub fn failure_summary(&self) -> String {
        let failures = self.failures();
        if failures.is_empty() {
            return String::new();
        }
        let mut out = format!(
            "{} of {} repositories failed:\n",
            self.entries.iter().filter(|e| !e.is_ok()).count(),
            self.entries.len()
        );
        for (id, error) in failures {
            out.push_str(&format!("  - {}: {}\n", id, error));
        }
        out
    }
}

impl<T: Outcome + Serialize> RunReport<T> {
    /// One JSON object per repository.
    pub fn to_json(&self) -> Value {
        let repos: Vec<Value> = self
            .entries
            .iter()
            .map(|entry| {
                let errors: Vec<Value> = entry
                    .errors()
                    .into_iter()
                    .map(|e| json!({ "kind": e.kind(), "message": e.to_string() }))
                    .collect();
                let outcome = match &entry.result {
                    Ok(outcome) => serde_json::to_value(outcome).unwrap_or(Value::Null),
                    Err(_) => Value::Null,
                };
                json!({
                    "id": entry.id,
                    "ok": entry.is_ok(),
                    "outcome": outcome,
                    "errors": errors,
                })
            })
            .collect();
        json!({ "ok": !self.has_failures(), "repositories": repos })
    }
}
