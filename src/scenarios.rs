//! Scenario lookup table and the per-decision context block built from it.
//!
//! The table is the simulation's `scenarios.json`: a JSON array of `{id, subject}`
//! records. It is read fresh for every request and any problem with it only drops the
//! context block from the prompt.

use crate::request::{lenient_int, scalar_text, Decision, DecisionKind};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Subjects are cut to this many words in the context block
pub const MAX_SUBJECT_WORDS: usize = 10;

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("failed to read scenario table: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse scenario table: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("scenario table is not a JSON array")]
    NotAnArray,
}

/// Scenario subjects keyed by id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioTable {
    subjects: HashMap<i64, String>,
}

impl ScenarioTable {
    /// Read and parse a scenario table from disk
    pub async fn load(path: &Path) -> Result<Self, ScenarioError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json(&content)
    }

    /// Read the table for one request, logging and returning `None` on any failure
    pub async fn load_or_empty(path: &Path) -> Option<Self> {
        match Self::load(path).await {
            Ok(table) => Some(table),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "scenario context unavailable");
                None
            }
        }
    }

    /// Parse the table. Records without a usable id are skipped; a later record with the
    /// same id replaces the earlier one.
    pub fn from_json(content: &str) -> Result<Self, ScenarioError> {
        let value: Value = serde_json::from_str(content)?;
        let Value::Array(records) = value else {
            return Err(ScenarioError::NotAnArray);
        };

        let mut subjects = HashMap::new();
        for record in &records {
            let Some(id) = record.get("id").and_then(lenient_int) else {
                continue;
            };
            let subject = record
                .get("subject")
                .and_then(scalar_text)
                .map(|s| s.trim().to_string())
                .unwrap_or_default();
            subjects.insert(id, subject);
        }
        Ok(Self { subjects })
    }

    pub fn subject(&self, id: i64) -> Option<&str> {
        self.subjects.get(&id).map(String::as_str)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.subjects.len()
    }
}

/// First `max_words` whitespace-separated words, joined by single spaces
pub fn truncate_words(text: &str, max_words: usize) -> String {
    text.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the `id | subject | code` block, one line per decision in input order.
///
/// Without a table the block is empty. Decisions whose scenario is unknown still get a
/// line, with an empty subject.
pub fn build_scenario_context(decisions: &[Decision], table: Option<&ScenarioTable>) -> String {
    let Some(table) = table else {
        return String::new();
    };

    decisions
        .iter()
        .map(|decision| {
            let subject = decision
                .scenario_id
                .and_then(|id| table.subject(id))
                .unwrap_or("");
            let id = decision
                .scenario_id
                .map(|id| id.to_string())
                .unwrap_or_default();
            format!(
                "{} | {} | {}",
                id,
                truncate_words(subject, MAX_SUBJECT_WORDS),
                DecisionKind::code(decision.kind)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
