use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::types::ActionResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub step_number: usize,
    /// The action as the oracle phrased it.
    pub action_line: String,
    pub outcome: ActionResult,
}

/// What the agent has done so far in this run, oldest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionHistory {
    entries: Vec<HistoryEntry>,
}

impl ExecutionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, step_number: usize, action_line: impl Into<String>, outcome: ActionResult) {
        self.entries.push(HistoryEntry {
            step_number,
            action_line: action_line.into(),
            outcome,
        });
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Text form handed to the oracle.
    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return "No actions taken yet.".to_string();
        }
        let mut out = String::new();
        for entry in &self.entries {
            let (label, message) = match &entry.outcome {
                ActionResult::Success(m) => ("SUCCESS", m),
                ActionResult::Failure(m) => ("FAILED", m),
            };
            let _ = writeln!(
                out,
                "Step {}: {} -> {}: {}",
                entry.step_number, entry.action_line, label, message
            );
        }
        out
    }
}
