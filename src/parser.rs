//! Turning a decision-oracle reply into something executable.

use serde::Deserialize;

use crate::types::{self, ActionKind, Step};

const DEFAULT_REASONING: &str = "No reasoning provided";

/// A reply as returned by the oracle: free text or a structured record.
#[derive(Debug, Clone, PartialEq)]
pub enum OracleReply {
    Text(String),
    Structured(StructuredAction),
}

impl OracleReply {
    /// Recognise JSON object bodies (optionally fenced) as structured replies.
    pub fn from_content(content: &str) -> Self {
        let cleaned = content
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();
        if cleaned.starts_with('{') {
            if let Ok(action) = serde_json::from_str::<StructuredAction>(cleaned) {
                return OracleReply::Structured(action);
            }
        }
        OracleReply::Text(content.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StructuredAction {
    pub action: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub todo_status: Option<String>,
}

/// One action pulled out of a reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAction {
    pub kind: ActionKind,
    pub target: String,
    pub value: Option<String>,
    pub reasoning: String,
    /// The action as it appeared (or would appear) on the wire.
    pub line: String,
}

impl ParsedAction {
    pub fn into_step(self) -> Step {
        Step::new(self.kind, self.target, self.value, self.reasoning)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed(ParsedAction),
    NoActionFound,
}

pub fn parse_reply(reply: &OracleReply) -> ParseOutcome {
    match reply {
        OracleReply::Text(text) => parse_text(text),
        OracleReply::Structured(action) => parse_structured(action),
    }
}

/// Find the earliest `KEYWORD|` in the text and split the rest of that line
/// into at most four fields.
pub fn parse_text(text: &str) -> ParseOutcome {
    let Some(start) = first_action_offset(text) else {
        return ParseOutcome::NoActionFound;
    };
    let line = text[start..].lines().next().unwrap_or_default().trim();
    let fields: Vec<&str> = line.splitn(4, '|').map(str::trim).collect();

    let Some(kind) = fields.first().and_then(|k| ActionKind::from_keyword(k)) else {
        return ParseOutcome::NoActionFound;
    };
    let target = fields.get(1).copied().unwrap_or_default().to_string();
    let value = fields.get(2).and_then(|v| types::parse_value(v));
    let reasoning = fields
        .get(3)
        .filter(|r| !r.is_empty())
        .map_or(DEFAULT_REASONING.to_string(), |r| r.to_string());

    ParseOutcome::Parsed(ParsedAction {
        kind,
        target,
        value,
        reasoning,
        line: line.to_string(),
    })
}

fn parse_structured(action: &StructuredAction) -> ParseOutcome {
    let Some(kind) = ActionKind::from_keyword(&action.action) else {
        return ParseOutcome::NoActionFound;
    };
    let target = action.target.clone().unwrap_or_default();
    let value = match &action.value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => types::parse_value(s),
        Some(other) => Some(other.to_string()),
    };
    let reasoning = action
        .reasoning
        .clone()
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_REASONING.to_string());
    let line = format!(
        "{}|{}|{}",
        kind,
        target,
        value.as_deref().unwrap_or("null")
    );
    ParseOutcome::Parsed(ParsedAction {
        kind,
        target,
        value,
        reasoning,
        line,
    })
}

/// Byte offset of the earliest keyword (any case) that starts a word and is
/// followed by `|`.
fn first_action_offset(text: &str) -> Option<usize> {
    // ASCII upper-casing keeps byte offsets.
    let upper = text.to_ascii_uppercase();
    let mut best: Option<usize> = None;
    for kind in ActionKind::ALL {
        let pattern = format!("{}|", kind.keyword());
        let hit = upper.match_indices(&pattern).map(|(i, _)| i).find(|&i| {
            upper[..i]
                .chars()
                .next_back()
                .is_none_or(|c| !(c.is_ascii_alphanumeric() || c == '_'))
        });
        if let Some(i) = hit {
            best = Some(best.map_or(i, |b| b.min(i)));
        }
    }
    best
}
