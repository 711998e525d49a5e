use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed vocabulary of actions the executor understands.
///
/// `target` / `value` meaning per kind:
///   - `OpenApp`: target = package identifier.
///   - `FindElement` / `Click`: target = visible text, description or id.
///   - `ClickIndex`: target = element category, value = zero-based position.
///   - `TypeText`: target = hint for the input field, value = text to enter.
///   - `PressEnter`: target = hint for the input field to submit.
///   - `Wait`: target = milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    OpenApp,
    FindElement,
    Click,
    ClickIndex,
    TypeText,
    PressEnter,
    Search,
    Wait,
    NavigateBack,
    ScrollDown,
    ScrollUp,
    TaskComplete,
}

impl ActionKind {
    pub const ALL: [ActionKind; 12] = [
        ActionKind::OpenApp,
        ActionKind::FindElement,
        ActionKind::Click,
        ActionKind::ClickIndex,
        ActionKind::TypeText,
        ActionKind::PressEnter,
        ActionKind::Search,
        ActionKind::Wait,
        ActionKind::NavigateBack,
        ActionKind::ScrollDown,
        ActionKind::ScrollUp,
        ActionKind::TaskComplete,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            ActionKind::OpenApp => "OPEN_APP",
            ActionKind::FindElement => "FIND_ELEMENT",
            ActionKind::Click => "CLICK",
            ActionKind::ClickIndex => "CLICK_INDEX",
            ActionKind::TypeText => "TYPE_TEXT",
            ActionKind::PressEnter => "PRESS_ENTER",
            ActionKind::Search => "SEARCH",
            ActionKind::Wait => "WAIT",
            ActionKind::NavigateBack => "NAVIGATE_BACK",
            ActionKind::ScrollDown => "SCROLL_DOWN",
            ActionKind::ScrollUp => "SCROLL_UP",
            ActionKind::TaskComplete => "TASK_COMPLETE",
        }
    }

    /// Case-insensitive lookup of a wire keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let keyword = keyword.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.keyword().eq_ignore_ascii_case(keyword))
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A single atomic step, either planned up front or decided by the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub action: ActionKind,
    pub target: String,
    pub value: Option<String>,
    pub description: String,
}

impl Step {
    pub fn new(
        action: ActionKind,
        target: impl Into<String>,
        value: Option<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            action,
            target: target.into(),
            value,
            description: description.into(),
        }
    }

    /// Parse one `ACTION|TARGET|VALUE|DESCRIPTION` plan line.
    ///
    /// Lines with fewer than four fields or an unknown action are rejected.
    /// A VALUE of `null` (or empty) becomes `None`.
    pub fn parse_line(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.trim().splitn(4, '|').map(str::trim).collect();
        if fields.len() < 4 {
            return None;
        }
        let action = ActionKind::from_keyword(fields[0])?;
        Some(Self::new(
            action,
            fields[1],
            parse_value(fields[2]),
            fields[3],
        ))
    }

    /// Render back to the plan line format.
    pub fn to_line(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.action,
            self.target,
            self.value.as_deref().unwrap_or("null"),
            self.description
        )
    }
}

/// `null` and blank fields carry no value.
pub(crate) fn parse_value(field: &str) -> Option<String> {
    let field = field.trim();
    if field.is_empty() || field.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(field.to_string())
    }
}

/// Outcome of executing one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum ActionResult {
    Success(String),
    Failure(String),
}

impl ActionResult {
    pub fn success(message: impl Into<String>) -> Self {
        ActionResult::Success(message.into())
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        ActionResult::Failure(reason.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ActionResult::Success(_))
    }

    pub fn message(&self) -> &str {
        match self {
            ActionResult::Success(m) | ActionResult::Failure(m) => m,
        }
    }
}

/// Record of an executed step, kept for callers (UI, telemetry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepExecution {
    pub step: Step,
    pub result: ActionResult,
    pub index: usize,
}

pub const MAX_STEPS_PER_TASK: usize = 15;
