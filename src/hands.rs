use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::ActionError;
use crate::resolver::Located;
use crate::types::{ActionKind, ActionResult, Step, StepExecution};
use crate::ui::{UiHost, UiNode};

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Lookups per step before giving up on an element.
    pub max_attempts: u32,
    /// Pause between lookups.
    pub retry_delay: Duration,
    /// WAIT duration when the target is not a number.
    pub default_wait: Duration,
    /// Buttons tried, in order, when a field does not submit on click.
    pub submit_labels: Vec<String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay: Duration::from_millis(500),
            default_wait: Duration::from_millis(1000),
            submit_labels: ["Search", "Send", "Go", "Enter", "Submit", "Done"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Carries out steps against the UI host.
pub struct ActionExecutor {
    host: Arc<dyn UiHost>,
    config: ExecutorConfig,
}

impl ActionExecutor {
    pub fn new(host: Arc<dyn UiHost>, config: ExecutorConfig) -> Self {
        Self { host, config }
    }

    pub fn host(&self) -> &Arc<dyn UiHost> {
        &self.host
    }

    /// Execute one step. Never fails: problems, including a panicking
    /// host, come back as `Failure`.
    pub async fn execute(&self, step: &Step) -> ActionResult {
        info!(
            "[hands] {} target='{}' value={:?}",
            step.action, step.target, step.value
        );
        match AssertUnwindSafe(self.dispatch(step)).catch_unwind().await {
            Ok(Ok(message)) => {
                debug!("[hands] {} ok: {}", step.action, message);
                ActionResult::Success(message)
            }
            Ok(Err(e)) => {
                warn!("[hands] {} failed: {}", step.action, e);
                ActionResult::Failure(e.to_string())
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!("[hands] {} panicked: {}", step.action, reason);
                ActionResult::Failure(format!("{} panicked: {}", step.action, reason))
            }
        }
    }

    /// Run `steps` in order, stopping at the first failure.
    pub async fn execute_plan<F>(&self, steps: &[Step], mut on_each: F) -> ActionResult
    where
        F: FnMut(&StepExecution),
    {
        for (index, step) in steps.iter().enumerate() {
            let result = self.execute(step).await;
            on_each(&StepExecution {
                step: step.clone(),
                result: result.clone(),
                index,
            });
            if !result.is_success() {
                return result;
            }
        }
        ActionResult::success(format!("Completed {} steps", steps.len()))
    }

    async fn dispatch(&self, step: &Step) -> Result<String, ActionError> {
        match step.action {
            ActionKind::OpenApp => self.open_app(&step.target).await,
            ActionKind::FindElement => {
                let found = self.resolve_text(&step.target).await?;
                Ok(format!("Found '{}'", describe(found.node())))
            }
            ActionKind::Click => {
                let found = self.resolve_text(&step.target).await?;
                self.click(found.click_target(), &step.target).await
            }
            ActionKind::ClickIndex => self.click_index(step).await,
            ActionKind::TypeText => self.type_text(step).await,
            ActionKind::Search => {
                let typed = self.type_text(step).await?;
                let submitted = self.press_enter(&step.target).await?;
                Ok(format!("{}; {}", typed, submitted))
            }
            ActionKind::PressEnter => self.press_enter(&step.target).await,
            ActionKind::ScrollDown => self.scroll(true).await,
            ActionKind::ScrollUp => self.scroll(false).await,
            ActionKind::Wait => {
                let wait = step
                    .target
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .unwrap_or(self.config.default_wait);
                tokio::time::sleep(wait).await;
                Ok(format!("Waited {}ms", wait.as_millis()))
            }
            ActionKind::NavigateBack => {
                if self.host.global_back().await {
                    Ok("Navigated back".to_string())
                } else {
                    Err(ActionError::OperationFailed("back navigation".to_string()))
                }
            }
            ActionKind::TaskComplete => Ok("Task complete".to_string()),
        }
    }

    async fn type_text(&self, step: &Step) -> Result<String, ActionError> {
        let text = step.value.as_deref().ok_or_else(|| ActionError::InvalidValue {
            action: step.action.keyword(),
            reason: "no text to type".to_string(),
        })?;
        let field = self.resolve_editable(&step.target).await?;
        if self.host.set_text(field.node(), text).await {
            Ok(format!("Typed '{}'", text))
        } else {
            Err(ActionError::OperationFailed(format!("set text on '{}'", step.target)))
        }
    }

    async fn open_app(&self, package: &str) -> Result<String, ActionError> {
        let package = package.trim();
        if package.is_empty() {
            return Err(ActionError::InvalidValue {
                action: "OPEN_APP",
                reason: "empty package".to_string(),
            });
        }
        if self.host.launch_app(package).await {
            Ok(format!("Opened {}", package))
        } else {
            Err(ActionError::LaunchFailed(package.to_string()))
        }
    }

    /// Sequential lookups with a fixed pause between them.
    async fn with_retry<F, Fut>(&self, what: &str, mut lookup: F) -> Result<Located, ActionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Option<Located>>,
    {
        let attempts = self.config.max_attempts.max(1);
        for attempt in 1..=attempts {
            if let Some(found) = lookup().await {
                debug!("[hands] resolved {} on attempt {}", what, attempt);
                return Ok(found);
            }
            debug!("[hands] {} not found (attempt {}/{})", what, attempt, attempts);
            if attempt < attempts {
                tokio::time::sleep(self.config.retry_delay).await;
            }
        }
        Err(ActionError::NotFound(what.to_string()))
    }

    async fn resolve_text(&self, target: &str) -> Result<Located, ActionError> {
        self.with_retry(target, || self.host.find_by_text(target, false))
            .await
    }

    async fn resolve_editable(&self, hint: &str) -> Result<Located, ActionError> {
        let hint = Some(hint.trim()).filter(|h| !h.is_empty());
        let what = hint.map_or_else(|| "editable field".to_string(), |h| format!("field '{}'", h));
        self.with_retry(&what, || async move {
            match self.host.find_editable(hint).await {
                Some(found) => Some(found),
                // The hint is advisory: any input beats none.
                None if hint.is_some() => self.host.find_editable(None).await,
                None => None,
            }
        })
        .await
    }

    async fn click(&self, node: &UiNode, label: &str) -> Result<String, ActionError> {
        if self.host.click(node).await {
            Ok(format!("Clicked '{}'", label))
        } else {
            Err(ActionError::OperationFailed(format!("click on '{}'", label)))
        }
    }

    async fn click_index(&self, step: &Step) -> Result<String, ActionError> {
        let raw = step.value.as_deref().unwrap_or_default().trim();
        let index = raw.parse::<usize>().map_err(|_| ActionError::InvalidValue {
            action: "CLICK_INDEX",
            reason: format!("'{}' is not a list position", raw),
        })?;
        let category = step.target.trim();
        let what = format!("{} #{}", category, index);
        let found = self
            .with_retry(&what, || self.host.find_by_list_index(category, index))
            .await?;
        let item = found.node();
        // Rows are usually clickable themselves; fall back to their content.
        let target = if item.clickable {
            item
        } else {
            item.walk()
                .into_iter()
                .map(|(_, n)| n)
                .find(|n| n.clickable)
                .unwrap_or(item)
        };
        self.click(target, &what).await
    }

    /// Best effort: the field itself, then a known submit button, then the
    /// nearest clickable ancestor of the field.
    async fn press_enter(&self, hint: &str) -> Result<String, ActionError> {
        let field = self.resolve_editable(hint).await?;

        if self.host.click(field.node()).await {
            return Ok("Submitted via field".to_string());
        }

        if let Some(button) = self.find_submit_button(field.root()) {
            let label = describe(button).to_string();
            if self.host.click(button).await {
                return Ok(format!("Submitted via '{}'", label));
            }
        }

        if let Some(ancestor) = field.ancestors().find(|a| a.clickable) {
            if self.host.click(ancestor).await {
                return Ok("Submitted via parent".to_string());
            }
        }

        Err(ActionError::OperationFailed("submit".to_string()))
    }

    fn find_submit_button<'a>(&self, root: &'a UiNode) -> Option<&'a UiNode> {
        let nodes = root.walk();
        self.config.submit_labels.iter().find_map(|label| {
            nodes
                .iter()
                .map(|(_, n)| *n)
                .filter(|n| n.clickable)
                .find(|n| {
                    [n.text(), n.desc()]
                        .into_iter()
                        .flatten()
                        .any(|t| t.trim().eq_ignore_ascii_case(label))
                })
        })
    }

    async fn scroll(&self, forward: bool) -> Result<String, ActionError> {
        let root = self.host.capture_snapshot().await?;
        let container = best_scroll_container(&root)
            .ok_or_else(|| ActionError::NotFound("scrollable container".to_string()))?;
        let ok = if forward {
            self.host.scroll_forward(container).await
        } else {
            self.host.scroll_backward(container).await
        };
        let direction = if forward { "down" } else { "up" };
        if ok {
            Ok(format!("Scrolled {}", direction))
        } else {
            Err(ActionError::OperationFailed(format!("scroll {}", direction)))
        }
    }
}

/// Prefer list/grid/scroll views; otherwise any node flagged scrollable.
pub fn best_scroll_container(root: &UiNode) -> Option<&UiNode> {
    let nodes = root.walk();
    nodes
        .iter()
        .map(|(_, n)| *n)
        .find(|n| n.scrollable && n.is_scroll_container())
        .or_else(|| nodes.iter().map(|(_, n)| *n).find(|n| n.scrollable))
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown cause")
}

fn describe(node: &UiNode) -> &str {
    node.text()
        .or(node.desc())
        .or(node.short_id())
        .unwrap_or(&node.class_name)
}
