use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::brain::{DecisionOracle, DecisionRequest};
use crate::dom::{SerializerConfig, TreeSerializer};
use crate::error::HostError;
use crate::hands::{ActionExecutor, ExecutorConfig};
use crate::history::ExecutionHistory;
use crate::parser::{ParseOutcome, parse_reply};
use crate::types::{ActionKind, MAX_STEPS_PER_TASK, StepExecution};
use crate::ui::{Screenshot, UiHost};

/// Where a run currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentState {
    Idle,
    Parsing,
    Executing {
        step: usize,
        total: usize,
        description: String,
    },
    Success,
    Error(String),
}

impl AgentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentState::Success | AgentState::Error(_))
    }
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub max_steps: usize,
    /// Pause after each iteration so the UI settles before the next capture.
    pub settle_delay: Duration,
    pub serializer: SerializerConfig,
    pub executor: ExecutorConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: MAX_STEPS_PER_TASK,
            settle_delay: Duration::from_millis(1000),
            serializer: SerializerConfig::default(),
            executor: ExecutorConfig::default(),
        }
    }
}

/// The observe / decide / act loop.
///
/// Only one agent should drive a given host at a time: the host is one
/// physical screen.
pub struct Agent {
    host: Arc<dyn UiHost>,
    oracle: Arc<dyn DecisionOracle>,
    executor: ActionExecutor,
    serializer: TreeSerializer,
    max_steps: usize,
    settle_delay: Duration,
    history: ExecutionHistory,
    executed: Vec<StepExecution>,
    state: watch::Sender<AgentState>,
    cancel: CancellationToken,
}

impl Agent {
    pub fn new(host: Arc<dyn UiHost>, oracle: Arc<dyn DecisionOracle>, config: AgentConfig) -> Self {
        let (state, _) = watch::channel(AgentState::Idle);
        Self {
            executor: ActionExecutor::new(host.clone(), config.executor),
            serializer: TreeSerializer::new(config.serializer),
            host,
            oracle,
            max_steps: config.max_steps,
            settle_delay: config.settle_delay,
            history: ExecutionHistory::new(),
            executed: Vec::new(),
            state,
            cancel: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> AgentState {
        self.state.borrow().clone()
    }

    /// Follow state changes from another task.
    pub fn subscribe(&self) -> watch::Receiver<AgentState> {
        self.state.subscribe()
    }

    /// Cancelling stops the run at the next iteration boundary.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn history(&self) -> &ExecutionHistory {
        &self.history
    }

    pub fn executed_steps(&self) -> &[StepExecution] {
        &self.executed
    }

    /// Back to `Idle` with an empty log. A cancelled token is replaced.
    pub fn reset(&mut self) {
        self.history.clear();
        self.executed.clear();
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }
        self.state.send_replace(AgentState::Idle);
    }

    /// Work towards `goal` until the oracle declares it done, something
    /// fatal happens, or the step budget runs out. Returns the final state.
    pub async fn run(&mut self, goal: &str) -> AgentState {
        info!("[agent] starting: '{}'", goal);
        self.history.clear();
        self.executed.clear();
        self.set_state(AgentState::Parsing);

        for step_number in 1..=self.max_steps {
            if self.cancel.is_cancelled() {
                return self.fail("cancelled");
            }

            let (tree, screenshot) = match self.capture().await {
                Ok(captured) => captured,
                Err(e) => return self.fail(format!("failed to capture screen: {}", e)),
            };

            self.set_state(AgentState::Executing {
                step: step_number,
                total: self.max_steps,
                description: "Deciding next action".to_string(),
            });

            let history = self.history.render();
            let request = DecisionRequest {
                goal,
                history: &history,
                screenshot: screenshot.as_ref(),
                ui_tree: &tree,
            };
            let reply = match self.oracle.decide_next_step(request).await {
                Ok(reply) => reply,
                Err(e) => return self.fail(format!("decision failed: {}", e)),
            };

            match parse_reply(&reply) {
                ParseOutcome::NoActionFound => {
                    warn!("[agent] step {}: no action in reply {:?}", step_number, reply);
                }
                ParseOutcome::Parsed(action) if action.kind == ActionKind::TaskComplete => {
                    info!("[agent] task complete: {}", action.reasoning);
                    self.set_state(AgentState::Success);
                    return AgentState::Success;
                }
                ParseOutcome::Parsed(action) => {
                    info!("[agent] step {}: {}", step_number, action.line);
                    self.set_state(AgentState::Executing {
                        step: step_number,
                        total: self.max_steps,
                        description: action.reasoning.clone(),
                    });
                    let line = action.line.clone();
                    let step = action.into_step();
                    let result = self.executor.execute(&step).await;
                    self.history.record(step_number, line, result.clone());
                    self.executed.push(StepExecution {
                        step,
                        result,
                        index: self.executed.len(),
                    });
                }
            }

            tokio::time::sleep(self.settle_delay).await;
        }

        self.fail("max steps reached")
    }

    /// Serialized tree is required; the screenshot is best effort.
    async fn capture(&self) -> Result<(String, Option<Screenshot>), HostError> {
        let root = self.host.capture_snapshot().await?;
        let tree = self.serializer.serialize(&root);
        let screenshot = match self.host.capture_screenshot().await {
            Ok(shot) => Some(shot),
            Err(e) => {
                warn!("[agent] continuing without screenshot: {}", e);
                None
            }
        };
        Ok((tree, screenshot))
    }

    fn set_state(&self, state: AgentState) {
        self.state.send_replace(state);
    }

    fn fail(&self, message: impl Into<String>) -> AgentState {
        let message = message.into();
        warn!("[agent] stopping: {}", message);
        let state = AgentState::Error(message);
        self.set_state(state.clone());
        state
    }
}
