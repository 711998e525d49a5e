//! Autonomous driver for a phone's UI: observe the screen, ask a decision
//! oracle for the next action, execute it, repeat.
//!
//! - [`dom`] compresses a window tree for the oracle.
//! - [`resolver`] and [`hands`] turn an action into host operations.
//! - [`agent`] runs the loop; [`planner`] builds whole plans up front.

pub mod agent;
pub mod brain;
pub mod config;
pub mod dom;
pub mod error;
pub mod hands;
pub mod history;
pub mod parser;
pub mod planner;
pub mod resolver;
pub mod types;
pub mod ui;

pub use agent::{Agent, AgentConfig, AgentState};
pub use brain::{Brain, DecisionOracle, DecisionRequest};
pub use dom::{SerializerConfig, TreeSerializer};
pub use error::{ActionError, ConfigError, HostError, OracleError};
pub use hands::{ActionExecutor, ExecutorConfig};
pub use history::ExecutionHistory;
pub use parser::{OracleReply, ParseOutcome};
pub use planner::{AppDirectory, PlanBuilder};
pub use types::{ActionKind, ActionResult, Step, StepExecution};
pub use ui::{Bounds, Screenshot, UiHost, UiNode};
