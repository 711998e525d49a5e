use thiserror::Error;

/// Failures reported by a [`crate::ui::UiHost`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HostError {
    /// The platform UI service is not connected (or was torn down).
    #[error("UI host is unavailable")]
    Unavailable,

    /// The service is connected but there is no active window to read.
    #[error("no active window")]
    NoActiveWindow,

    #[error("screenshot failed: {0}")]
    Screenshot(String),
}

/// Failures talking to the decision oracle.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("oracle returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("oracle still rate limited after {0} retries")]
    RateLimited(u32),

    #[error("oracle returned an empty response")]
    Empty,

    #[error("malformed oracle response: {0}")]
    Malformed(String),

    #[error("oracle is not configured: {0}")]
    NotConfigured(String),
}

/// Reasons a single step could not be carried out.
///
/// Never crosses the executor boundary; it is rendered into
/// [`crate::types::ActionResult::Failure`].
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("element not found: {0}")]
    NotFound(String),

    #[error("invalid value for {action}: {reason}")]
    InvalidValue { action: &'static str, reason: String },

    #[error("{0} failed")]
    OperationFailed(String),

    #[error("app not installed or failed to launch: {0}")]
    LaunchFailed(String),

    #[error(transparent)]
    Host(#[from] HostError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set in environment")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}
