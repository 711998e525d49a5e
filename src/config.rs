use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Settings for the HTTP decision oracle, read from the environment
/// (a `.env` file is loaded by the binary first).
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub api_key: String,
    pub model: String,
    pub api_url: String,
    /// Extra attempts after HTTP 429 before the call is abandoned.
    pub max_rate_limit_retries: u32,
    /// Used when the server sends no `Retry-After`.
    pub rate_limit_backoff: Duration,
    pub request_timeout: Duration,
}

impl OracleConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            max_rate_limit_retries: 10,
            rate_limit_backoff: Duration::from_millis(2000),
            request_timeout: Duration::from_secs(120),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| ConfigError::Missing("OPENAI_API_KEY"))?;
        let mut config = Self::new(api_key);
        if let Ok(model) = env::var("PILOT_MODEL") {
            config.model = model;
        }
        if let Ok(url) = env::var("PILOT_API_URL") {
            config.api_url = url;
        }
        if let Some(retries) = parse_var("PILOT_MAX_RATE_LIMIT_RETRIES")? {
            config.max_rate_limit_retries = retries;
        }
        if let Some(ms) = parse_var::<u64>("PILOT_RATE_LIMIT_BACKOFF_MS")? {
            config.rate_limit_backoff = Duration::from_millis(ms);
        }
        Ok(config)
    }
}

fn parse_var<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(None),
    }
}
