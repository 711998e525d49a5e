use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::OracleConfig;
use crate::error::OracleError;
use crate::parser::OracleReply;
use crate::ui::Screenshot;

/// Everything the oracle sees when choosing the next step.
#[derive(Debug, Clone, Copy)]
pub struct DecisionRequest<'a> {
    pub goal: &'a str,
    pub history: &'a str,
    pub screenshot: Option<&'a Screenshot>,
    pub ui_tree: &'a str,
}

/// The external reasoning service.
#[async_trait]
pub trait DecisionOracle: Send + Sync {
    /// One-shot plan: `ACTION|TARGET|VALUE|DESCRIPTION` lines.
    async fn generate_plan(&self, command: &str) -> Result<String, OracleError>;

    /// The single next action for the current screen.
    async fn decide_next_step(&self, request: DecisionRequest<'_>) -> Result<OracleReply, OracleError>;
}

const ACTIONS_HELP: &str = r#"Available actions (one per line, format ACTION|TARGET|VALUE|REASONING, VALUE may be null):
- OPEN_APP|<package id>|null|why
- FIND_ELEMENT|<text, description or id>|null|why
- CLICK|<text, description or id>|null|why
- CLICK_INDEX|<type shown on the item: video, button, search_field or input; item for any>|<zero-based index>|why
- TYPE_TEXT|<field hint, or empty>|<text>|why
- SEARCH|<field hint, or empty>|<query>|why
- PRESS_ENTER|<field hint, or empty>|null|why
- WAIT|<milliseconds>|null|why
- NAVIGATE_BACK||null|why
- SCROLL_DOWN||null|why
- SCROLL_UP||null|why
- TASK_COMPLETE||null|why"#;

const DECIDE_PROMPT: &str = r#"You are a mobile automation agent. You operate an Android phone by issuing ONE action at a time.

The current screen is given as a JSON array of UI elements. Keys: type (video/button/search_field/input/list), index (position inside the enclosing list, use it with CLICK_INDEX), text, desc, id, pos (top/mid/bottom), click, scroll, edit, children.

Rules:
1. Reply with exactly one action line. No markdown.
2. Prefer CLICK with visible text; use CLICK_INDEX for items of a list.
3. Read the history: never repeat an action that FAILED with the same target.
4. When the goal is achieved, reply TASK_COMPLETE||null|<summary>."#;

const PLAN_PROMPT: &str = r#"You are a mobile automation planner. Turn the user's command into the full list of steps needed on an Android phone.
Reply with one step per line and nothing else. Open the app first with its package id (e.g. com.google.android.youtube)."#;

/// Chat-completions backed oracle.
pub struct Brain {
    client: Client,
    config: OracleConfig,
}

impl Brain {
    pub fn new(config: OracleConfig) -> Result<Self, OracleError> {
        if config.api_key.trim().is_empty() {
            return Err(OracleError::NotConfigured("empty API key".to_string()));
        }
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { client, config })
    }

    /// POST `messages`, waiting out rate limits up to the configured budget.
    async fn complete(&self, messages: Value) -> Result<String, OracleError> {
        let body = json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": 0.2,
        });

        let mut rate_limited = 0;
        loop {
            let response = self
                .client
                .post(&self.config.api_url)
                .bearer_auth(&self.config.api_key)
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                if rate_limited >= self.config.max_rate_limit_retries {
                    warn!("[brain] rate limited {} times, giving up", rate_limited);
                    return Err(OracleError::RateLimited(rate_limited));
                }
                rate_limited += 1;
                let wait = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(retry_after)
                    .unwrap_or(self.config.rate_limit_backoff);
                warn!(
                    "[brain] rate limited, retry {}/{} in {:?}",
                    rate_limited, self.config.max_rate_limit_retries, wait
                );
                tokio::time::sleep(wait).await;
                continue;
            }

            let text = response.text().await?;
            if !status.is_success() {
                let message = error_message(&text);
                warn!("[brain] API error ({}): {}", status, message);
                return Err(OracleError::Status {
                    status: status.as_u16(),
                    message,
                });
            }
            let json_resp: Value = serde_json::from_str(&text)
                .map_err(|e| OracleError::Malformed(format!("{}: {}", e, text)))?;

            let content = json_resp["choices"][0]["message"]["content"]
                .as_str()
                .ok_or_else(|| OracleError::Malformed(format!("no content in {}", json_resp)))?
                .trim()
                .to_string();
            if content.is_empty() {
                return Err(OracleError::Empty);
            }
            debug!("[brain] model says: {}", content);
            return Ok(content);
        }
    }
}

#[async_trait]
impl DecisionOracle for Brain {
    async fn generate_plan(&self, command: &str) -> Result<String, OracleError> {
        info!("[brain] planning '{}'", command);
        let messages = json!([
            {"role": "system", "content": format!("{}\n\n{}", PLAN_PROMPT, ACTIONS_HELP)},
            {"role": "user", "content": command},
        ]);
        self.complete(messages).await
    }

    async fn decide_next_step(&self, request: DecisionRequest<'_>) -> Result<OracleReply, OracleError> {
        let text = format!(
            "Goal: {}\n\nHistory:\n{}\n\nScreen:\n{}\n\nWhat is your next action?",
            request.goal, request.history, request.ui_tree
        );
        let mut content = vec![json!({"type": "text", "text": text})];
        if let Some(shot) = request.screenshot {
            content.push(json!({
                "type": "image_url",
                "image_url": {"url": shot.data_url()},
            }));
        }
        let messages = json!([
            {"role": "system", "content": format!("{}\n\n{}", DECIDE_PROMPT, ACTIONS_HELP)},
            {"role": "user", "content": content},
        ]);
        let reply = self.complete(messages).await?;
        Ok(OracleReply::from_content(&reply))
    }
}

/// `Retry-After` in whole seconds. HTTP dates are not worth honouring here.
fn retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// `error.message` of an API error body, else the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .unwrap_or_else(|| "Unknown API error".to_string())
}
