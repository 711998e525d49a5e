//! Single-shot planning: ask the oracle for a whole plan, or fall back to
//! hand-written step sequences for a few well-known apps.

use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

use crate::brain::DecisionOracle;
use crate::types::{ActionKind, Step};

/// How a known app's fallback plan continues after launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppFamily {
    Messaging,
    Media,
    Browser,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownApp {
    pub name: &'static str,
    pub package: &'static str,
    pub family: AppFamily,
}

/// Static mapping from spoken app names to package identifiers.
#[derive(Debug, Clone)]
pub struct AppDirectory {
    apps: HashMap<&'static str, KnownApp>,
}

impl Default for AppDirectory {
    fn default() -> Self {
        use AppFamily::*;
        let entries: [(&[&'static str], &'static str, &'static str, AppFamily); 10] = [
            (&["youtube"], "YouTube", "com.google.android.youtube", Media),
            (&["spotify"], "Spotify", "com.spotify.music", Media),
            (&["whatsapp"], "WhatsApp", "com.whatsapp", Messaging),
            (&["telegram"], "Telegram", "org.telegram.messenger", Messaging),
            (&["messages", "sms"], "Messages", "com.google.android.apps.messaging", Messaging),
            (&["chrome", "browser"], "Chrome", "com.android.chrome", Browser),
            (&["gmail"], "Gmail", "com.google.android.gm", Other),
            (&["instagram"], "Instagram", "com.instagram.android", Other),
            (&["maps"], "Maps", "com.google.android.apps.maps", Other),
            (&["settings"], "Settings", "com.android.settings", Other),
        ];
        let mut apps = HashMap::new();
        for (aliases, name, package, family) in entries {
            for alias in aliases {
                apps.insert(
                    *alias,
                    KnownApp {
                        name,
                        package,
                        family,
                    },
                );
            }
        }
        Self { apps }
    }
}

impl AppDirectory {
    pub fn resolve(&self, name: &str) -> Option<&KnownApp> {
        self.apps.get(name.trim().to_lowercase().as_str())
    }

    /// First word of the command that names a known app.
    pub fn find_in(&self, command: &str) -> Option<&KnownApp> {
        command
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .find_map(|word| self.resolve(word))
    }
}

/// "send hello to Bob on whatsapp" style: body before the contact.
static SEND_BODY_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:send|text)\s+(?:a\s+message\s+)?(?P<body>.+?)\s+to\s+(?P<contact>.+?)(?:\s+(?:on|in|via|using)\s+\w+)?\s*$")
        .expect("message pattern is valid")
});

/// "message Bob on whatsapp saying hello" / "send a message to Bob: hello".
static SEND_CONTACT_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:send\s+(?:a\s+)?message\s+to|message|text|tell)\s+(?P<contact>.+?)(?:\s+(?:on|in|via|using)\s+\w+)?\s*(?::|\s+saying|\s+that)\s*(?P<body>.+?)\s*$")
        .expect("message pattern is valid")
});

static SEARCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:play|watch|listen\s+to|search\s+for|search|find|look\s+up)\s+(?P<query>.+?)(?:\s+(?:on|in|using)\s+\w+)?\s*$")
        .expect("search pattern is valid")
});

/// What the user asked for, as far as the templates care.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    SendMessage { contact: String, body: String },
    SearchAndPlay { query: String },
    OpenOnly,
}

pub fn extract_intent(command: &str) -> Intent {
    // Contact-first is tried first: "send a message to Bob: hi" would
    // otherwise read "a message" as the body.
    for pattern in [&*SEND_CONTACT_FIRST, &*SEND_BODY_FIRST] {
        if let Some(caps) = pattern.captures(command) {
            return Intent::SendMessage {
                contact: caps["contact"].trim().to_string(),
                body: caps["body"].trim().to_string(),
            };
        }
    }
    if let Some(caps) = SEARCH.captures(command) {
        return Intent::SearchAndPlay {
            query: caps["query"].trim().to_string(),
        };
    }
    Intent::OpenOnly
}

pub struct PlanBuilder {
    oracle: Option<Arc<dyn DecisionOracle>>,
    apps: AppDirectory,
}

impl PlanBuilder {
    pub fn new(oracle: Option<Arc<dyn DecisionOracle>>, apps: AppDirectory) -> Self {
        Self { oracle, apps }
    }

    /// Oracle plan when it yields at least one usable step, otherwise the
    /// template for the named app. Empty means the command cannot be handled.
    pub async fn build_plan(&self, command: &str) -> Vec<Step> {
        if let Some(oracle) = &self.oracle {
            match oracle.generate_plan(command).await {
                Ok(text) => {
                    let steps = parse_plan(&text);
                    if !steps.is_empty() {
                        info!("[planner] oracle plan with {} steps", steps.len());
                        return steps;
                    }
                    warn!("[planner] oracle plan had no usable steps, using template");
                }
                Err(e) => warn!("[planner] oracle unavailable ({}), using template", e),
            }
        }
        self.template_plan(command)
    }

    pub fn template_plan(&self, command: &str) -> Vec<Step> {
        let Some(app) = self.apps.find_in(command) else {
            warn!("[planner] no known app in '{}'", command);
            return Vec::new();
        };
        let intent = extract_intent(command);
        debug!("[planner] {} / {:?}", app.name, intent);

        let mut steps = vec![
            Step::new(ActionKind::OpenApp, app.package, None, format!("Open {}", app.name)),
            Step::new(ActionKind::Wait, "2000", None, "Wait for app to load"),
        ];
        match (app.family, intent) {
            (AppFamily::Messaging, Intent::SendMessage { contact, body }) => {
                steps.extend(message_steps(app, &contact, &body));
            }
            (AppFamily::Media, Intent::SearchAndPlay { query }) => {
                steps.extend(media_steps(app, &query));
            }
            (AppFamily::Browser, Intent::SearchAndPlay { query }) => {
                steps.extend([
                    Step::new(ActionKind::Click, "Search or type web address", None, "Focus address bar"),
                    Step::new(ActionKind::TypeText, "", Some(query.clone()), format!("Type '{}'", query)),
                    Step::new(ActionKind::PressEnter, "", None, "Run search"),
                ]);
            }
            _ => {}
        }
        steps
    }
}

fn message_steps(app: &KnownApp, contact: &str, body: &str) -> Vec<Step> {
    let (search_label, compose_hint, send_label) = match app.package {
        "com.google.android.apps.messaging" => ("Search", "Text message", "Send SMS"),
        _ => ("Search", "Message", "Send"),
    };
    vec![
        Step::new(ActionKind::Click, search_label, None, "Open chat search"),
        Step::new(ActionKind::TypeText, "search", Some(contact.to_string()), format!("Search for {}", contact)),
        Step::new(ActionKind::Wait, "1000", None, "Wait for results"),
        Step::new(ActionKind::Click, contact, None, format!("Open chat with {}", contact)),
        Step::new(ActionKind::Wait, "1000", None, "Wait for chat"),
        Step::new(ActionKind::TypeText, compose_hint, Some(body.to_string()), "Write message"),
        Step::new(ActionKind::Click, send_label, None, "Send message"),
    ]
}

fn media_steps(app: &KnownApp, query: &str) -> Vec<Step> {
    let mut steps = vec![
        Step::new(ActionKind::FindElement, "Search", None, "Locate search"),
        Step::new(ActionKind::Click, "Search", None, "Open search"),
        Step::new(ActionKind::TypeText, "search", Some(query.to_string()), format!("Type '{}'", query)),
        Step::new(ActionKind::PressEnter, "search", None, "Run search"),
        Step::new(ActionKind::Wait, "2000", None, "Wait for results"),
    ];
    if app.package == "com.google.android.youtube" {
        steps.push(Step::new(ActionKind::ClickIndex, "video", Some("0".to_string()), "Play first video"));
    } else {
        steps.push(Step::new(ActionKind::Click, query, None, format!("Play '{}'", query)));
    }
    steps
}

/// Parse oracle plan text, silently dropping lines that are not steps.
pub fn parse_plan(text: &str) -> Vec<Step> {
    text.lines().filter_map(Step::parse_line).collect()
}
