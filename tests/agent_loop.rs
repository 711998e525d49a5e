mod common;

use common::{ScriptedHost, ScriptedOracle, search_screen};
use phone_pilot::{ActionKind, Agent, AgentConfig, AgentState, OracleError};
use std::sync::Arc;
use std::time::Duration;

fn agent(host: &Arc<ScriptedHost>, oracle: &Arc<ScriptedOracle>) -> Agent {
    Agent::new(
        host.clone(),
        oracle.clone(),
        AgentConfig {
            settle_delay: Duration::ZERO,
            ..Default::default()
        },
    )
}

#[tokio::test]
async fn immediate_completion_executes_nothing() {
    let host = Arc::new(ScriptedHost::with_screen(search_screen()));
    let oracle = Arc::new(ScriptedOracle::replying(&["TASK_COMPLETE||null|already there"]));
    let mut agent = agent(&host, &oracle);

    let outcome = agent.run("open the search screen").await;

    assert_eq!(outcome, AgentState::Success);
    assert_eq!(agent.state(), AgentState::Success);
    assert!(agent.executed_steps().is_empty());
    assert!(host.ops().is_empty());
    assert_eq!(oracle.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_fifteen_iterations() {
    let host = Arc::new(ScriptedHost::with_screen(search_screen()));
    let oracle = Arc::new(ScriptedOracle::replying(&[]));
    let mut agent = agent(&host, &oracle);

    let outcome = agent.run("never satisfied").await;

    assert_eq!(outcome, AgentState::Error("max steps reached".to_string()));
    assert_eq!(oracle.calls(), 15);
    assert_eq!(agent.executed_steps().len(), 15);
    assert_eq!(agent.history().len(), 15);
}

#[tokio::test]
async fn capture_failure_stops_before_asking() {
    let host = Arc::new(ScriptedHost::unavailable());
    let oracle = Arc::new(ScriptedOracle::replying(&["CLICK|Send|null|x"]));
    let mut agent = agent(&host, &oracle);

    let outcome = agent.run("anything").await;

    assert!(matches!(outcome, AgentState::Error(ref m) if m.contains("capture")), "{outcome:?}");
    assert_eq!(oracle.calls(), 0);
}

#[tokio::test]
async fn oracle_failure_is_fatal() {
    let host = Arc::new(ScriptedHost::with_screen(search_screen()));
    let oracle = Arc::new(ScriptedOracle::failing(OracleError::Empty));
    let mut agent = agent(&host, &oracle);

    let outcome = agent.run("anything").await;

    assert!(matches!(outcome, AgentState::Error(ref m) if m.contains("empty")), "{outcome:?}");
    assert!(agent.executed_steps().is_empty());
}

#[tokio::test]
async fn unparseable_reply_is_skipped_but_counted() {
    let host = Arc::new(ScriptedHost::with_screen(search_screen()));
    let oracle = Arc::new(ScriptedOracle::replying(&[
        "Let me look at the screen first.",
        "CLICK|Send|null|send it",
        "TASK_COMPLETE||null|sent",
    ]));
    let mut agent = agent(&host, &oracle);

    let outcome = agent.run("send").await;

    assert_eq!(outcome, AgentState::Success);
    assert_eq!(host.ops(), ["click:4"]);
    let entries = agent.history().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].step_number, 2);
    assert_eq!(entries[0].action_line, "CLICK|Send|null|send it");
    assert_eq!(agent.executed_steps()[0].index, 0);
    assert_eq!(agent.executed_steps()[0].step.action, ActionKind::Click);
}

#[tokio::test(start_paused = true)]
async fn failures_are_reported_back_to_the_oracle() {
    let host = Arc::new(ScriptedHost::with_screen(search_screen()));
    let oracle = Arc::new(ScriptedOracle::replying(&[
        "CLICK|Subscribe|null|subscribe",
        "CLICK_INDEX|video|0|play first",
        "TASK_COMPLETE||null|playing",
    ]));
    let mut agent = agent(&host, &oracle);

    let outcome = agent.run("play the first video").await;

    assert_eq!(outcome, AgentState::Success);
    let histories = oracle.histories.lock().unwrap().clone();
    assert_eq!(histories[0], "No actions taken yet.");
    assert!(histories[1].contains("Step 1: CLICK|Subscribe|null|subscribe -> FAILED"));
    assert!(histories[2].contains("Step 2: CLICK_INDEX|video|0|play first -> SUCCESS"));
    assert_eq!(host.ops(), ["click:12"]);
}

#[tokio::test]
async fn structured_replies_are_executed() {
    let host = Arc::new(ScriptedHost::with_screen(search_screen()));
    let oracle = Arc::new(ScriptedOracle::replying(&[
        r#"{"action":"TYPE_TEXT","target":"search","value":"lofi","reasoning":"enter query","todo_status":"1/2"}"#,
        r#"{"action":"TASK_COMPLETE","reasoning":"typed"}"#,
    ]));
    let mut agent = agent(&host, &oracle);

    assert_eq!(agent.run("search lofi").await, AgentState::Success);
    assert_eq!(host.ops(), ["set_text:3:lofi"]);
    assert_eq!(agent.history().entries()[0].action_line, "TYPE_TEXT|search|lofi");
}

#[tokio::test]
async fn oracle_sees_serialized_tree_and_screenshot() {
    let mut host = ScriptedHost::with_screen(search_screen());
    host.screenshot = true;
    let host = Arc::new(host);
    let oracle = Arc::new(ScriptedOracle::replying(&["TASK_COMPLETE||null|done"]));
    let mut agent = agent(&host, &oracle);

    agent.run("look").await;

    let tree = oracle.trees.lock().unwrap()[0].clone();
    let parsed: serde_json::Value = serde_json::from_str(&tree).unwrap();
    assert!(parsed.is_array());
    assert!(tree.contains("\"index\":2"));
    assert_eq!(oracle.screenshots.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancellation_is_observed_at_iteration_boundary() {
    let host = Arc::new(ScriptedHost::with_screen(search_screen()));
    let oracle = Arc::new(ScriptedOracle::replying(&["TASK_COMPLETE||null|done"]));
    let mut agent = agent(&host, &oracle);
    let mut states = agent.subscribe();

    agent.cancellation_token().cancel();
    let outcome = agent.run("anything").await;

    assert_eq!(outcome, AgentState::Error("cancelled".to_string()));
    assert_eq!(oracle.calls(), 0);
    assert_eq!(*states.borrow_and_update(), AgentState::Error("cancelled".to_string()));

    agent.reset();
    assert_eq!(agent.state(), AgentState::Idle);
    assert!(!agent.cancellation_token().is_cancelled());
    assert_eq!(agent.run("anything").await, AgentState::Success);
}

#[tokio::test]
async fn reset_clears_log() {
    let host = Arc::new(ScriptedHost::with_screen(search_screen()));
    let oracle = Arc::new(ScriptedOracle::replying(&[
        "NAVIGATE_BACK||null|leave",
        "TASK_COMPLETE||null|left",
    ]));
    let mut agent = agent(&host, &oracle);

    assert_eq!(agent.run("go back").await, AgentState::Success);
    assert_eq!(agent.executed_steps().len(), 1);

    agent.reset();
    assert_eq!(agent.state(), AgentState::Idle);
    assert!(agent.executed_steps().is_empty());
    assert!(agent.history().is_empty());
}
