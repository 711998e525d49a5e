#![allow(dead_code)]

use async_trait::async_trait;
use phone_pilot::{
    Bounds, DecisionOracle, DecisionRequest, HostError, OracleError, OracleReply, Screenshot,
    UiHost, UiNode,
};
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory host. Each capture takes the next queued screen; the last one
/// stays up. With no screens at all the host reports itself unavailable.
#[derive(Default)]
pub struct ScriptedHost {
    screens: Mutex<VecDeque<UiNode>>,
    pub captures: AtomicUsize,
    pub ops: Mutex<Vec<String>>,
    /// Handles whose click / set_text is rejected.
    pub rejecting: Mutex<HashSet<u64>>,
    pub installed: Mutex<HashSet<String>>,
    pub screenshot: bool,
}

impl ScriptedHost {
    pub fn new(screens: Vec<UiNode>) -> Self {
        Self {
            screens: Mutex::new(screens.into()),
            ..Default::default()
        }
    }

    pub fn with_screen(screen: UiNode) -> Self {
        Self::new(vec![screen])
    }

    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn reject(self, handle: u64) -> Self {
        self.rejecting.lock().unwrap().insert(handle);
        self
    }

    pub fn install(self, package: &str) -> Self {
        self.installed.lock().unwrap().insert(package.to_string());
        self
    }

    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }

    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    fn record(&self, op: String, handle: Option<u64>) -> bool {
        self.ops.lock().unwrap().push(op);
        handle.is_none_or(|h| !self.rejecting.lock().unwrap().contains(&h))
    }
}

#[async_trait]
impl UiHost for ScriptedHost {
    async fn capture_snapshot(&self) -> Result<UiNode, HostError> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        let mut screens = self.screens.lock().unwrap();
        if screens.len() > 1 {
            Ok(screens.pop_front().unwrap())
        } else {
            screens.front().cloned().ok_or(HostError::Unavailable)
        }
    }

    async fn capture_screenshot(&self) -> Result<Screenshot, HostError> {
        if self.screenshot {
            Ok(Screenshot {
                png: vec![0x89, b'P', b'N', b'G'],
                width: 1080,
                height: 2400,
            })
        } else {
            Err(HostError::Screenshot("disabled".to_string()))
        }
    }

    async fn click(&self, node: &UiNode) -> bool {
        self.record(format!("click:{}", node.handle), Some(node.handle))
    }

    async fn set_text(&self, node: &UiNode, text: &str) -> bool {
        self.record(format!("set_text:{}:{}", node.handle, text), Some(node.handle))
    }

    async fn scroll_forward(&self, node: &UiNode) -> bool {
        self.record(format!("scroll_forward:{}", node.handle), None)
    }

    async fn scroll_backward(&self, node: &UiNode) -> bool {
        self.record(format!("scroll_backward:{}", node.handle), None)
    }

    async fn global_back(&self) -> bool {
        self.record("back".to_string(), None)
    }

    async fn launch_app(&self, package: &str) -> bool {
        self.record(format!("launch:{}", package), None);
        self.installed.lock().unwrap().contains(package)
    }
}

/// Replies in order; once exhausted keeps answering with a harmless WAIT.
#[derive(Default)]
pub struct ScriptedOracle {
    replies: Mutex<VecDeque<Result<OracleReply, OracleError>>>,
    plan: Mutex<Option<Result<String, OracleError>>>,
    /// History text seen on each decide call.
    pub histories: Mutex<Vec<String>>,
    pub trees: Mutex<Vec<String>>,
    pub screenshots: AtomicUsize,
}

impl ScriptedOracle {
    pub fn replying(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(
                replies
                    .iter()
                    .map(|r| Ok(OracleReply::from_content(r)))
                    .collect(),
            ),
            ..Default::default()
        }
    }

    pub fn failing(error: OracleError) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([Err(error)])),
            ..Default::default()
        }
    }

    pub fn with_plan(plan: Result<String, OracleError>) -> Self {
        Self {
            plan: Mutex::new(Some(plan)),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.histories.lock().unwrap().len()
    }
}

#[async_trait]
impl DecisionOracle for ScriptedOracle {
    async fn generate_plan(&self, _command: &str) -> Result<String, OracleError> {
        self.plan.lock().unwrap().take().unwrap_or(Err(OracleError::Empty))
    }

    async fn decide_next_step(&self, request: DecisionRequest<'_>) -> Result<OracleReply, OracleError> {
        self.histories.lock().unwrap().push(request.history.to_string());
        self.trees.lock().unwrap().push(request.ui_tree.to_string());
        if request.screenshot.is_some() {
            self.screenshots.fetch_add(1, Ordering::SeqCst);
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(OracleReply::Text("WAIT|0|null|nothing to do".to_string())))
    }
}

pub fn row(top: i32) -> Bounds {
    Bounds::new(0, top, 1080, top + 200)
}

/// A search screen: toolbar with a search field and a send button, a list
/// of results below, one of them a plain row and three of them videos.
///
/// Handles: root 1, toolbar 2, field 3, send 4, list 10, rows 11..
pub fn search_screen() -> UiNode {
    let video = |handle: u64, title: &str, duration: &str| {
        UiNode::new("android.view.ViewGroup")
            .with_handle(handle)
            .clickable()
            .with_bounds(row(600 + (handle as i32 - 11) * 200))
            .with_children(vec![
                UiNode::new("android.widget.TextView").with_handle(handle * 10).with_text(title),
                UiNode::new("android.widget.ImageView")
                    .with_handle(handle * 10 + 1)
                    .with_desc(duration),
            ])
    };
    let plain = |handle: u64, text: &str| {
        UiNode::new("android.view.ViewGroup")
            .with_handle(handle)
            .clickable()
            .with_children(vec![
                UiNode::new("android.widget.TextView").with_handle(handle * 10).with_text(text),
            ])
    };
    UiNode::new("android.widget.FrameLayout")
        .with_handle(1)
        .with_bounds(Bounds::new(0, 0, 1080, 2400))
        .with_children(vec![
            UiNode::new("android.widget.LinearLayout")
                .with_handle(2)
                .clickable()
                .with_children(vec![
                    UiNode::new("android.widget.EditText")
                        .with_handle(3)
                        .editable()
                        .with_id("com.example:id/search_box")
                        .with_hint("Search"),
                    UiNode::new("android.widget.Button")
                        .with_handle(4)
                        .clickable()
                        .with_text("Send"),
                ]),
            UiNode::new("androidx.recyclerview.widget.RecyclerView")
                .with_handle(10)
                .scrollable()
                .with_children(vec![
                    plain(11, "Channel: lofi girl"),
                    video(12, "lofi hip hop radio", "3:12:04"),
                    plain(13, "Shorts"),
                    video(14, "beats to study", "45:10"),
                    video(15, "rainy night", "1:00:00"),
                ]),
        ])
}
