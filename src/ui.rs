use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::HostError;
use crate::resolver::{self, Located};

/// Class-name fragments that mark a scrollable collection.
pub const LIST_CLASSES: &[&str] = &["RecyclerView", "ListView", "GridView"];

/// Screen rectangle in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn center_y(&self) -> i32 {
        (self.top + self.bottom) / 2
    }
}

/// Child indices leading from the snapshot root to a node.
pub type NodePath = Vec<usize>;

/// Read-only view of one element in a captured window tree.
///
/// The snapshot is owned by whoever captured it; `handle` is opaque to the
/// core and lets the host map a node back to its live counterpart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiNode {
    pub handle: u64,
    pub class_name: String,
    pub text: Option<String>,
    pub content_desc: Option<String>,
    pub resource_id: Option<String>,
    pub hint_text: Option<String>,
    pub bounds: Bounds,
    pub clickable: bool,
    pub editable: bool,
    pub scrollable: bool,
    pub children: Vec<UiNode>,
}

impl UiNode {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.content_desc = Some(desc.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint_text = Some(hint.into());
        self
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_handle(mut self, handle: u64) -> Self {
        self.handle = handle;
        self
    }

    pub fn clickable(mut self) -> Self {
        self.clickable = true;
        self
    }

    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    pub fn scrollable(mut self) -> Self {
        self.scrollable = true;
        self
    }

    pub fn with_children(mut self, children: Vec<UiNode>) -> Self {
        self.children = children;
        self
    }

    /// Text, ignoring whitespace-only values.
    pub fn text(&self) -> Option<&str> {
        non_blank(self.text.as_deref())
    }

    pub fn desc(&self) -> Option<&str> {
        non_blank(self.content_desc.as_deref())
    }

    pub fn id(&self) -> Option<&str> {
        non_blank(self.resource_id.as_deref())
    }

    pub fn hint(&self) -> Option<&str> {
        non_blank(self.hint_text.as_deref())
    }

    /// Resource id without its `package:id/` prefix.
    pub fn short_id(&self) -> Option<&str> {
        self.id()
            .map(|id| id.rsplit_once('/').map_or(id, |(_, name)| name))
    }

    pub fn is_list_container(&self) -> bool {
        LIST_CLASSES.iter().any(|c| self.class_name.contains(c))
    }

    /// Lists, grids and scroll views: the preferred scroll targets.
    pub fn is_scroll_container(&self) -> bool {
        self.is_list_container() || self.class_name.contains("ScrollView")
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&UiNode> {
        path.iter()
            .try_fold(self, |node, &i| node.children.get(i))
    }

    /// Ancestors of the node at `path`, nearest first, excluding the node itself.
    pub fn ancestors_of<'a>(&'a self, path: &'a [usize]) -> impl Iterator<Item = &'a UiNode> + 'a {
        (0..path.len())
            .rev()
            .filter_map(move |len| self.node_at(&path[..len]))
    }

    /// Depth-first pre-order walk, yielding each node with its path.
    pub fn walk(&self) -> Vec<(NodePath, &UiNode)> {
        let mut out = Vec::new();
        let mut stack: Vec<(NodePath, &UiNode)> = vec![(Vec::new(), self)];
        while let Some((path, node)) = stack.pop() {
            for (i, child) in node.children.iter().enumerate().rev() {
                let mut child_path = path.clone();
                child_path.push(i);
                stack.push((child_path, child));
            }
            out.push((path, node));
        }
        out
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Encoded screen capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Screenshot {
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.png)
    }

    pub fn data_url(&self) -> String {
        format!("data:image/png;base64,{}", self.to_base64())
    }
}

/// The platform's screen-reading and interaction service.
///
/// One handle represents one physical screen. Operations on nodes return
/// `false` when the platform rejects them; snapshot capture reports
/// [`HostError::Unavailable`] when the service is not connected.
#[async_trait]
pub trait UiHost: Send + Sync {
    async fn capture_snapshot(&self) -> Result<UiNode, HostError>;
    async fn capture_screenshot(&self) -> Result<Screenshot, HostError>;

    async fn click(&self, node: &UiNode) -> bool;
    async fn set_text(&self, node: &UiNode, text: &str) -> bool;
    async fn scroll_forward(&self, node: &UiNode) -> bool;
    async fn scroll_backward(&self, node: &UiNode) -> bool;
    async fn global_back(&self) -> bool;
    async fn launch_app(&self, package: &str) -> bool;

    async fn find_by_text(&self, text: &str, exact: bool) -> Option<Located> {
        let root = self.capture_snapshot().await.ok()?;
        let path = resolver::find_by_text(&root, text, exact)?;
        Some(Located::new(root, path))
    }

    async fn find_editable(&self, hint: Option<&str>) -> Option<Located> {
        let root = self.capture_snapshot().await.ok()?;
        let path = resolver::find_editable(&root, hint)?;
        Some(Located::new(root, path))
    }

    async fn find_by_list_index(&self, category: &str, index: usize) -> Option<Located> {
        let root = self.capture_snapshot().await.ok()?;
        let path = resolver::find_by_list_index(&root, category, index)?;
        Some(Located::new(root, path))
    }
}
