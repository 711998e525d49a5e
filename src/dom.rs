use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::ui::{NodePath, UiNode};

/// Limits applied while compressing a window tree.
#[derive(Debug, Clone)]
pub struct SerializerConfig {
    /// Text and description are cut to this many characters, plus "...".
    pub max_text_len: usize,
    /// Assumed display height used for the top/mid/bottom bucket.
    pub display_height: i32,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            max_text_len: 80,
            display_height: 2400,
        }
    }
}

/// "4:32", "1:02:33", "12 minutes, 5 seconds".
static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d{1,2}:\d{2}(?::\d{2})?\b|\b\d+\s+(?:hours?|minutes?|seconds?)\b")
        .expect("duration pattern is valid")
});

/// Semantic role guessed from a node's class, id and content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Video,
    Button,
    SearchField,
    Input,
    List,
}

impl ElementType {
    pub fn as_str(self) -> &'static str {
        match self {
            ElementType::Video => "video",
            ElementType::Button => "button",
            ElementType::SearchField => "search_field",
            ElementType::Input => "input",
            ElementType::List => "list",
        }
    }
}

pub fn looks_like_duration(text: &str) -> bool {
    DURATION.is_match(text)
}

/// Heuristics, first match wins.
pub fn element_type(node: &UiNode) -> Option<ElementType> {
    let id = node.id().unwrap_or_default().to_lowercase();

    if node.desc().is_some_and(looks_like_duration) {
        return Some(ElementType::Video);
    }
    if id.contains("thumbnail") {
        return Some(ElementType::Video);
    }
    if node.editable {
        let text = node.text().unwrap_or_default().to_lowercase();
        let hint = node.hint().unwrap_or_default().to_lowercase();
        if id.contains("search") || text.contains("search") || hint.contains("search") {
            return Some(ElementType::SearchField);
        }
    }
    if node.class_name.contains("Button") {
        return Some(ElementType::Button);
    }
    if node.editable {
        return Some(ElementType::Input);
    }
    if node.is_list_container() {
        return Some(ElementType::List);
    }
    None
}

/// Typed list items are ranked by the strongest role found in their subtree.
const ITEM_PRIORITY: [ElementType; 4] = [
    ElementType::Video,
    ElementType::SearchField,
    ElementType::Input,
    ElementType::Button,
];

/// Role of a list item judged by its whole subtree, nested lists excluded.
/// A row is a video when its duration or thumbnail sits on any descendant.
pub fn item_type(item: &UiNode) -> Option<ElementType> {
    fn collect(node: &UiNode, found: &mut Vec<ElementType>) {
        found.extend(element_type(node));
        for child in node.children.iter().filter(|c| !c.is_list_container()) {
            collect(child, found);
        }
    }
    let mut found = Vec::new();
    collect(item, &mut found);
    ITEM_PRIORITY.into_iter().find(|t| found.contains(t))
}

/// The nodes of `list` that take an `index` when serialized: the first
/// interesting node down each branch, skipping nested lists. Paths are
/// relative to `list`.
pub fn list_items(list: &UiNode) -> Vec<(NodePath, &UiNode)> {
    fn collect<'a>(node: &'a UiNode, path: &mut NodePath, out: &mut Vec<(NodePath, &'a UiNode)>) {
        for (i, child) in node.children.iter().enumerate() {
            path.push(i);
            if !is_interesting(child) {
                collect(child, path, out);
            } else if !child.is_list_container() {
                out.push((path.clone(), child));
            }
            path.pop();
        }
    }
    let mut items = Vec::new();
    collect(list, &mut Vec::new(), &mut items);
    items
}

/// Worth a record in the serialized tree.
pub fn is_interesting(node: &UiNode) -> bool {
    node.text().is_some()
        || node.desc().is_some()
        || node.id().is_some()
        || node.clickable
        || node.editable
        || node.scrollable
        || node.is_list_container()
}

/// One record of the compressed tree. Absent fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SerializedNode {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ElementType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<&'static str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub click: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub scroll: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub edit: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SerializedNode>,
}

/// Per-list ordinal counters, one per element type.
#[derive(Default)]
struct ListCounter {
    next: HashMap<Option<ElementType>, usize>,
}

impl ListCounter {
    fn take(&mut self, kind: Option<ElementType>) -> usize {
        let slot = self.next.entry(kind).or_default();
        let index = *slot;
        *slot += 1;
        index
    }
}

/// Compresses a captured window tree into the compact form sent to the oracle.
pub struct TreeSerializer {
    config: SerializerConfig,
}

impl TreeSerializer {
    pub fn new(config: SerializerConfig) -> Self {
        Self { config }
    }

    /// Build the record list for `root`.
    pub fn compress(&self, root: &UiNode) -> Vec<SerializedNode> {
        let mut out = Vec::new();
        self.visit(root, None, &mut out);
        out
    }

    /// Render `root` as a JSON array of records.
    pub fn serialize(&self, root: &UiNode) -> String {
        let records = self.compress(root);
        // Only strings, integers and bools: cannot fail.
        serde_json::to_string(&records).unwrap_or_else(|_| "[]".to_string())
    }

    /// `list` is the counter of the nearest enclosing list whose flag has not
    /// yet been consumed by an interesting node.
    fn visit(&self, node: &UiNode, list: Option<&mut ListCounter>, out: &mut Vec<SerializedNode>) {
        if !is_interesting(node) {
            // Elided: children are hoisted and keep the list flag.
            match list {
                Some(counter) => {
                    for child in &node.children {
                        self.visit(child, Some(&mut *counter), out);
                    }
                }
                None => {
                    for child in &node.children {
                        self.visit(child, None, out);
                    }
                }
            }
            return;
        }

        let is_list = node.is_list_container();
        // Indexed items are typed the way CLICK_INDEX resolves them.
        let (kind, index) = match list {
            Some(counter) if !is_list => {
                let kind = item_type(node);
                (kind, Some(counter.take(kind)))
            }
            _ => (element_type(node), None),
        };

        let mut children = Vec::new();
        if is_list {
            let mut counter = ListCounter::default();
            for child in &node.children {
                self.visit(child, Some(&mut counter), &mut children);
            }
        } else {
            for child in &node.children {
                self.visit(child, None, &mut children);
            }
        }

        out.push(SerializedNode {
            kind,
            index,
            text: node.text().map(|t| self.truncate(t)),
            desc: node.desc().map(|d| self.truncate(d)),
            id: node.short_id().map(str::to_string),
            pos: Some(self.position(node)),
            click: node.clickable,
            scroll: node.scrollable,
            edit: node.editable,
            children,
        });
    }

    fn truncate(&self, text: &str) -> String {
        let text = text.trim();
        if text.chars().count() <= self.config.max_text_len {
            return text.to_string();
        }
        let mut cut: String = text.chars().take(self.config.max_text_len).collect();
        cut.push_str("...");
        cut
    }

    fn position(&self, node: &UiNode) -> &'static str {
        let third = self.config.display_height / 3;
        let y = node.bounds.center_y();
        if y < third {
            "top"
        } else if y < third * 2 {
            "mid"
        } else {
            "bottom"
        }
    }
}

impl Default for TreeSerializer {
    fn default() -> Self {
        Self::new(SerializerConfig::default())
    }
}
