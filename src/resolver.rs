//! Locating live nodes for a step's target.
//!
//! These are pure queries over a freshly captured snapshot; callers re-capture
//! on every attempt since the UI may have changed since the oracle saw it.

use crate::dom::{self, ElementType};
use crate::ui::{NodePath, UiNode};

/// A node found in a snapshot, kept together with the snapshot so its
/// ancestors stay reachable.
#[derive(Debug, Clone)]
pub struct Located {
    root: UiNode,
    path: NodePath,
}

impl Located {
    pub fn new(root: UiNode, path: NodePath) -> Self {
        Self { root, path }
    }

    pub fn root(&self) -> &UiNode {
        &self.root
    }

    pub fn path(&self) -> &[usize] {
        &self.path
    }

    pub fn node(&self) -> &UiNode {
        // The path was produced by walking this root.
        self.root.node_at(&self.path).unwrap_or(&self.root)
    }

    /// Nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = &UiNode> {
        self.root.ancestors_of(&self.path)
    }

    /// The node itself when clickable, otherwise its nearest clickable ancestor.
    pub fn click_target(&self) -> &UiNode {
        let node = self.node();
        if node.clickable {
            return node;
        }
        self.ancestors().find(|a| a.clickable).unwrap_or(node)
    }
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn matches_text(node: &UiNode, needle: &str, exact: bool) -> bool {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return false;
    }
    [node.text(), node.desc(), node.id(), node.short_id()]
        .into_iter()
        .flatten()
        .any(|field| {
            if exact {
                field.trim().to_lowercase() == needle
            } else {
                contains_ci(field, &needle)
            }
        })
}

/// First node, in document order, whose text, description or resource id
/// matches `text` (case-insensitive).
pub fn find_by_text(root: &UiNode, text: &str, exact: bool) -> Option<NodePath> {
    root.walk()
        .into_iter()
        .find(|(_, node)| matches_text(node, text, exact))
        .map(|(path, _)| path)
}

/// First editable node; with a hint, one whose text, description, hint text
/// or id mentions it.
pub fn find_editable(root: &UiNode, hint: Option<&str>) -> Option<NodePath> {
    let hint = hint
        .map(|h| h.trim().to_lowercase())
        .filter(|h| !h.is_empty());
    root.walk()
        .into_iter()
        .filter(|(_, node)| node.editable)
        .find(|(_, node)| match &hint {
            None => true,
            Some(h) => [node.text(), node.desc(), node.hint(), node.id()]
                .into_iter()
                .flatten()
                .any(|field| contains_ci(field, h)),
        })
        .map(|(path, _)| path)
}

/// Does a list item belong to `category`? Uses the same subtree typing the
/// serializer shows as `type`, so an item's `index` resolves back to it.
/// Unknown categories match everything.
pub fn category_matches(item: &UiNode, category: &str) -> bool {
    let wanted = match category.trim().to_lowercase().as_str() {
        "video" | "videos" => ElementType::Video,
        "button" | "buttons" => ElementType::Button,
        "search_field" => ElementType::SearchField,
        "input" | "inputs" => ElementType::Input,
        _ => return true,
    };
    dom::item_type(item) == Some(wanted)
}

/// The `index`-th (zero-based) item of `category` in the first list
/// container, in document order, that has enough of them. Items are the
/// nodes the serializer indexes, see [`dom::list_items`].
pub fn find_by_list_index(root: &UiNode, category: &str, index: usize) -> Option<NodePath> {
    let mut path = Vec::new();
    search_list(root, category, index, &mut path)
}

fn search_list(
    node: &UiNode,
    category: &str,
    index: usize,
    path: &mut NodePath,
) -> Option<NodePath> {
    if node.is_list_container() {
        let hit = dom::list_items(node)
            .into_iter()
            .filter(|(_, item)| category_matches(item, category))
            .nth(index);
        if let Some((relative, _)) = hit {
            let mut found = path.clone();
            found.extend(relative);
            return Some(found);
        }
    }
    for (i, child) in node.children.iter().enumerate() {
        path.push(i);
        let found = search_list(child, category, index, path);
        path.pop();
        if found.is_some() {
            return found;
        }
    }
    None
}
