use std::collections::{HashMap, HashSet};

use super::{Document, InlineStyle, MutationRecord, NodeId, Rect, Size};
use crate::error::{DomError, DomResult};

const DEFAULT_VIEWPORT: Size = Size {
    width: 1280.0,
    height: 800.0,
};

/// Properties that inherit down the tree when a node sets nothing itself
const INHERITED: &[&str] = &["cursor", "font-family", "color", "visibility"];

#[derive(Debug, Clone, Default)]
struct NodeData {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    text: Option<String>,
    rect: Option<Rect>,
    /// Stylesheet-level values, consulted after the inline style
    sheet: HashMap<String, String>,
}

/// Arena-backed host document.
///
/// Behaves like a live page for the engine's purposes: mutations on connected nodes are queued
/// as [`MutationRecord`]s, layout boxes and stylesheet values are whatever the page author set,
/// and the host can refuse specific attribute or style writes to emulate a restrictive policy.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    nodes: HashMap<NodeId, NodeData>,
    next_id: u64,
    root: Option<NodeId>,
    head: Option<NodeId>,
    body: Option<NodeId>,
    title: String,
    location: String,
    viewport: Size,
    scroll_y: f64,
    document_height: Option<f64>,
    csp: Option<String>,
    globals: HashSet<String>,
    shadow_roots: HashSet<NodeId>,
    mutations: Vec<MutationRecord>,
    denied_attributes: HashSet<String>,
    denied_style_properties: HashSet<String>,
    frozen: HashSet<NodeId>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// A blank page: `<html><head></head><body></body></html>`
    pub fn new() -> Self {
        let mut doc = Self::without_root();
        let root = doc.alloc("html");
        let head = doc.alloc("head");
        let body = doc.alloc("body");
        doc.link(root, head);
        doc.link(root, body);
        doc.root = Some(root);
        doc.head = Some(head);
        doc.body = Some(body);
        doc
    }

    /// A document with no root element at all
    pub fn without_root() -> Self {
        Self {
            nodes: HashMap::new(),
            next_id: 1,
            root: None,
            head: None,
            body: None,
            title: String::new(),
            location: "about:blank".to_string(),
            viewport: DEFAULT_VIEWPORT,
            scroll_y: 0.0,
            document_height: None,
            csp: None,
            globals: HashSet::new(),
            shadow_roots: HashSet::new(),
            mutations: Vec::new(),
            denied_attributes: HashSet::new(),
            denied_style_properties: HashSet::new(),
            frozen: HashSet::new(),
        }
    }

    fn alloc(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            NodeData {
                tag: tag.to_ascii_lowercase(),
                ..NodeData::default()
            },
        );
        id
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        if let Some(data) = self.nodes.get_mut(&child) {
            data.parent = Some(parent);
        }
        if let Some(data) = self.nodes.get_mut(&parent) {
            data.children.push(child);
        }
    }

    fn detach(&mut self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get_mut(&node)?.parent.take()?;
        if let Some(data) = self.nodes.get_mut(&parent) {
            data.children.retain(|&c| c != node);
        }
        Some(parent)
    }

    fn data(&self, node: NodeId) -> DomResult<&NodeData> {
        self.nodes.get(&node).ok_or(node.gone())
    }

    fn data_mut(&mut self, node: NodeId) -> DomResult<&mut NodeData> {
        self.nodes.get_mut(&node).ok_or(node.gone())
    }

    fn record(&mut self, node: NodeId, record: MutationRecord) {
        if self.is_connected(node) {
            self.mutations.push(record);
        }
    }

    fn is_ancestor_or_self(&self, candidate: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == candidate {
                return true;
            }
            current = self.nodes.get(&n).and_then(|d| d.parent);
        }
        false
    }

    fn check_style_policy(&self, node: NodeId, new_value: &str) -> DomResult<()> {
        if self.denied_style_properties.is_empty() {
            return Ok(());
        }
        let old = InlineStyle::parse(
            &self
                .nodes
                .get(&node)
                .and_then(|d| d.attrs.iter().find(|(k, _)| k == "style"))
                .map(|(_, v)| v.clone())
                .unwrap_or_default(),
        );
        let new = InlineStyle::parse(new_value);
        for property in &self.denied_style_properties {
            if old.get(property) != new.get(property) {
                return Err(DomError::PolicyRestricted {
                    action: format!("style.{}", property),
                    reason: "blocked by host policy".to_string(),
                });
            }
        }
        Ok(())
    }

    fn default_style(&self, data: &NodeData, property: &str) -> Option<String> {
        let value = match property {
            "display" => {
                if data.attrs.iter().any(|(k, _)| k == "hidden") {
                    "none"
                } else {
                    match data.tag.as_str() {
                        "a" | "span" | "img" | "button" | "input" | "select" | "textarea"
                        | "label" | "strong" | "em" | "b" | "i" => "inline",
                        "head" | "script" | "style" | "title" | "meta" => "none",
                        _ => "block",
                    }
                }
            }
            "position" => "static",
            "z-index" => "auto",
            "pointer-events" => "auto",
            "visibility" => "visible",
            "cursor" => "auto",
            "opacity" => "1",
            _ => return None,
        };
        Some(value.to_string())
    }

    // ==========================================
    // HOST-SIDE SETUP
    // ==========================================

    /// Create an element and append it to `parent`
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> DomResult<NodeId> {
        let node = self.create_element(tag)?;
        self.append_child(parent, node)?;
        Ok(node)
    }

    pub fn set_rect(&mut self, node: NodeId, rect: Rect) -> DomResult<()> {
        self.data_mut(node)?.rect = Some(rect);
        Ok(())
    }

    /// Set a stylesheet-level (non-inline) property value
    pub fn set_sheet_style(&mut self, node: NodeId, property: &str, value: &str) -> DomResult<()> {
        self.data_mut(node)?
            .sheet
            .insert(property.to_string(), value.to_string());
        Ok(())
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = Size { width, height };
    }

    pub fn set_scroll_y(&mut self, scroll_y: f64) {
        self.scroll_y = scroll_y;
    }

    pub fn set_document_height(&mut self, height: f64) {
        self.document_height = Some(height);
    }

    pub fn set_location(&mut self, location: &str) {
        self.location = location.to_string();
    }

    pub fn set_content_security_policy(&mut self, policy: &str) {
        self.csp = Some(policy.to_string());
    }

    pub fn add_global(&mut self, name: &str) {
        self.globals.insert(name.to_string());
    }

    pub fn attach_shadow_root(&mut self, host: NodeId) -> DomResult<()> {
        self.data(host)?;
        self.shadow_roots.insert(host);
        Ok(())
    }

    /// Refuse every write to the named attribute
    pub fn deny_attribute(&mut self, name: &str) {
        self.denied_attributes.insert(name.to_string());
    }

    /// Refuse every attribute change on one node
    pub fn freeze_node(&mut self, node: NodeId) {
        self.frozen.insert(node);
    }

    fn check_frozen(&self, node: NodeId, action: &str) -> DomResult<()> {
        if self.frozen.contains(&node) {
            return Err(DomError::PolicyRestricted {
                action: action.to_string(),
                reason: "node is frozen by the host".to_string(),
            });
        }
        Ok(())
    }

    /// Refuse inline writes to the named style property
    pub fn deny_style_property(&mut self, property: &str) {
        self.denied_style_properties.insert(property.to_string());
    }

    /// Client-side navigation through the history API
    pub fn push_state(&mut self, url: &str) {
        self.location = url.to_string();
    }

    /// Remove every child of the body, as a router swapping views does
    pub fn clear_body(&mut self) -> DomResult<()> {
        let body = self.body.ok_or(DomError::MissingRoot)?;
        for child in self.children(body) {
            self.remove_node(child)?;
        }
        Ok(())
    }

    /// Connected nodes currently carrying an attribute
    pub fn nodes_with_attribute(&self, name: &str) -> Vec<NodeId> {
        let mut found: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(id, data)| {
                data.attrs.iter().any(|(k, _)| k == name) && self.is_connected(**id)
            })
            .map(|(id, _)| *id)
            .collect();
        found.sort();
        found
    }

    /// Connected nodes carrying any engine attribute
    pub fn engine_tagged_nodes(&self) -> Vec<NodeId> {
        let mut found: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(id, data)| {
                data.attrs
                    .iter()
                    .any(|(k, _)| super::tags::is_engine_attribute(k))
                    && self.is_connected(**id)
            })
            .map(|(id, _)| *id)
            .collect();
        found.sort();
        found
    }

    pub fn connected_count(&self) -> usize {
        self.nodes.keys().filter(|id| self.is_connected(**id)).count()
    }
}

impl Document for MemoryDocument {
    fn root(&self) -> Option<NodeId> {
        self.root
    }

    fn body(&self) -> Option<NodeId> {
        self.body.filter(|b| self.is_connected(*b))
    }

    fn head(&self) -> Option<NodeId> {
        self.head.filter(|h| self.is_connected(*h))
    }

    fn is_connected(&self, node: NodeId) -> bool {
        match self.root {
            Some(root) => self.is_ancestor_or_self(root, node),
            None => false,
        }
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        self.nodes.get(&node).map(|d| d.tag.clone())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|d| d.parent)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&node)
            .map(|d| d.children.clone())
            .unwrap_or_default()
    }

    fn text(&self, node: NodeId) -> Option<String> {
        self.nodes.get(&node).and_then(|d| d.text.clone())
    }

    fn set_text(&mut self, node: NodeId, text: &str) -> DomResult<()> {
        let data = self.data_mut(node)?;
        if data.text.as_deref() == Some(text) {
            return Ok(());
        }
        data.text = Some(text.to_string());
        self.record(node, MutationRecord::CharacterData { target: node });
        Ok(())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.nodes
            .get(&node)?
            .attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }

    fn attribute_names(&self, node: NodeId) -> Vec<String> {
        self.nodes
            .get(&node)
            .map(|d| d.attrs.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default()
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> DomResult<()> {
        self.check_frozen(node, &format!("setAttribute({})", name))?;
        if self.denied_attributes.contains(name) {
            return Err(DomError::PolicyRestricted {
                action: format!("setAttribute({})", name),
                reason: "blocked by host policy".to_string(),
            });
        }
        if name == "style" {
            self.check_style_policy(node, value)?;
        }
        let data = self.data_mut(node)?;
        match data.attrs.iter_mut().find(|(k, _)| k == name) {
            Some(entry) if entry.1 == value => return Ok(()),
            Some(entry) => entry.1 = value.to_string(),
            None => data.attrs.push((name.to_string(), value.to_string())),
        }
        self.record(
            node,
            MutationRecord::Attributes {
                target: node,
                name: name.to_string(),
            },
        );
        Ok(())
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> DomResult<()> {
        self.check_frozen(node, &format!("removeAttribute({})", name))?;
        if name == "style" {
            self.check_style_policy(node, "")?;
        }
        let data = self.data_mut(node)?;
        let before = data.attrs.len();
        data.attrs.retain(|(k, _)| k != name);
        if data.attrs.len() != before {
            self.record(
                node,
                MutationRecord::Attributes {
                    target: node,
                    name: name.to_string(),
                },
            );
        }
        Ok(())
    }

    fn computed_style(&self, node: NodeId, property: &str) -> Option<String> {
        if !self.is_connected(node) {
            return None;
        }
        let data = self.nodes.get(&node)?;
        if let Some(inline) = data
            .attrs
            .iter()
            .find(|(k, _)| k == "style")
            .and_then(|(_, v)| InlineStyle::parse(v).get(property).map(str::to_string))
        {
            return Some(inline);
        }
        if let Some(value) = data.sheet.get(property) {
            return Some(value.clone());
        }
        if INHERITED.contains(&property) {
            if let Some(inherited) = data.parent.and_then(|p| self.computed_style(p, property)) {
                return Some(inherited);
            }
        }
        self.default_style(data, property)
    }

    fn bounding_rect(&self, node: NodeId) -> Option<Rect> {
        if !self.is_connected(node) {
            return None;
        }
        Some(self.nodes.get(&node)?.rect.unwrap_or_default())
    }

    fn viewport(&self) -> Size {
        self.viewport
    }

    fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    fn document_height(&self) -> f64 {
        if let Some(height) = self.document_height {
            return height;
        }
        let tallest = self
            .nodes
            .values()
            .filter_map(|d| d.rect)
            .map(|r| r.bottom() + self.scroll_y)
            .fold(0.0_f64, f64::max);
        tallest.max(self.viewport.height)
    }

    fn create_element(&mut self, tag: &str) -> DomResult<NodeId> {
        if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(DomError::InvalidOperation {
                details: format!("invalid tag name '{}'", tag),
            });
        }
        Ok(self.alloc(tag))
    }

    fn clone_node(&mut self, node: NodeId, deep: bool) -> DomResult<NodeId> {
        let source = self.data(node)?.clone();
        let copy = self.alloc(&source.tag);
        if let Some(data) = self.nodes.get_mut(&copy) {
            data.attrs = source.attrs.clone();
            data.text = source.text.clone();
            data.rect = source.rect;
            data.sheet = source.sheet.clone();
        }
        if deep {
            for child in source.children {
                let child_copy = self.clone_node(child, true)?;
                self.link(copy, child_copy);
            }
        }
        Ok(copy)
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.data(parent)?;
        self.data(child)?;
        if self.is_ancestor_or_self(child, parent) {
            return Err(DomError::InvalidOperation {
                details: "cannot append a node inside itself".to_string(),
            });
        }
        if let Some(old_parent) = self.detach(child) {
            self.record(
                old_parent,
                MutationRecord::ChildList {
                    target: old_parent,
                    added: vec![],
                    removed: vec![child],
                },
            );
        }
        self.link(parent, child);
        self.record(
            parent,
            MutationRecord::ChildList {
                target: parent,
                added: vec![child],
                removed: vec![],
            },
        );
        Ok(())
    }

    fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.append_child(parent, child)?;
        let data = self.data_mut(parent)?;
        data.children.retain(|&c| c != child);
        data.children.insert(0, child);
        Ok(())
    }

    fn remove_node(&mut self, node: NodeId) -> DomResult<()> {
        self.data(node)?;
        if Some(node) == self.root {
            return Err(DomError::InvalidOperation {
                details: "cannot remove the document root".to_string(),
            });
        }
        let connected = self.is_connected(node);
        if let Some(parent) = self.detach(node) {
            if connected {
                self.mutations.push(MutationRecord::ChildList {
                    target: parent,
                    added: vec![],
                    removed: vec![node],
                });
            }
        }
        Ok(())
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn set_title(&mut self, title: &str) -> DomResult<()> {
        if self.title != title {
            self.title = title.to_string();
            self.mutations.push(MutationRecord::Title);
        }
        Ok(())
    }

    fn location(&self) -> String {
        self.location.clone()
    }

    fn shadow_root_count(&self) -> usize {
        self.shadow_roots
            .iter()
            .filter(|host| self.is_connected(**host))
            .count()
    }

    fn content_security_policy(&self) -> Option<String> {
        self.csp.clone()
    }

    fn has_global(&self, name: &str) -> bool {
        self.globals.contains(name)
    }

    fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.mutations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::DocumentExt;

    #[test]
    fn test_blank_document_shape() {
        let doc = MemoryDocument::new();
        let root = doc.root().unwrap();
        assert_eq!(doc.tag_name(root).as_deref(), Some("html"));
        assert_eq!(doc.children(root).len(), 2);
        assert!(doc.body().is_some());
        assert_eq!(doc.all_elements().len(), 3);
    }

    #[test]
    fn test_mutations_recorded_for_connected_nodes_only() {
        let mut doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let detached = doc.create_element("div").unwrap();
        doc.set_attribute(detached, "class", "x").unwrap();
        assert!(doc.take_mutations().is_empty());

        doc.append_child(body, detached).unwrap();
        doc.set_attribute(detached, "class", "x").unwrap();
        doc.set_attribute(detached, "class", "y").unwrap();
        let records = doc.take_mutations();
        assert_eq!(records.len(), 2);
        assert!(matches!(records[0], MutationRecord::ChildList { .. }));
        assert!(matches!(records[1], MutationRecord::Attributes { .. }));
    }

    #[test]
    fn test_removed_nodes_are_disconnected() {
        let mut doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let outer = doc.append_element(body, "div").unwrap();
        let inner = doc.append_element(outer, "span").unwrap();
        doc.remove_node(outer).unwrap();
        assert!(!doc.is_connected(inner));
        assert!(doc.bounding_rect(inner).is_none());
        assert!(doc.remove_node(doc.root().unwrap()).is_err());
    }

    #[test]
    fn test_computed_style_cascade() {
        let mut doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let div = doc.append_element(body, "div").unwrap();
        doc.set_sheet_style(body, "cursor", "crosshair").unwrap();
        assert_eq!(doc.computed_style(div, "cursor").as_deref(), Some("crosshair"));

        doc.set_style_property(div, "cursor", "wait").unwrap();
        assert_eq!(doc.computed_style(div, "cursor").as_deref(), Some("wait"));
        assert_eq!(doc.computed_style(div, "z-index").as_deref(), Some("auto"));
        assert_eq!(doc.computed_style(div, "background-color"), None);
    }

    #[test]
    fn test_policy_denial() {
        let mut doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        doc.deny_style_property("cursor");
        doc.set_style_property(body, "color", "red").unwrap();
        let err = doc.set_style_property(body, "cursor", "url(x.cur), auto").unwrap_err();
        assert!(matches!(err, DomError::PolicyRestricted { .. }));
    }

    #[test]
    fn test_deep_clone_is_detached() {
        let mut doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let dialog = doc.append_element(body, "div").unwrap();
        doc.set_attribute(dialog, "role", "dialog").unwrap();
        let child = doc.append_element(dialog, "p").unwrap();
        doc.set_text(child, "Error").unwrap();

        let copy = doc.clone_node(dialog, true).unwrap();
        assert!(!doc.is_connected(copy));
        assert_eq!(doc.attribute(copy, "role").as_deref(), Some("dialog"));
        assert_eq!(doc.text_content(copy), "Error");
    }
}
