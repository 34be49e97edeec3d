//! # Host Document Capability
//!
//! The engine never owns the page it decorates. Everything it knows about the host comes through
//! the [`Document`] trait: a handle that answers queries and accepts mutations, and that may drop
//! or replace any node between two consecutive calls.
//!
//! [`DocumentExt`] layers the conveniences every module needs (selector queries, class lists,
//! inline style editing, ownership checks) on top of the minimal trait surface, and
//! [`MemoryDocument`] is an arena-backed host used by the CLI and the test suite.

pub mod fixture;
pub mod memory;
pub mod selector;
pub mod tags;

pub use fixture::PageFixture;
pub use memory::MemoryDocument;
pub use selector::Selector;

use crate::error::{DomError, DomResult};
use crate::styles::color::Rgb;

/// Opaque handle to a host node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn gone(self) -> DomError {
        DomError::NodeGone { id: self.0 }
    }
}

/// Viewport-relative layout box
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// A single low-level change notification delivered in batches by the host
#[derive(Debug, Clone, PartialEq)]
pub enum MutationRecord {
    ChildList {
        target: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    Attributes {
        target: NodeId,
        name: String,
    },
    CharacterData {
        target: NodeId,
    },
    Title,
}

/// Minimal capability surface the engine needs from a host document.
///
/// Queries return `Option`/empty collections for nodes that no longer exist; mutations return
/// [`DomError::NodeGone`] instead. Hosts that refuse a mutation for policy reasons return
/// [`DomError::PolicyRestricted`].
pub trait Document {
    fn root(&self) -> Option<NodeId>;
    fn body(&self) -> Option<NodeId>;
    fn head(&self) -> Option<NodeId>;

    fn is_connected(&self, node: NodeId) -> bool;
    fn tag_name(&self, node: NodeId) -> Option<String>;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Text directly owned by the node (not its descendants)
    fn text(&self, node: NodeId) -> Option<String>;
    fn set_text(&mut self, node: NodeId, text: &str) -> DomResult<()>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;
    fn attribute_names(&self, node: NodeId) -> Vec<String>;
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> DomResult<()>;
    fn remove_attribute(&mut self, node: NodeId, name: &str) -> DomResult<()>;

    /// Resolved value of a CSS property after cascade
    fn computed_style(&self, node: NodeId, property: &str) -> Option<String>;
    fn bounding_rect(&self, node: NodeId) -> Option<Rect>;
    fn viewport(&self) -> Size;
    fn scroll_y(&self) -> f64;
    fn document_height(&self) -> f64;

    fn create_element(&mut self, tag: &str) -> DomResult<NodeId>;
    fn clone_node(&mut self, node: NodeId, deep: bool) -> DomResult<NodeId>;
    fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()>;
    fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()>;
    fn remove_node(&mut self, node: NodeId) -> DomResult<()>;

    fn title(&self) -> String;
    fn set_title(&mut self, title: &str) -> DomResult<()>;
    fn location(&self) -> String;

    /// Number of isolated sub-trees (shadow roots) attached anywhere in the page
    fn shadow_root_count(&self) -> usize;
    /// Content policy delivered with the page, if any
    fn content_security_policy(&self) -> Option<String>;
    /// Whether the page's script environment exposes a named global
    fn has_global(&self, name: &str) -> bool;

    /// Drain pending mutation records
    fn take_mutations(&mut self) -> Vec<MutationRecord>;
}

/// Convenience layer over [`Document`], implemented for every host
pub trait DocumentExt: Document {
    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).into_iter().rev());
        }
        out
    }

    /// Root plus every connected element in document order
    fn all_elements(&self) -> Vec<NodeId> {
        match self.root() {
            Some(root) => {
                let mut all = vec![root];
                all.extend(self.descendants(root));
                all
            }
            None => Vec::new(),
        }
    }

    fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        selector.matches(self, node)
    }

    fn query_all(&self, selector: &Selector) -> Vec<NodeId> {
        self.all_elements()
            .into_iter()
            .filter(|&n| selector.matches(self, n))
            .collect()
    }

    fn query_within(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        let mut candidates = vec![scope];
        candidates.extend(self.descendants(scope));
        candidates
            .into_iter()
            .filter(|&n| selector.matches(self, n))
            .collect()
    }

    fn has_tag(&self, node: NodeId, tag: &str) -> bool {
        self.tag_name(node).is_some_and(|t| t == tag)
    }

    fn class_list(&self, node: NodeId) -> Vec<String> {
        self.attribute(node, "class")
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.class_list(node).iter().any(|c| c == class)
    }

    fn add_class(&mut self, node: NodeId, class: &str) -> DomResult<()> {
        let mut classes = self.class_list(node);
        if classes.iter().any(|c| c == class) {
            return Ok(());
        }
        classes.push(class.to_string());
        self.set_attribute(node, "class", &classes.join(" "))
    }

    fn remove_class(&mut self, node: NodeId, class: &str) -> DomResult<()> {
        let classes = self.class_list(node);
        if !classes.iter().any(|c| c == class) {
            return Ok(());
        }
        let kept: Vec<String> = classes.into_iter().filter(|c| c != class).collect();
        if kept.is_empty() {
            self.remove_attribute(node, "class")
        } else {
            self.set_attribute(node, "class", &kept.join(" "))
        }
    }

    /// Inline style value for a single property
    fn style_property(&self, node: NodeId, property: &str) -> Option<String> {
        let style = self.attribute(node, "style")?;
        InlineStyle::parse(&style).get(property).map(str::to_string)
    }

    fn set_style_property(&mut self, node: NodeId, property: &str, value: &str) -> DomResult<()> {
        let mut style = InlineStyle::parse(&self.attribute(node, "style").unwrap_or_default());
        style.set(property, value);
        self.set_attribute(node, "style", &style.to_string())
    }

    fn remove_style_property(&mut self, node: NodeId, property: &str) -> DomResult<()> {
        let Some(raw) = self.attribute(node, "style") else {
            return Ok(());
        };
        let mut style = InlineStyle::parse(&raw);
        if !style.remove(property) {
            return Ok(());
        }
        if style.is_empty() {
            self.remove_attribute(node, "style")
        } else {
            self.set_attribute(node, "style", &style.to_string())
        }
    }

    /// Full text of the node and its descendants
    fn text_content(&self, node: NodeId) -> String {
        let mut text = self.text(node).unwrap_or_default();
        for child in self.descendants(node) {
            if let Some(t) = self.text(child) {
                if !text.is_empty() && !t.is_empty() {
                    text.push(' ');
                }
                text.push_str(&t);
            }
        }
        text
    }

    fn is_hidden(&self, node: NodeId) -> bool {
        if !self.is_connected(node) || self.attribute(node, "hidden").is_some() {
            return true;
        }
        if self.has_tag(node, "dialog") && self.attribute(node, "open").is_none() {
            return true;
        }
        if self.attribute(node, "aria-hidden").as_deref() == Some("true") {
            return true;
        }
        let display = self.computed_style(node, "display");
        let visibility = self.computed_style(node, "visibility");
        display.as_deref() == Some("none") || visibility.as_deref() == Some("hidden")
    }

    /// Whether the node, or any ancestor, was created by the engine
    fn is_engine_owned(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if self.attribute(n, tags::OWNED).is_some() {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// First opaque background color walking up from the node; white when none is set
    fn effective_background(&self, node: NodeId) -> Rgb {
        let mut current = Some(node);
        while let Some(n) = current {
            if let Some(color) = self
                .computed_style(n, "background-color")
                .and_then(|raw| Rgb::parse(&raw))
            {
                return color;
            }
            current = self.parent(n);
        }
        Rgb::WHITE
    }

    /// Sampled page background: body first, then the root
    fn page_background(&self) -> Rgb {
        for candidate in [self.body(), self.root()].into_iter().flatten() {
            if let Some(color) = self
                .computed_style(candidate, "background-color")
                .and_then(|raw| Rgb::parse(&raw))
            {
                return color;
            }
        }
        Rgb::WHITE
    }

    /// Absolute top of the node in document coordinates
    fn absolute_rect(&self, node: NodeId) -> Option<Rect> {
        self.bounding_rect(node).map(|r| Rect {
            y: r.y + self.scroll_y(),
            ..r
        })
    }

    /// Attach an engine-owned element under the body (or the root when there is no body)
    fn attach_owned(&mut self, tag: &str, role: &str) -> DomResult<NodeId> {
        let parent = self.body().or_else(|| self.root()).ok_or(DomError::MissingRoot)?;
        let node = self.create_element(tag)?;
        self.set_attribute(node, tags::OWNED, role)?;
        self.append_child(parent, node)?;
        Ok(node)
    }
}

impl<D: Document + ?Sized> DocumentExt for D {}

/// Ordered `property: value` list backing a `style` attribute
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InlineStyle {
    entries: Vec<(String, String)>,
}

impl InlineStyle {
    pub fn parse(raw: &str) -> Self {
        let entries = raw
            .split(';')
            .filter_map(|decl| {
                let (name, value) = decl.split_once(':')?;
                let name = name.trim().to_ascii_lowercase();
                let value = value.trim();
                if name.is_empty() || value.is_empty() {
                    return None;
                }
                Some((name, value.to_string()))
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value.as_str())
    }

    pub fn set(&mut self, property: &str, value: &str) {
        match self.entries.iter_mut().find(|(name, _)| name == property) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((property.to_string(), value.to_string())),
        }
    }

    pub fn remove(&mut self, property: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(name, _)| name != property);
        before != self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Display for InlineStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self
            .entries
            .iter()
            .map(|(name, value)| format!("{}: {};", name, value))
            .collect();
        write!(f, "{}", rendered.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_style_edit() {
        let mut style = InlineStyle::parse("color: red; margin : 0 ;; bogus");
        assert_eq!(style.get("color"), Some("red"));
        assert_eq!(style.get("margin"), Some("0"));

        style.set("color", "blue");
        style.set("cursor", "pointer");
        assert_eq!(style.to_string(), "color: blue; margin: 0; cursor: pointer;");

        assert!(style.remove("margin"));
        assert!(!style.remove("margin"));
        assert_eq!(style.to_string(), "color: blue; cursor: pointer;");
    }

    #[test]
    fn test_class_helpers_on_memory_document() {
        let mut doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let div = doc.create_element("div").unwrap();
        doc.append_child(body, div).unwrap();

        doc.add_class(div, "a").unwrap();
        doc.add_class(div, "b").unwrap();
        doc.add_class(div, "a").unwrap();
        assert_eq!(doc.attribute(div, "class").as_deref(), Some("a b"));

        doc.remove_class(div, "a").unwrap();
        doc.remove_class(div, "b").unwrap();
        assert_eq!(doc.attribute(div, "class"), None);
    }

    #[test]
    fn test_style_helpers_remove_empty_attribute() {
        let mut doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        doc.set_style_property(body, "color", "red").unwrap();
        assert_eq!(doc.style_property(body, "color").as_deref(), Some("red"));
        doc.remove_style_property(body, "color").unwrap();
        assert_eq!(doc.attribute(body, "style"), None);
    }

    #[test]
    fn test_engine_ownership_is_inherited() {
        let mut doc = MemoryDocument::new();
        let owned = doc.attach_owned("div", "banner").unwrap();
        let inner = doc.create_element("span").unwrap();
        doc.append_child(owned, inner).unwrap();

        assert!(doc.is_engine_owned(inner));
        assert!(!doc.is_engine_owned(doc.body().unwrap()));
    }
}
