use std::collections::HashSet;

use tracing::debug;

use crate::dom::{Document, DocumentExt, NodeId};
use crate::error::{DomError, DomResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Target {
    Style(String),
    Attribute(String),
}

#[derive(Debug, Clone)]
struct Original {
    node: NodeId,
    target: Target,
    value: Option<String>,
}

/// Transformation records owned by one applicator.
///
/// Every host write goes through the ledger, which remembers the value it replaced the first time
/// a (node, property) pair is touched. Nodes the applicator creates are tracked too. `restore`
/// walks the records backwards and drains them, so nothing survives into the next activation.
#[derive(Debug, Default)]
pub struct StyleLedger {
    originals: Vec<Original>,
    touched: HashSet<(NodeId, Target)>,
    owned: Vec<NodeId>,
}

impl StyleLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn remember(&mut self, node: NodeId, target: Target, value: Option<String>) {
        if self.touched.insert((node, target.clone())) {
            self.originals.push(Original {
                node,
                target,
                value,
            });
        }
    }

    /// Set one inline style property, recording the prior inline value
    pub fn set_style(
        &mut self,
        doc: &mut dyn Document,
        node: NodeId,
        property: &str,
        value: &str,
    ) -> DomResult<()> {
        if !doc.is_connected(node) {
            return Err(node.gone());
        }
        let previous = doc.style_property(node, property);
        doc.set_style_property(node, property, value)?;
        self.remember(node, Target::Style(property.to_string()), previous);
        Ok(())
    }

    /// Set an attribute, recording the prior value (or its absence)
    pub fn set_attribute(
        &mut self,
        doc: &mut dyn Document,
        node: NodeId,
        name: &str,
        value: &str,
    ) -> DomResult<()> {
        if !doc.is_connected(node) {
            return Err(node.gone());
        }
        let previous = doc.attribute(node, name);
        doc.set_attribute(node, name, value)?;
        self.remember(node, Target::Attribute(name.to_string()), previous);
        Ok(())
    }

    /// Create an engine-owned element under the body (or root)
    pub fn attach(&mut self, doc: &mut dyn Document, tag: &str, role: &str) -> DomResult<NodeId> {
        let node = doc.attach_owned(tag, role)?;
        self.owned.push(node);
        Ok(node)
    }

    /// Create an engine-owned element as the first child of `parent`
    pub fn attach_first(
        &mut self,
        doc: &mut dyn Document,
        parent: NodeId,
        tag: &str,
        role: &str,
    ) -> DomResult<NodeId> {
        let node = doc.create_element(tag)?;
        doc.set_attribute(node, crate::dom::tags::OWNED, role)?;
        doc.prepend_child(parent, node)?;
        self.owned.push(node);
        Ok(node)
    }

    /// Track a node created elsewhere so that restore removes it
    pub fn adopt(&mut self, node: NodeId) {
        self.owned.push(node);
    }

    /// Remove one owned node early
    pub fn release(&mut self, doc: &mut dyn Document, node: NodeId) {
        self.owned.retain(|&n| n != node);
        remove_quietly(doc, node);
    }

    pub fn owned(&self) -> &[NodeId] {
        &self.owned
    }

    pub fn has_touched(&self, node: NodeId) -> bool {
        self.originals.iter().any(|o| o.node == node)
    }

    pub fn is_empty(&self) -> bool {
        self.originals.is_empty() && self.owned.is_empty()
    }

    /// Reverse every recorded mutation, newest first.
    ///
    /// Nodes the host removed meanwhile are skipped. Returns the number of writes that could
    /// not be reverted for any other reason.
    pub fn restore(&mut self, doc: &mut dyn Document) -> usize {
        let mut failures = 0;

        for node in self.owned.drain(..).rev() {
            remove_quietly(doc, node);
        }

        for original in self.originals.drain(..).rev() {
            if !doc.is_connected(original.node) {
                continue;
            }
            let result = match (&original.target, &original.value) {
                (Target::Style(property), Some(value)) => {
                    doc.set_style_property(original.node, property, value)
                }
                (Target::Style(property), None) => {
                    doc.remove_style_property(original.node, property)
                }
                (Target::Attribute(name), Some(value)) => {
                    doc.set_attribute(original.node, name, value)
                }
                (Target::Attribute(name), None) => doc.remove_attribute(original.node, name),
            };
            match result {
                Ok(()) | Err(DomError::NodeGone { .. }) => {}
                Err(e) => {
                    debug!("Could not restore {:?} on {:?}: {}", original.target, original.node, e);
                    failures += 1;
                }
            }
        }

        self.touched.clear();
        failures
    }
}

fn remove_quietly(doc: &mut dyn Document, node: NodeId) {
    if doc.parent(node).is_none() {
        return;
    }
    if let Err(e) = doc.remove_node(node) {
        debug!("Owned node {:?} already gone: {}", node, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDocument;

    #[test]
    fn test_restore_keeps_first_original() {
        let mut doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        doc.set_attribute(body, "style", "color: red;").unwrap();

        let mut ledger = StyleLedger::new();
        ledger.set_style(&mut doc, body, "color", "blue").unwrap();
        ledger.set_style(&mut doc, body, "color", "green").unwrap();
        ledger.set_style(&mut doc, body, "cursor", "wait").unwrap();
        ledger.set_attribute(&mut doc, body, "data-retro-font", "1").unwrap();

        assert_eq!(ledger.restore(&mut doc), 0);
        assert_eq!(doc.attribute(body, "style").as_deref(), Some("color: red;"));
        assert_eq!(doc.attribute(body, "data-retro-font"), None);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_restore_removes_owned_nodes() {
        let mut doc = MemoryDocument::new();
        let mut ledger = StyleLedger::new();
        let overlay = ledger.attach(&mut doc, "div", "overlay").unwrap();
        let head = doc.head().unwrap();
        let sheet = ledger.attach_first(&mut doc, head, "style", "sheet").unwrap();

        ledger.restore(&mut doc);
        assert!(!doc.is_connected(overlay));
        assert!(!doc.is_connected(sheet));
    }

    #[test]
    fn test_restore_skips_vanished_nodes() {
        let mut doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let div = doc.append_element(body, "div").unwrap();

        let mut ledger = StyleLedger::new();
        ledger.set_style(&mut doc, div, "color", "blue").unwrap();
        doc.remove_node(div).unwrap();
        assert_eq!(ledger.restore(&mut doc), 0);
    }

    #[test]
    fn test_writes_to_disconnected_nodes_fail() {
        let mut doc = MemoryDocument::new();
        let orphan = doc.create_element("div").unwrap();
        let mut ledger = StyleLedger::new();
        assert!(ledger.set_style(&mut doc, orphan, "color", "red").is_err());
        assert!(ledger.is_empty());
    }
}
