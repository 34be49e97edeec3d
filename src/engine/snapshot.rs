use tracing::debug;

use crate::dom::{tags, Document, DocumentExt, NodeId, Selector};
use crate::error::{DomError, DomResult};

/// Root state captured before activation and put back verbatim after teardown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    root: NodeId,
    root_class: Option<String>,
    root_style: Option<String>,
    title: String,
}

impl DocumentSnapshot {
    pub fn capture(doc: &dyn Document) -> DomResult<Self> {
        let root = doc.root().ok_or(DomError::MissingRoot)?;
        Ok(Self {
            root,
            root_class: doc.attribute(root, "class"),
            root_style: doc.attribute(root, "style"),
            title: doc.title(),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn restore(&self, doc: &mut dyn Document) -> DomResult<()> {
        for (name, value) in [("class", &self.root_class), ("style", &self.root_style)] {
            match value {
                Some(value) => doc.set_attribute(self.root, name, value)?,
                None => doc.remove_attribute(self.root, name)?,
            }
        }
        if doc.title() != self.title {
            doc.set_title(&self.title)?;
        }
        Ok(())
    }
}

/// Natively interactive nodes that must stay clickable above the decorations
pub const INTERACTIVE_SELECTORS: &str = "a[href], button, input, select, textarea, summary, \
label[for], [role=button], [role=link], [tabindex], [contenteditable=true]";

const BOOSTED_PROPERTIES: [&str; 3] = ["z-index", "position", "pointer-events"];

#[derive(Debug, Clone)]
struct Boosted {
    node: NodeId,
    /// Inline values of [`BOOSTED_PROPERTIES`] before the boost, in the same order
    originals: [Option<String>; 3],
}

/// Lifts interactive controls above engine decorations and forces them clickable.
///
/// Only nodes that would otherwise sit behind a decoration or ignore the pointer are touched,
/// and each keeps its original inline values for an exact restore.
pub struct InteractiveBoost {
    selector: Selector,
    boosted: Vec<Boosted>,
}

impl InteractiveBoost {
    pub fn new() -> Self {
        Self {
            selector: Selector::parse(INTERACTIVE_SELECTORS),
            boosted: Vec::new(),
        }
    }

    pub fn boosted_count(&self) -> usize {
        self.boosted.len()
    }

    fn needs_boost(doc: &dyn Document, node: NodeId, z_index: i32) -> bool {
        if doc.attribute(node, tags::BOOSTED).is_some()
            || doc.is_engine_owned(node)
            || doc.is_hidden(node)
        {
            return false;
        }
        let inert = doc.computed_style(node, "pointer-events").as_deref() == Some("none");
        let buried = match doc.computed_style(node, "z-index") {
            Some(value) => value.trim().parse::<i32>().map_or(true, |z| z < z_index),
            None => true,
        };
        inert || buried
    }

    fn boost_node(doc: &mut dyn Document, node: NodeId, z_index: &str) -> DomResult<Boosted> {
        let originals = BOOSTED_PROPERTIES.map(|p| doc.style_property(node, p));
        doc.set_attribute(node, tags::BOOSTED, "1")?;
        if doc.computed_style(node, "position").as_deref() == Some("static") {
            doc.set_style_property(node, "position", "relative")?;
        }
        doc.set_style_property(node, "z-index", z_index)?;
        doc.set_style_property(node, "pointer-events", "auto")?;
        Ok(Boosted { node, originals })
    }

    /// Boost every qualifying node in the document; returns how many were boosted
    pub fn apply(&mut self, doc: &mut dyn Document, z_index: i32) -> usize {
        let candidates = doc.query_all(&self.selector);
        self.boost_all(doc, candidates, z_index)
    }

    /// Boost qualifying nodes inside freshly added subtrees
    pub fn extend(&mut self, doc: &mut dyn Document, added: &[NodeId], z_index: i32) -> usize {
        let mut candidates = Vec::new();
        for &node in added {
            if doc.is_connected(node) {
                candidates.extend(doc.query_within(node, &self.selector));
            }
        }
        candidates.sort();
        candidates.dedup();
        self.boost_all(doc, candidates, z_index)
    }

    fn boost_all(&mut self, doc: &mut dyn Document, candidates: Vec<NodeId>, z_index: i32) -> usize {
        let value = z_index.to_string();
        let mut count = 0;
        for node in candidates {
            if !Self::needs_boost(doc, node, z_index) {
                continue;
            }
            match Self::boost_node(doc, node, &value) {
                Ok(entry) => {
                    self.boosted.push(entry);
                    count += 1;
                }
                Err(e) => {
                    debug!("Could not boost {:?}: {}", node, e);
                    if let Err(e) = doc.remove_attribute(node, tags::BOOSTED) {
                        debug!("Boost marker left on {:?}: {}", node, e);
                    }
                }
            }
        }
        count
    }

    /// Put every boosted node back, newest first; returns how many could not be restored
    pub fn restore(&mut self, doc: &mut dyn Document) -> usize {
        let mut failures = 0;
        for entry in self.boosted.drain(..).rev() {
            if !doc.is_connected(entry.node) {
                continue;
            }
            let result = BOOSTED_PROPERTIES
                .iter()
                .zip(entry.originals.iter())
                .try_for_each(|(property, original)| match original {
                    Some(value) => doc.set_style_property(entry.node, property, value),
                    None => doc.remove_style_property(entry.node, property),
                })
                .and_then(|_| doc.remove_attribute(entry.node, tags::BOOSTED));
            if let Err(e) = result {
                debug!("Boost on {:?} not fully restored: {}", entry.node, e);
                failures += 1;
            }
        }
        failures
    }
}

impl Default for InteractiveBoost {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDocument;

    #[test]
    fn test_snapshot_restores_root_exactly() {
        let mut doc = MemoryDocument::new();
        let root = doc.root().unwrap();
        doc.set_attribute(root, "class", "js no-touch").unwrap();
        doc.set_title("Home").unwrap();
        let snapshot = DocumentSnapshot::capture(&doc).unwrap();

        doc.add_class(root, "retro-active").unwrap();
        doc.set_style_property(root, "cursor", "crosshair").unwrap();
        doc.set_title("*** Home ***").unwrap();
        snapshot.restore(&mut doc).unwrap();

        assert_eq!(doc.attribute(root, "class").as_deref(), Some("js no-touch"));
        assert_eq!(doc.attribute(root, "style"), None);
        assert_eq!(doc.title(), "Home");
    }

    #[test]
    fn test_snapshot_needs_root() {
        assert_eq!(
            DocumentSnapshot::capture(&MemoryDocument::without_root()),
            Err(DomError::MissingRoot)
        );
    }

    #[test]
    fn test_boost_and_exact_restore() {
        let mut doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let button = doc.append_element(body, "button").unwrap();
        doc.set_attribute(button, "style", "z-index: 2; color: red;").unwrap();
        let link = doc.append_element(body, "a").unwrap();
        doc.set_attribute(link, "href", "/").unwrap();
        doc.set_sheet_style(link, "position", "absolute").unwrap();
        let plain = doc.append_element(body, "div").unwrap();

        let mut boost = InteractiveBoost::new();
        assert_eq!(boost.apply(&mut doc, 10_000), 2);
        assert_eq!(doc.style_property(button, "z-index").as_deref(), Some("10000"));
        assert_eq!(doc.style_property(button, "position").as_deref(), Some("relative"));
        assert_eq!(doc.style_property(link, "position"), None);
        assert_eq!(doc.attribute(plain, tags::BOOSTED), None);

        // Already boosted nodes are left alone
        assert_eq!(boost.apply(&mut doc, 10_000), 0);

        assert_eq!(boost.restore(&mut doc), 0);
        assert_eq!(
            doc.attribute(button, "style").as_deref(),
            Some("z-index: 2; color: red;")
        );
        assert_eq!(doc.attribute(link, "style"), None);
        assert!(doc.engine_tagged_nodes().is_empty());
    }

    #[test]
    fn test_high_z_index_controls_are_not_boosted() {
        let mut doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let button = doc.append_element(body, "button").unwrap();
        doc.set_sheet_style(button, "z-index", "20000").unwrap();
        let mut boost = InteractiveBoost::new();
        assert_eq!(boost.apply(&mut doc, 10_000), 0);

        doc.set_sheet_style(button, "pointer-events", "none").unwrap();
        assert_eq!(boost.apply(&mut doc, 10_000), 1);
    }

    #[test]
    fn test_extend_covers_added_subtrees() {
        let mut doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let mut boost = InteractiveBoost::new();
        boost.apply(&mut doc, 10_000);

        let form = doc.append_element(body, "form").unwrap();
        doc.append_element(form, "input").unwrap();
        doc.append_element(form, "button").unwrap();
        assert_eq!(boost.extend(&mut doc, &[form], 10_000), 2);
        assert_eq!(boost.boosted_count(), 2);
    }
}
