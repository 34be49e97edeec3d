use std::collections::HashSet;

use crate::config::SyncConfig;
use crate::dom::{tags, Document, DocumentExt, MutationRecord, NodeId, Selector};
use crate::styles::elements::classify;

/// Attribute changes that usually mean a widget opened, closed or swapped content
const VISIBILITY_ATTRIBUTES: &[&str] = &["hidden", "open", "aria-hidden", "aria-expanded", "inert"];

/// Structural and interactive elements the periodic sweep looks for
pub const RESCAN_SELECTORS: &str =
    "header, nav, main, footer, aside, section, article, button, a[href], input, select, textarea, [role=button]";

/// What one batch of host mutations asks of the orchestrator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncPlan {
    /// Host nodes added since the last pass, in arrival order
    pub added: Vec<NodeId>,
    /// Whether a re-synchronization is warranted at all
    pub resync: bool,
    pub title_changed: bool,
    /// Records dropped as engine-caused
    pub ignored: usize,
}

/// Reduces raw mutation records to a [`SyncPlan`], dropping everything the engine caused
pub struct MutationFilter {
    min_width: f64,
    min_height: f64,
}

impl MutationFilter {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            min_width: config.sizable_min_width,
            min_height: config.sizable_min_height,
        }
    }

    fn is_sizable(&self, doc: &dyn Document, node: NodeId) -> bool {
        doc.bounding_rect(node)
            .is_some_and(|r| r.width >= self.min_width && r.height >= self.min_height)
    }

    fn is_suspicious_attribute(&self, doc: &dyn Document, target: NodeId, name: &str) -> bool {
        if VISIBILITY_ATTRIBUTES.contains(&name) || name.contains("expanded") {
            return true;
        }
        (name == "class" || name == "style") && self.is_sizable(doc, target)
    }

    pub fn plan(&self, doc: &dyn Document, records: &[MutationRecord]) -> SyncPlan {
        let mut plan = SyncPlan::default();
        let mut seen = HashSet::new();
        for record in records {
            match record {
                MutationRecord::ChildList { target, added, .. } => {
                    if doc.is_engine_owned(*target) {
                        plan.ignored += 1;
                        continue;
                    }
                    let fresh: Vec<NodeId> = added
                        .iter()
                        .copied()
                        .filter(|&n| doc.is_connected(n) && !doc.is_engine_owned(n))
                        .collect();
                    if fresh.is_empty() {
                        plan.ignored += usize::from(!added.is_empty());
                        continue;
                    }
                    plan.resync = true;
                    plan.added.extend(fresh.into_iter().filter(|n| seen.insert(*n)));
                }
                MutationRecord::Attributes { target, name } => {
                    if tags::is_engine_attribute(name) || doc.is_engine_owned(*target) {
                        plan.ignored += 1;
                        continue;
                    }
                    if self.is_suspicious_attribute(doc, *target, name) {
                        plan.resync = true;
                    }
                }
                MutationRecord::CharacterData { .. } => {}
                MutationRecord::Title => plan.title_changed = true,
            }
        }
        plan
    }
}

/// Connected host elements the element transformer would tag but has not
pub fn untagged_candidates(doc: &dyn Document, selector: &Selector) -> Vec<NodeId> {
    doc.query_all(selector)
        .into_iter()
        .filter(|&n| {
            doc.attribute(n, tags::ELEMENT).is_none()
                && !doc.is_engine_owned(n)
                && classify(doc, n).is_some()
        })
        .collect()
}
