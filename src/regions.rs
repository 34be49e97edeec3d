//! # Region Detection
//!
//! Classifies structural nodes of the host page into semantic regions. Each kind unions explicit
//! naming/role signals with geometric heuristics evaluated against the current layout; main
//! content is the exception and only trusts explicit signals.
//!
//! Detection reads the document and never mutates content. Marking writes two attributes per
//! node (kind and index within the kind) and unmarking sweeps the whole document for them.

use std::collections::HashSet;
use std::fmt;

use tracing::debug;

use crate::dom::{tags, Document, DocumentExt, NodeId, Selector};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    Hero,
    Sidebar,
    Footer,
    MainContent,
    None,
}

impl RegionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hero => "hero",
            Self::Sidebar => "sidebar",
            Self::Footer => "footer",
            Self::MainContent => "main",
            Self::None => "none",
        }
    }

    pub fn from_attr(value: &str) -> Self {
        match value {
            "hero" => Self::Hero,
            "sidebar" => Self::Sidebar,
            "footer" => Self::Footer,
            "main" => Self::MainContent,
            _ => Self::None,
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub kind: RegionKind,
    pub node: NodeId,
    pub index: usize,
}

/// Nodes found for one kind, split by signal, plus nodes the heuristics had to skip
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detection {
    pub explicit: Vec<NodeId>,
    pub heuristic: Vec<NodeId>,
    /// Candidates whose layout could not be read (vanished mid-sweep)
    pub skipped: usize,
}

impl Detection {
    /// Explicit matches first, then heuristic ones, without duplicates
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        self.explicit
            .iter()
            .chain(self.heuristic.iter())
            .copied()
            .filter(|n| seen.insert(*n))
            .collect()
    }

    fn push_explicit(&mut self, node: NodeId) {
        if !self.explicit.contains(&node) {
            self.explicit.push(node);
        }
    }

    fn push_heuristic(&mut self, node: NodeId) {
        if !self.explicit.contains(&node) && !self.heuristic.contains(&node) {
            self.heuristic.push(node);
        }
    }
}

/// Summary of one marking pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkSummary {
    pub regions: Vec<Region>,
    pub skipped: usize,
}

/// Result of a document-wide unmarking sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnmarkSummary {
    pub cleared: usize,
    pub skipped: usize,
}

impl MarkSummary {
    pub fn count(&self, kind: RegionKind) -> usize {
        self.regions.iter().filter(|r| r.kind == kind).count()
    }
}

const HERO_SIGNALS: &str = ".hero, #hero, [class*=hero], [class*=jumbotron], [class*=masthead], [data-section=hero]";
const SIDEBAR_SIGNALS: &str = "aside, [role=complementary], .sidebar, #sidebar, [class*=sidebar], [class*=side-bar]";
const FOOTER_SIGNALS: &str = "footer, [role=contentinfo], .footer, #footer, [class*=site-footer]";
const MAIN_SIGNALS: &str = "main, [role=main], #main, #content, .main-content, [class*=main-content]";

/// Elements worth evaluating geometrically
const HEURISTIC_CANDIDATES: &str = "div, section, header, aside, nav, footer, article";

const HERO_MAX_TOP: f64 = 1000.0;
const HERO_MIN_HEIGHT: f64 = 200.0;
const WIDE_FRACTION: f64 = 0.5;
const SIDEBAR_MIN_WIDTH: f64 = 150.0;
const SIDEBAR_MAX_FRACTION: f64 = 0.3;
const SIDEBAR_MIN_HEIGHT: f64 = 400.0;
const SIDEBAR_EDGE_TOLERANCE: f64 = 50.0;
const FOOTER_BOTTOM_ZONE: f64 = 1000.0;
const FOOTER_MIN_HEIGHT: f64 = 50.0;

pub struct RegionDetector {
    hero: Selector,
    sidebar: Selector,
    footer: Selector,
    main: Selector,
    candidates: Selector,
    last: MarkSummary,
}

impl RegionDetector {
    pub fn new() -> Self {
        Self {
            hero: Selector::parse(HERO_SIGNALS),
            sidebar: Selector::parse(SIDEBAR_SIGNALS),
            footer: Selector::parse(FOOTER_SIGNALS),
            main: Selector::parse(MAIN_SIGNALS),
            candidates: Selector::parse(HEURISTIC_CANDIDATES),
            last: MarkSummary::default(),
        }
    }

    fn host_nodes(&self, doc: &dyn Document, selector: &Selector) -> Vec<NodeId> {
        doc.query_all(selector)
            .into_iter()
            .filter(|&n| !doc.is_engine_owned(n))
            .collect()
    }

    fn detect_with<F>(&self, doc: &dyn Document, signals: &Selector, heuristic: F) -> Detection
    where
        F: Fn(&dyn Document, NodeId) -> Option<bool>,
    {
        let mut detection = Detection::default();
        for node in self.host_nodes(doc, signals) {
            detection.push_explicit(node);
        }
        for node in self.host_nodes(doc, &self.candidates) {
            match heuristic(doc, node) {
                Some(true) => detection.push_heuristic(node),
                Some(false) => {}
                None => detection.skipped += 1,
            }
        }
        detection
    }

    pub fn detect_heroes(&self, doc: &dyn Document) -> Detection {
        let viewport = doc.viewport();
        self.detect_with(doc, &self.hero, |doc, node| {
            let rect = doc.absolute_rect(node)?;
            Some(
                rect.y < HERO_MAX_TOP
                    && rect.width > viewport.width * WIDE_FRACTION
                    && rect.height > HERO_MIN_HEIGHT,
            )
        })
    }

    pub fn detect_sidebars(&self, doc: &dyn Document) -> Detection {
        let viewport = doc.viewport();
        self.detect_with(doc, &self.sidebar, |doc, node| {
            let rect = doc.bounding_rect(node)?;
            let touches_edge = rect.x <= SIDEBAR_EDGE_TOLERANCE
                || viewport.width - rect.right() <= SIDEBAR_EDGE_TOLERANCE;
            Some(
                rect.width > SIDEBAR_MIN_WIDTH
                    && rect.width < viewport.width * SIDEBAR_MAX_FRACTION
                    && rect.height > SIDEBAR_MIN_HEIGHT
                    && touches_edge,
            )
        })
    }

    pub fn detect_footers(&self, doc: &dyn Document) -> Detection {
        let viewport = doc.viewport();
        let document_height = doc.document_height();
        self.detect_with(doc, &self.footer, |doc, node| {
            let rect = doc.absolute_rect(node)?;
            Some(
                rect.bottom() >= document_height - FOOTER_BOTTOM_ZONE
                    && rect.width > viewport.width * WIDE_FRACTION
                    && rect.height >= FOOTER_MIN_HEIGHT,
            )
        })
    }

    /// Explicit signals only, minus anything classified as hero, sidebar or footer
    pub fn detect_main_content(&self, doc: &dyn Document) -> Detection {
        let taken: HashSet<NodeId> = self
            .detect_heroes(doc)
            .nodes()
            .into_iter()
            .chain(self.detect_sidebars(doc).nodes())
            .chain(self.detect_footers(doc).nodes())
            .collect();

        let mut detection = Detection::default();
        for node in self.host_nodes(doc, &self.main) {
            if !taken.contains(&node) {
                detection.push_explicit(node);
            }
        }
        detection
    }

    /// Tag every detected region, replacing any earlier marks.
    ///
    /// Explicit signals claim nodes before heuristics do, across all kinds, so a node explicitly
    /// named as a sidebar stays a sidebar even when it is also shaped like a hero.
    pub fn mark_regions(&mut self, doc: &mut dyn Document) -> MarkSummary {
        let unmarked = self.unmark_regions(doc);

        let detections = [
            (RegionKind::Hero, self.detect_heroes(doc)),
            (RegionKind::Sidebar, self.detect_sidebars(doc)),
            (RegionKind::Footer, self.detect_footers(doc)),
            (RegionKind::MainContent, self.detect_main_content(doc)),
        ];

        let mut claimed: HashSet<NodeId> = HashSet::new();
        let mut assignments: Vec<(RegionKind, NodeId)> = Vec::new();
        let mut skipped = unmarked.skipped;

        for (kind, detection) in &detections {
            skipped += detection.skipped;
            for &node in &detection.explicit {
                if claimed.insert(node) {
                    assignments.push((*kind, node));
                }
            }
        }
        for (kind, detection) in &detections {
            for &node in &detection.heuristic {
                if claimed.insert(node) {
                    assignments.push((*kind, node));
                }
            }
        }

        let mut summary = MarkSummary {
            regions: Vec::new(),
            skipped,
        };
        for (kind, node) in assignments {
            let index = summary.count(kind);
            let marked = doc
                .set_attribute(node, tags::REGION, kind.as_str())
                .and_then(|_| doc.set_attribute(node, tags::REGION_INDEX, &index.to_string()));
            match marked {
                Ok(()) => summary.regions.push(Region { kind, node, index }),
                Err(e) => {
                    debug!("Skipping region mark on {:?}: {}", node, e);
                    summary.skipped += 1;
                }
            }
        }

        debug!(
            "Marked regions: {} hero, {} sidebar, {} footer, {} main ({} skipped)",
            summary.count(RegionKind::Hero),
            summary.count(RegionKind::Sidebar),
            summary.count(RegionKind::Footer),
            summary.count(RegionKind::MainContent),
            summary.skipped
        );
        self.last = summary.clone();
        summary
    }

    /// Remove both region attributes from every node in the document.
    ///
    /// A node that refuses the removal is logged and counted; the sweep carries on.
    pub fn unmark_regions(&mut self, doc: &mut dyn Document) -> UnmarkSummary {
        let mut summary = UnmarkSummary::default();
        for node in doc.all_elements() {
            let has_kind = doc.attribute(node, tags::REGION).is_some();
            let has_index = doc.attribute(node, tags::REGION_INDEX).is_some();
            if !has_kind && !has_index {
                continue;
            }
            let removed = doc
                .remove_attribute(node, tags::REGION)
                .and_then(|_| doc.remove_attribute(node, tags::REGION_INDEX));
            match removed {
                Ok(()) => summary.cleared += 1,
                Err(e) => {
                    debug!("Skipping region unmark on {:?}: {}", node, e);
                    summary.skipped += 1;
                }
            }
        }
        self.last = MarkSummary::default();
        summary
    }

    /// Region recorded for a node in the document
    pub fn region_of(doc: &dyn Document, node: NodeId) -> RegionKind {
        doc.attribute(node, tags::REGION)
            .map(|v| RegionKind::from_attr(&v))
            .unwrap_or(RegionKind::None)
    }

    pub fn last_summary(&self) -> &MarkSummary {
        &self.last
    }
}

impl Default for RegionDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{MemoryDocument, Rect};

    fn page() -> (MemoryDocument, NodeId) {
        let mut doc = MemoryDocument::new();
        doc.set_viewport(1000.0, 800.0);
        doc.set_document_height(3000.0);
        let body = doc.body().unwrap();
        (doc, body)
    }

    #[test]
    fn test_hero_heuristic() {
        let (mut doc, body) = page();
        let big = doc.append_element(body, "div").unwrap();
        doc.set_rect(big, Rect::new(0.0, 50.0, 900.0, 400.0)).unwrap();
        let narrow = doc.append_element(body, "div").unwrap();
        doc.set_rect(narrow, Rect::new(0.0, 50.0, 300.0, 400.0)).unwrap();
        let deep = doc.append_element(body, "div").unwrap();
        doc.set_rect(deep, Rect::new(0.0, 1200.0, 900.0, 400.0)).unwrap();

        let detector = RegionDetector::new();
        assert_eq!(detector.detect_heroes(&doc).nodes(), vec![big]);
    }

    #[test]
    fn test_sidebar_and_footer_heuristics() {
        let (mut doc, body) = page();
        let side = doc.append_element(body, "div").unwrap();
        doc.set_rect(side, Rect::new(980.0 - 200.0, 100.0, 200.0, 900.0)).unwrap();
        let floating = doc.append_element(body, "div").unwrap();
        doc.set_rect(floating, Rect::new(400.0, 100.0, 200.0, 900.0)).unwrap();
        let foot = doc.append_element(body, "div").unwrap();
        doc.set_rect(foot, Rect::new(0.0, 2900.0, 1000.0, 100.0)).unwrap();

        let detector = RegionDetector::new();
        assert_eq!(detector.detect_sidebars(&doc).nodes(), vec![side]);
        assert_eq!(detector.detect_footers(&doc).nodes(), vec![foot]);
    }

    #[test]
    fn test_main_content_is_explicit_only() {
        let (mut doc, body) = page();
        let main = doc.append_element(body, "main").unwrap();
        let content = doc.append_element(body, "div").unwrap();
        doc.set_attribute(content, "id", "content").unwrap();
        doc.set_attribute(content, "class", "sidebar").unwrap();
        let big = doc.append_element(body, "div").unwrap();
        doc.set_rect(big, Rect::new(0.0, 1500.0, 600.0, 600.0)).unwrap();

        let detector = RegionDetector::new();
        let found = detector.detect_main_content(&doc);
        assert_eq!(found.nodes(), vec![main]);
        assert!(found.heuristic.is_empty());
    }

    #[test]
    fn test_explicit_duplicates_are_collapsed() {
        let (mut doc, body) = page();
        let aside = doc.append_element(body, "aside").unwrap();
        doc.set_attribute(aside, "class", "sidebar").unwrap();
        doc.set_attribute(aside, "role", "complementary").unwrap();
        doc.set_rect(aside, Rect::new(0.0, 0.0, 200.0, 900.0)).unwrap();

        let detection = RegionDetector::new().detect_sidebars(&doc);
        assert_eq!(detection.explicit, vec![aside]);
        assert!(detection.heuristic.is_empty());
    }

    #[test]
    fn test_mark_regions_is_exclusive() {
        let (mut doc, body) = page();
        // Hero-shaped, explicitly a sidebar
        let aside = doc.append_element(body, "aside").unwrap();
        doc.set_rect(aside, Rect::new(0.0, 0.0, 900.0, 500.0)).unwrap();
        // Hero-shaped and footer-signalled
        let footer = doc.append_element(body, "footer").unwrap();
        doc.set_rect(footer, Rect::new(0.0, 2800.0, 900.0, 200.0)).unwrap();
        let hero = doc.append_element(body, "section").unwrap();
        doc.set_rect(hero, Rect::new(0.0, 0.0, 900.0, 300.0)).unwrap();

        let mut detector = RegionDetector::new();
        let summary = detector.mark_regions(&mut doc);
        summary.regions.iter().for_each(|r| assert_ne!(r.kind, RegionKind::None));

        assert_eq!(RegionDetector::region_of(&doc, aside), RegionKind::Sidebar);
        assert_eq!(RegionDetector::region_of(&doc, footer), RegionKind::Footer);
        assert_eq!(RegionDetector::region_of(&doc, hero), RegionKind::Hero);

        // Re-marking overwrites rather than stacking
        detector.mark_regions(&mut doc);
        let tagged = doc.nodes_with_attribute(tags::REGION);
        let unique: HashSet<NodeId> = tagged.iter().copied().collect();
        assert_eq!(tagged.len(), unique.len());
        assert_eq!(tagged.len(), summary.regions.len());
    }

    #[test]
    fn test_unmark_is_a_document_sweep() {
        let (mut doc, body) = page();
        let stray = doc.append_element(body, "div").unwrap();
        doc.set_attribute(stray, tags::REGION_INDEX, "3").unwrap();
        let footer = doc.append_element(body, "footer").unwrap();

        let mut detector = RegionDetector::new();
        detector.mark_regions(&mut doc);
        assert_eq!(doc.attribute(footer, tags::REGION).as_deref(), Some("footer"));

        // A fresh detector that never marked anything still clears everything
        let mut other = RegionDetector::new();
        other.unmark_regions(&mut doc);
        assert!(doc.nodes_with_attribute(tags::REGION).is_empty());
        assert!(doc.nodes_with_attribute(tags::REGION_INDEX).is_empty());
    }

    #[test]
    fn test_refused_unmark_skips_only_that_node() {
        let (mut doc, body) = page();
        let aside_node = doc.append_element(body, "aside").unwrap();
        let footer = doc.append_element(body, "footer").unwrap();

        let mut detector = RegionDetector::new();
        assert_eq!(detector.mark_regions(&mut doc).regions.len(), 2);
        doc.freeze_node(aside_node);

        let summary = detector.unmark_regions(&mut doc);
        assert_eq!(summary, UnmarkSummary { cleared: 1, skipped: 1 });
        assert_eq!(doc.attribute(footer, tags::REGION), None);
        assert_eq!(doc.attribute(footer, tags::REGION_INDEX), None);
        assert_eq!(doc.attribute(aside_node, tags::REGION).as_deref(), Some("sidebar"));

        // Marking again still covers the nodes the host lets it touch
        let summary = detector.mark_regions(&mut doc);
        assert_eq!(summary.count(RegionKind::Footer), 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(doc.attribute(footer, tags::REGION).as_deref(), Some("footer"));
    }

    #[test]
    fn test_indices_are_per_kind() {
        let (mut doc, body) = page();
        let a = doc.append_element(body, "footer").unwrap();
        let b = doc.append_element(body, "footer").unwrap();
        let mut detector = RegionDetector::new();
        detector.mark_regions(&mut doc);
        assert_eq!(doc.attribute(a, tags::REGION_INDEX).as_deref(), Some("0"));
        assert_eq!(doc.attribute(b, tags::REGION_INDEX).as_deref(), Some("1"));
    }
}
