use std::collections::HashSet;

use rand::{rngs::SmallRng, seq::SliceRandom, SeedableRng};
use tracing::{debug, info};

use super::record::StyleLedger;
use super::traits::{ApplyContext, Applicator};
use crate::dom::{tags, Document, DocumentExt, NodeId};
use crate::error::{DomError, DomResult, Result};
use crate::settings::Settings;
use crate::theme::ThemeConfig;

const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];
const NON_TEXT_TAGS: &[&str] = &["html", "head", "body", "script", "style", "title", "meta", "noscript"];
const BLINK_SALT: u64 = 0xB11E;

/// Theme typography: font cascade, glowing headings, marquee banners and a little blinking
pub struct FontTransformer {
    ledger: StyleLedger,
    banners: Vec<NodeId>,
    blinking: Vec<NodeId>,
    wrapped: usize,
    applied: bool,
}

impl FontTransformer {
    pub fn new() -> Self {
        Self {
            ledger: StyleLedger::new(),
            banners: Vec::new(),
            blinking: Vec::new(),
            wrapped: 0,
            applied: false,
        }
    }

    pub fn banner_count(&self) -> usize {
        self.banners.len()
    }

    pub fn blinking(&self) -> &[NodeId] {
        &self.blinking
    }

    pub fn wrapped_count(&self) -> usize {
        self.wrapped
    }

    fn is_text_node(doc: &dyn Document, node: NodeId) -> bool {
        let Some(tag) = doc.tag_name(node) else {
            return false;
        };
        !NON_TEXT_TAGS.contains(&tag.as_str())
            && doc.text(node).is_some_and(|t| !t.trim().is_empty())
            && !doc.is_engine_owned(node)
    }

    /// Font (and glow, for headings) on one text node; `Ok(true)` if it is a heading
    fn style_text_node(
        &mut self,
        doc: &mut dyn Document,
        theme: &ThemeConfig,
        heading_glow: bool,
        node: NodeId,
    ) -> DomResult<bool> {
        let is_heading = doc
            .tag_name(node)
            .is_some_and(|t| HEADING_TAGS.contains(&t.as_str()));
        let family = if is_heading {
            &theme.font_families.heading
        } else {
            &theme.font_families.body
        };

        self.ledger.set_attribute(doc, node, tags::FONT, "1")?;
        self.ledger.set_style(doc, node, "font-family", family)?;
        if is_heading && heading_glow {
            self.ledger.set_attribute(doc, node, tags::HEADING_GLOW, "1")?;
            let glow = &theme.text_glow_color;
            let shadow = format!("0 0 6px {}, 0 0 12px {}", glow, glow);
            self.ledger.set_style(doc, node, "text-shadow", &shadow)?;
        }
        Ok(is_heading)
    }

    /// Style text nodes among `nodes`; returns how many were styled and which were body text
    fn style_text(
        &mut self,
        doc: &mut dyn Document,
        theme: &ThemeConfig,
        heading_glow: bool,
        nodes: Vec<NodeId>,
    ) -> (usize, Vec<NodeId>) {
        let mut styled = 0;
        let mut body_text = Vec::new();
        for node in nodes {
            if doc.attribute(node, tags::FONT).is_some() || !Self::is_text_node(doc, node) {
                continue;
            }
            match self.style_text_node(doc, theme, heading_glow, node) {
                Ok(is_heading) => {
                    styled += 1;
                    if !is_heading {
                        body_text.push(node);
                    }
                }
                Err(e) => debug!("Skipping text node {:?}: {}", node, e),
            }
        }
        (styled, body_text)
    }

    fn add_banners(
        &mut self,
        doc: &mut dyn Document,
        theme: &ThemeConfig,
        count: usize,
    ) -> DomResult<()> {
        let parent = doc.body().or_else(|| doc.root()).ok_or(DomError::MissingRoot)?;
        for _ in 0..count {
            let banner = self.ledger.attach_first(doc, parent, "div", "banner")?;
            doc.set_text(banner, &theme.banner_text)?;
            for (property, value) in [
                ("display", "block"),
                ("overflow", "hidden"),
                ("white-space", "nowrap"),
                ("font-family", theme.font_families.heading.as_str()),
                ("color", theme.text_glow_color.as_str()),
                ("animation", "retro-marquee 12s linear infinite"),
            ] {
                doc.set_style_property(banner, property, value)?;
            }
            self.banners.push(banner);
        }
        Ok(())
    }

    fn start_blinking(
        &mut self,
        doc: &mut dyn Document,
        candidates: &[NodeId],
        budget: usize,
        seed: u64,
    ) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let chosen: Vec<NodeId> = candidates.choose_multiple(&mut rng, budget).copied().collect();
        for node in chosen {
            let result = self
                .ledger
                .set_attribute(doc, node, tags::BLINK, "1")
                .and_then(|_| {
                    self.ledger
                        .set_style(doc, node, "animation", "retro-blink 1s steps(1) infinite")
                });
            match result {
                Ok(()) => self.blinking.push(node),
                Err(e) => debug!("No blink on {:?}: {}", node, e),
            }
        }
    }

    /// Constrain elements noticeably wider than their parent
    fn fix_overflow(&mut self, doc: &mut dyn Document, ratio: f64, nodes: Vec<NodeId>) -> usize {
        let mut fixed = 0;
        for node in nodes {
            if doc.attribute(node, tags::WRAP_FIXED).is_some() || doc.is_engine_owned(node) {
                continue;
            }
            let Some(parent) = doc.parent(node) else {
                continue;
            };
            let (Some(rect), Some(outer)) = (doc.bounding_rect(node), doc.bounding_rect(parent))
            else {
                continue;
            };
            if outer.width <= 0.0 || rect.width <= outer.width * ratio {
                continue;
            }
            let result = self
                .ledger
                .set_attribute(doc, node, tags::WRAP_FIXED, "1")
                .and_then(|_| self.ledger.set_style(doc, node, "max-width", "100%"))
                .and_then(|_| self.ledger.set_style(doc, node, "overflow-wrap", "anywhere"));
            match result {
                Ok(()) => fixed += 1,
                Err(e) => debug!("Could not constrain {:?}: {}", node, e),
            }
        }
        fixed
    }

    /// Typography for nodes added after activation; blink and banners are not revisited
    pub fn transform_new_nodes(
        &mut self,
        doc: &mut dyn Document,
        ctx: &ApplyContext<'_>,
        nodes: &[NodeId],
    ) -> usize {
        if !self.applied {
            return 0;
        }
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for &node in nodes {
            if doc.is_connected(node) {
                let subtree = std::iter::once(node).chain(doc.descendants(node));
                candidates.extend(subtree.filter(|n| seen.insert(*n)));
            }
        }
        let heading_glow = ctx.settings.custom_settings.fonts.heading_glow;
        let (styled, _) = self.style_text(doc, ctx.theme, heading_glow, candidates.clone());
        self.wrapped += self.fix_overflow(doc, ctx.config.fonts.overflow_ratio, candidates);
        styled
    }
}

impl Default for FontTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl Applicator for FontTransformer {
    fn name(&self) -> &str {
        "fonts"
    }

    fn description(&self) -> &str {
        "Theme font cascade, heading glow, scrolling banners and blinking text"
    }

    fn enabled_in(&self, settings: &Settings) -> bool {
        settings.custom_settings.fonts.enabled
    }

    fn apply(&mut self, doc: &mut dyn Document, ctx: &ApplyContext<'_>) -> Result<()> {
        self.undo(doc)?;
        let root = doc.root().ok_or(DomError::MissingRoot)?;
        let options = &ctx.settings.custom_settings.fonts;
        let theme = ctx.theme;

        self.ledger.set_style(doc, root, "font-family", &theme.font_families.body)?;
        self.applied = true;

        let elements = doc.all_elements();
        let (styled, body_text) = self.style_text(doc, theme, options.heading_glow, elements);

        if options.banners > 0 {
            if let Err(e) = self.add_banners(doc, theme, options.banners) {
                debug!("Banners skipped: {}", e);
            }
        }

        if options.blink && ctx.config.fonts.max_blinking > 0 {
            let seed = ctx.config.seed_for(BLINK_SALT);
            self.start_blinking(doc, &body_text, ctx.config.fonts.max_blinking, seed);
        }

        // Runs last: the theme fonts are what made things wider
        let elements = doc.all_elements();
        self.wrapped = self.fix_overflow(doc, ctx.config.fonts.overflow_ratio, elements);

        info!(
            "Fonts applied: {} text nodes, {} banners, {} blinking, {} wrapped",
            styled,
            self.banners.len(),
            self.blinking.len(),
            self.wrapped
        );
        Ok(())
    }

    fn undo(&mut self, doc: &mut dyn Document) -> Result<()> {
        let failures = self.ledger.restore(doc);
        if failures > 0 {
            debug!("Font transformer left {} writes in place", failures);
        }
        self.banners.clear();
        self.blinking.clear();
        self.wrapped = 0;
        self.applied = false;
        Ok(())
    }

    fn is_applied(&self) -> bool {
        self.applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{MemoryDocument, Rect};
    use crate::styles::traits::testing::Fixture;

    fn text_page(paragraphs: usize) -> MemoryDocument {
        let mut doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let h1 = doc.append_element(body, "h1").unwrap();
        doc.set_text(h1, "Welcome").unwrap();
        for i in 0..paragraphs {
            let p = doc.append_element(body, "p").unwrap();
            doc.set_text(p, &format!("Paragraph {}", i)).unwrap();
        }
        doc
    }

    #[test]
    fn test_fonts_and_heading_glow() {
        let mut doc = text_page(2);
        let fixture = Fixture::new("geocities");
        let mut fonts = FontTransformer::new();
        fonts.apply(&mut doc, &fixture.ctx()).unwrap();

        let root = doc.root().unwrap();
        assert_eq!(
            doc.style_property(root, "font-family").as_deref(),
            Some(fixture.theme.font_families.body.as_str())
        );
        let glowing = doc.nodes_with_attribute(tags::HEADING_GLOW);
        assert_eq!(glowing.len(), 1);
        assert!(doc.style_property(glowing[0], "text-shadow").is_some());
        assert_eq!(doc.nodes_with_attribute(tags::FONT).len(), 3);
        assert_eq!(fonts.banner_count(), 1);
    }

    #[test]
    fn test_blink_budget_is_bounded() {
        let mut doc = text_page(10);
        let fixture = Fixture::new("geocities");
        let mut fonts = FontTransformer::new();
        fonts.apply(&mut doc, &fixture.ctx()).unwrap();

        assert_eq!(fonts.blinking().len(), fixture.config.fonts.max_blinking);
        assert_eq!(doc.nodes_with_attribute(tags::BLINK).len(), fixture.config.fonts.max_blinking);
        // Headings never blink
        for node in fonts.blinking() {
            assert!(doc.attribute(*node, tags::HEADING_GLOW).is_none());
        }
    }

    #[test]
    fn test_seeded_blink_choice_is_stable() {
        let fixture = Fixture::new("geocities");
        let mut first = text_page(10);
        let mut second = text_page(10);
        let mut a = FontTransformer::new();
        let mut b = FontTransformer::new();
        a.apply(&mut first, &fixture.ctx()).unwrap();
        b.apply(&mut second, &fixture.ctx()).unwrap();
        assert_eq!(a.blinking(), b.blinking());
    }

    #[test]
    fn test_overflow_is_constrained() {
        let mut doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let column = doc.append_element(body, "div").unwrap();
        doc.set_rect(column, Rect::new(0.0, 0.0, 400.0, 100.0)).unwrap();
        let wide = doc.append_element(column, "pre").unwrap();
        doc.set_rect(wide, Rect::new(0.0, 0.0, 600.0, 20.0)).unwrap();
        let slightly = doc.append_element(column, "pre").unwrap();
        doc.set_rect(slightly, Rect::new(0.0, 0.0, 450.0, 20.0)).unwrap();

        let fixture = Fixture::new("terminal");
        let mut fonts = FontTransformer::new();
        fonts.apply(&mut doc, &fixture.ctx()).unwrap();

        assert_eq!(doc.style_property(wide, "max-width").as_deref(), Some("100%"));
        assert_eq!(doc.attribute(slightly, tags::WRAP_FIXED), None);
        assert_eq!(fonts.wrapped_count(), 1);
    }

    #[test]
    fn test_undo_and_idempotence() {
        let mut doc = text_page(4);
        let fixture = Fixture::new("vaporwave");
        let mut fonts = FontTransformer::new();

        fonts.apply(&mut doc, &fixture.ctx()).unwrap();
        fonts.apply(&mut doc, &fixture.ctx()).unwrap();
        assert_eq!(doc.nodes_with_attribute(tags::OWNED).len(), 1);
        assert_eq!(doc.nodes_with_attribute(tags::FONT).len(), 5);

        fonts.undo(&mut doc).unwrap();
        assert!(doc.engine_tagged_nodes().is_empty());
        assert_eq!(doc.attribute(doc.root().unwrap(), "style"), None);
    }

    #[test]
    fn test_late_text_nodes() {
        let mut doc = text_page(1);
        let fixture = Fixture::new("geocities");
        let mut fonts = FontTransformer::new();
        fonts.apply(&mut doc, &fixture.ctx()).unwrap();

        let body = doc.body().unwrap();
        let h2 = doc.append_element(body, "h2").unwrap();
        doc.set_text(h2, "News").unwrap();
        assert_eq!(fonts.transform_new_nodes(&mut doc, &fixture.ctx(), &[h2]), 1);
        assert_eq!(doc.attribute(h2, tags::HEADING_GLOW).as_deref(), Some("1"));
    }
}
