use tracing::{debug, info};

use super::color::Rgb;
use super::record::StyleLedger;
use super::traits::{ApplyContext, Applicator};
use crate::dom::{tags, Document, DocumentExt, NodeId, Selector};
use crate::error::{DomError, Result};
use crate::settings::Settings;

/// Overlay laid over pages that were dark to begin with
pub const LIGHT_OVERLAY: &str = "rgba(255, 255, 255, 0.15)";
/// Overlay laid over pages that were light to begin with
pub const DARK_OVERLAY: &str = "rgba(0, 0, 0, 0.35)";

/// Sits above the page but below boosted interactive elements
const OVERLAY_Z_INDEX: &str = "9000";

const GLOW_TARGETS: &str = "header, nav, main, footer, aside, section, article, [data-retro-region]";

/// Overlay color for a sampled page background
pub fn select_overlay(background: Rgb) -> &'static str {
    if background.is_dark() {
        LIGHT_OVERLAY
    } else {
        DARK_OVERLAY
    }
}

/// Replaces the page background with the theme's tile and keeps text readable over it
pub struct BackgroundStyler {
    ledger: StyleLedger,
    glow_targets: Selector,
    sampled: Option<Rgb>,
    overlay: Option<NodeId>,
    overlay_color: Option<&'static str>,
    glowing: usize,
    applied: bool,
}

impl BackgroundStyler {
    pub fn new() -> Self {
        Self {
            ledger: StyleLedger::new(),
            glow_targets: Selector::parse(GLOW_TARGETS),
            sampled: None,
            overlay: None,
            overlay_color: None,
            glowing: 0,
            applied: false,
        }
    }

    /// Page background as it was before the theme covered it
    pub fn sampled_background(&self) -> Option<Rgb> {
        self.sampled
    }

    pub fn overlay_color(&self) -> Option<&'static str> {
        self.overlay_color
    }

    pub fn overlay(&self) -> Option<NodeId> {
        self.overlay
    }

    pub fn glowing_count(&self) -> usize {
        self.glowing
    }

    fn apply_glow(&mut self, doc: &mut dyn Document, color: &str) -> usize {
        let shadow = format!("0 0 8px {}, inset 0 0 4px {}", color, color);
        let targets: Vec<NodeId> = doc
            .query_all(&self.glow_targets)
            .into_iter()
            .filter(|&n| !doc.is_engine_owned(n) && doc.attribute(n, tags::GLOW).is_none())
            .collect();

        let mut count = 0;
        for node in targets {
            let result = self
                .ledger
                .set_attribute(doc, node, tags::GLOW, "1")
                .and_then(|_| self.ledger.set_style(doc, node, "box-shadow", &shadow));
            match result {
                Ok(()) => count += 1,
                Err(e) => debug!("No glow on {:?}: {}", node, e),
            }
        }
        count
    }

    fn attach_overlay(&mut self, doc: &mut dyn Document, color: &'static str) -> Result<NodeId> {
        let overlay = self.ledger.attach(doc, "div", "overlay")?;
        for (property, value) in [
            ("position", "fixed"),
            ("top", "0"),
            ("left", "0"),
            ("width", "100vw"),
            ("height", "100vh"),
            ("pointer-events", "none"),
            ("z-index", OVERLAY_Z_INDEX),
            ("background-color", color),
        ] {
            doc.set_style_property(overlay, property, value)?;
        }
        Ok(overlay)
    }
}

impl Default for BackgroundStyler {
    fn default() -> Self {
        Self::new()
    }
}

impl Applicator for BackgroundStyler {
    fn name(&self) -> &str {
        "background"
    }

    fn description(&self) -> &str {
        "Tiled theme background, neon section borders and a contrast overlay"
    }

    fn enabled_in(&self, settings: &Settings) -> bool {
        settings.custom_settings.background.enabled
    }

    fn apply(&mut self, doc: &mut dyn Document, ctx: &ApplyContext<'_>) -> Result<()> {
        self.undo(doc)?;
        let root = doc.root().ok_or(DomError::MissingRoot)?;
        let options = &ctx.settings.custom_settings.background;

        // Sample before covering it up
        let sampled = doc.page_background();
        self.sampled = Some(sampled);

        let image = format!("url(\"{}\")", ctx.assets.background.url());
        self.ledger.set_style(doc, root, "background-image", &image)?;
        self.ledger.set_style(doc, root, "background-repeat", "repeat")?;
        self.ledger.set_style(doc, root, "background-attachment", "fixed")?;
        if let Some(body) = doc.body() {
            if doc.computed_style(body, "background-color").is_some() {
                self.ledger.set_style(doc, body, "background-color", "transparent")?;
            }
        }
        self.applied = true;

        if options.glow_borders {
            self.glowing = self.apply_glow(doc, &ctx.theme.neon_border_color);
        }

        if options.overlay {
            let color = select_overlay(sampled);
            match self.attach_overlay(doc, color) {
                Ok(node) => {
                    self.overlay = Some(node);
                    self.overlay_color = Some(color);
                }
                Err(e) => debug!("Overlay skipped: {}", e),
            }
        }

        info!(
            "Background applied (page luminance {:.2}, {} glowing sections)",
            sampled.luminance(),
            self.glowing
        );
        Ok(())
    }

    fn undo(&mut self, doc: &mut dyn Document) -> Result<()> {
        let failures = self.ledger.restore(doc);
        if failures > 0 {
            debug!("Background styler left {} writes in place", failures);
        }
        self.sampled = None;
        self.overlay = None;
        self.overlay_color = None;
        self.glowing = 0;
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
    use crate::dom::MemoryDocument;
    use crate::styles::traits::testing::Fixture;

    #[test]
    fn test_overlay_selection_by_luminance() {
        assert_eq!(select_overlay(Rgb::new(10, 10, 10)), LIGHT_OVERLAY);
        assert_eq!(select_overlay(Rgb::new(250, 250, 250)), DARK_OVERLAY);
    }

    #[test]
    fn test_dark_page_gets_light_overlay() {
        let mut doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        doc.set_sheet_style(body, "background-color", "rgb(10, 10, 10)").unwrap();

        let fixture = Fixture::new("geocities");
        let mut background = BackgroundStyler::new();
        background.apply(&mut doc, &fixture.ctx()).unwrap();

        assert_eq!(background.sampled_background(), Some(Rgb::new(10, 10, 10)));
        assert_eq!(background.overlay_color(), Some(LIGHT_OVERLAY));

        // Re-applying samples the restored page, not the transparent body
        background.apply(&mut doc, &fixture.ctx()).unwrap();
        assert_eq!(background.overlay_color(), Some(LIGHT_OVERLAY));
    }

    #[test]
    fn test_garbled_page_color_is_ignored() {
        let mut doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        doc.set_sheet_style(body, "background-color", "#aé123").unwrap();

        let fixture = Fixture::new("geocities");
        let mut background = BackgroundStyler::new();
        background.apply(&mut doc, &fixture.ctx()).unwrap();
        assert!(background.overlay().is_some());
        background.undo(&mut doc).unwrap();
    }

    #[test]
    fn test_apply_and_undo() {
        let mut doc = MemoryDocument::new();
        let root = doc.root().unwrap();
        doc.set_attribute(root, "style", "margin: 0;").unwrap();
        let body = doc.body().unwrap();
        let footer = doc.append_element(body, "footer").unwrap();

        let fixture = Fixture::new("vaporwave");
        let mut background = BackgroundStyler::new();
        background.apply(&mut doc, &fixture.ctx()).unwrap();

        assert!(doc.style_property(root, "background-image").unwrap().starts_with("url("));
        assert_eq!(doc.attribute(footer, tags::GLOW).as_deref(), Some("1"));
        assert!(background.overlay().is_some());
        assert_eq!(background.glowing_count(), 1);

        background.undo(&mut doc).unwrap();
        assert_eq!(doc.attribute(root, "style").as_deref(), Some("margin: 0;"));
        assert!(doc.engine_tagged_nodes().is_empty());
        assert_eq!(doc.attribute(footer, "style"), None);
    }

    #[test]
    fn test_idempotent_apply() {
        let mut doc = MemoryDocument::new();
        let fixture = Fixture::new("geocities");
        let mut background = BackgroundStyler::new();

        background.apply(&mut doc, &fixture.ctx()).unwrap();
        let root_style = doc.attribute(doc.root().unwrap(), "style");
        background.apply(&mut doc, &fixture.ctx()).unwrap();

        assert_eq!(doc.attribute(doc.root().unwrap(), "style"), root_style);
        assert_eq!(doc.nodes_with_attribute(tags::OWNED).len(), 1);
    }

    #[test]
    fn test_toggles_are_respected() {
        let mut doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        doc.append_element(body, "header").unwrap();
        let mut fixture = Fixture::new("geocities");
        fixture.settings.custom_settings.background.overlay = false;
        fixture.settings.custom_settings.background.glow_borders = false;

        let mut background = BackgroundStyler::new();
        background.apply(&mut doc, &fixture.ctx()).unwrap();
        assert!(background.overlay().is_none());
        assert!(doc.nodes_with_attribute(tags::GLOW).is_empty());
    }

    #[test]
    fn test_undo_without_apply_is_noop() {
        let mut doc = MemoryDocument::new();
        let mut background = BackgroundStyler::new();
        background.undo(&mut doc).unwrap();
        assert!(!background.is_applied());
    }
}
