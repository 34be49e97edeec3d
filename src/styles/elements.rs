use std::collections::HashSet;

use tracing::{debug, info};

use super::color::Rgb;
use super::record::StyleLedger;
use super::traits::{ApplyContext, Applicator};
use crate::dom::{tags, Document, DocumentExt, NodeId};
use crate::error::{DomError, Result};
use crate::settings::Settings;
use crate::theme::ThemeConfig;

/// Backgrounds darker than this get the theme's light text color
pub const CONTRAST_THRESHOLD: f32 = 0.5;

const CONTAINER_TAGS: &[&str] = &["nav", "main", "article", "section", "aside", "header", "footer"];
const CONTAINER_MIN_WIDTH: f64 = 300.0;
const CONTAINER_MIN_HEIGHT: f64 = 200.0;
const IMAGE_MIN_SIZE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Container,
    Button,
    Link,
    Input,
    Image,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Container => "container",
            Self::Button => "button",
            Self::Link => "link",
            Self::Input => "input",
            Self::Image => "image",
        }
    }
}

/// Outcome of tagging a batch of late nodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformSummary {
    pub tagged: usize,
    pub skipped: usize,
}

/// Classify a host element; `None` for nodes the transformer leaves alone
pub fn classify(doc: &dyn Document, node: NodeId) -> Option<ElementKind> {
    let tag = doc.tag_name(node)?;
    match tag.as_str() {
        t if CONTAINER_TAGS.contains(&t) => Some(ElementKind::Container),
        "div" => {
            let rect = doc.bounding_rect(node)?;
            (rect.width >= CONTAINER_MIN_WIDTH && rect.height >= CONTAINER_MIN_HEIGHT)
                .then_some(ElementKind::Container)
        }
        "button" => Some(ElementKind::Button),
        "input" => {
            let kind = doc.attribute(node, "type").unwrap_or_default().to_ascii_lowercase();
            match kind.as_str() {
                "button" | "submit" | "reset" => Some(ElementKind::Button),
                "hidden" => None,
                _ => Some(ElementKind::Input),
            }
        }
        "select" | "textarea" => Some(ElementKind::Input),
        "a" => {
            let has_text = !doc.text_content(node).trim().is_empty();
            (doc.attribute(node, "href").is_some() && has_text).then_some(ElementKind::Link)
        }
        "img" => {
            let rect = doc.bounding_rect(node)?;
            (rect.width >= IMAGE_MIN_SIZE && rect.height >= IMAGE_MIN_SIZE)
                .then_some(ElementKind::Image)
        }
        _ => (doc.attribute(node, "role").as_deref() == Some("button"))
            .then_some(ElementKind::Button),
    }
}

/// Text color for a container sitting on a given background
pub fn contrast_color<'t>(theme: &'t ThemeConfig, background: Rgb) -> &'t str {
    if background.luminance() < CONTRAST_THRESHOLD {
        &theme.text_colors.on_dark
    } else {
        &theme.text_colors.on_light
    }
}

/// Rules keyed off the engine tags, injected once per activation
pub fn theme_stylesheet(theme: &ThemeConfig) -> String {
    let root = format!(".{}", theme.root_class());
    let mut css = String::new();
    css.push_str(&format!(
        "{root} [{el}=container] {{ border: 2px ridge {neon}; }}\n",
        el = tags::ELEMENT,
        neon = theme.neon_border_color,
    ));
    css.push_str(&format!(
        "{root} [{el}=button] {{ border: 2px outset {neon}; font-family: {heading}; }}\n",
        el = tags::ELEMENT,
        neon = theme.neon_border_color,
        heading = theme.font_families.heading,
    ));
    css.push_str(&format!(
        "{root} [{el}=link] {{ text-decoration: underline; color: {glow}; }}\n",
        el = tags::ELEMENT,
        glow = theme.text_glow_color,
    ));
    css.push_str(&format!(
        "{root} [{el}=input] {{ border: 2px inset {neon}; }}\n",
        el = tags::ELEMENT,
        neon = theme.neon_border_color,
    ));
    css.push_str(&format!(
        "{root} [{el}=image] {{ image-rendering: pixelated; border: 1px solid {neon}; }}\n",
        el = tags::ELEMENT,
        neon = theme.neon_border_color,
    ));
    css.push_str(&format!(
        "[{blink}] {{ animation: retro-blink 1s steps(1) infinite; }}\n\
         @keyframes retro-blink {{ 50% {{ visibility: hidden; }} }}\n\
         @keyframes retro-marquee {{ from {{ transform: translateX(100%); }} to {{ transform: translateX(-100%); }} }}\n",
        blink = tags::BLINK,
    ));
    css
}

/// Tags structural and interactive elements and themes them through one stylesheet
pub struct ElementTransformer {
    ledger: StyleLedger,
    root_classes: Vec<String>,
    theme: Option<ThemeConfig>,
    tagged: usize,
    skipped: usize,
    applied: bool,
}

impl ElementTransformer {
    pub fn new() -> Self {
        Self {
            ledger: StyleLedger::new(),
            root_classes: Vec::new(),
            theme: None,
            tagged: 0,
            skipped: 0,
            applied: false,
        }
    }

    /// Tag and style one node; `Ok(false)` when it is not a candidate
    fn transform_node(
        &mut self,
        doc: &mut dyn Document,
        theme: &ThemeConfig,
        node: NodeId,
    ) -> std::result::Result<bool, DomError> {
        if doc.attribute(node, tags::ELEMENT).is_some() || doc.is_engine_owned(node) {
            return Ok(false);
        }
        let Some(kind) = classify(doc, node) else {
            return Ok(false);
        };

        self.ledger.set_attribute(doc, node, tags::ELEMENT, kind.as_str())?;
        if kind == ElementKind::Container {
            let background = doc.effective_background(node);
            let color = contrast_color(theme, background).to_string();
            self.ledger.set_style(doc, node, "color", &color)?;
        }
        Ok(true)
    }

    fn transform_all(
        &mut self,
        doc: &mut dyn Document,
        theme: &ThemeConfig,
        nodes: Vec<NodeId>,
    ) -> TransformSummary {
        let mut summary = TransformSummary::default();
        for node in nodes {
            match self.transform_node(doc, theme, node) {
                Ok(true) => summary.tagged += 1,
                Ok(false) => {}
                Err(e) => {
                    debug!("Skipping element {:?}: {}", node, e);
                    summary.skipped += 1;
                }
            }
        }
        self.tagged += summary.tagged;
        self.skipped += summary.skipped;
        summary
    }

    /// Apply the same classification to nodes that appeared after activation
    ///
    /// Each node's subtree is considered as well, since hosts often insert whole fragments.
    pub fn transform_new_elements(
        &mut self,
        doc: &mut dyn Document,
        theme: &ThemeConfig,
        nodes: &[NodeId],
    ) -> TransformSummary {
        if !self.applied {
            return TransformSummary::default();
        }
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for &node in nodes {
            if !doc.is_connected(node) {
                continue;
            }
            let subtree = std::iter::once(node).chain(doc.descendants(node));
            candidates.extend(subtree.filter(|n| seen.insert(*n)));
        }
        self.transform_all(doc, theme, candidates)
    }

    /// Tagged element count across apply and late passes
    pub fn tagged_count(&self) -> usize {
        self.tagged
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped
    }

    pub fn theme_id(&self) -> Option<&str> {
        self.theme.as_ref().map(|t| t.id.as_str())
    }
}

impl Default for ElementTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl Applicator for ElementTransformer {
    fn name(&self) -> &str {
        "elements"
    }

    fn description(&self) -> &str {
        "Tags containers, controls, links and images and themes them via an injected stylesheet"
    }

    fn enabled_in(&self, _settings: &Settings) -> bool {
        true
    }

    fn apply(&mut self, doc: &mut dyn Document, ctx: &ApplyContext<'_>) -> Result<()> {
        self.undo(doc)?;
        let root = doc.root().ok_or(DomError::MissingRoot)?;
        let theme = ctx.theme;

        self.ledger.set_attribute(doc, root, tags::THEME, &theme.id)?;
        for class in [theme.root_class(), tags::ACTIVE_CLASS.to_string()] {
            if !doc.has_class(root, &class) {
                doc.add_class(root, &class)?;
                self.root_classes.push(class);
            }
        }

        let sheet = match doc.head() {
            Some(head) => self.ledger.attach_first(doc, head, "style", "theme-stylesheet")?,
            None => self.ledger.attach(doc, "style", "theme-stylesheet")?,
        };
        doc.set_text(sheet, &theme_stylesheet(theme))?;

        self.applied = true;
        self.theme = Some(theme.clone());
        let candidates = doc.all_elements();
        let summary = self.transform_all(doc, theme, candidates);
        info!(
            "Element transformer tagged {} elements ({} skipped)",
            summary.tagged, summary.skipped
        );
        Ok(())
    }

    fn undo(&mut self, doc: &mut dyn Document) -> Result<()> {
        if let Some(root) = doc.root() {
            for class in self.root_classes.drain(..) {
                doc.remove_class(root, &class)?;
            }
        }
        let failures = self.ledger.restore(doc);
        if failures > 0 {
            debug!("Element transformer left {} writes in place", failures);
        }
        self.theme = None;
        self.tagged = 0;
        self.skipped = 0;
        self.applied = false;
        Ok(())
    }

    fn is_applied(&self) -> bool {
        self.applied
    }
}
