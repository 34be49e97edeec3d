use tracing::debug;

use super::log_failure;
use crate::audio::AudioSink;
use crate::dom::Document;
use crate::styles::{
    Applicator, ApplyContext, BackgroundStyler, CursorCustomizer, ElementTransformer,
    FontTransformer, VintageElements,
};

/// Which applicators a pass ran, left out, or lost to a failure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub applied: Vec<String>,
    pub disabled: Vec<String>,
    pub failed: Vec<String>,
}

/// The five applicators, run in a fixed order and undone in exactly the reverse one
pub struct Applicators {
    pub elements: ElementTransformer,
    pub background: BackgroundStyler,
    pub fonts: FontTransformer,
    pub cursor: CursorCustomizer,
    pub vintage: VintageElements,
}

impl Applicators {
    pub fn new() -> Self {
        Self {
            elements: ElementTransformer::new(),
            background: BackgroundStyler::new(),
            fonts: FontTransformer::new(),
            cursor: CursorCustomizer::new(),
            vintage: VintageElements::new(),
        }
    }

    pub fn with_audio(sink: Box<dyn AudioSink>) -> Self {
        Self {
            vintage: VintageElements::with_audio(sink),
            ..Self::new()
        }
    }

    fn in_apply_order(&mut self) -> [&mut dyn Applicator; 5] {
        let order: [&mut dyn Applicator; 5] = [
            &mut self.elements,
            &mut self.background,
            &mut self.fonts,
            &mut self.cursor,
            &mut self.vintage,
        ];
        order
    }

    /// Names of the applicators currently applied, in apply order
    pub fn applied_names(&mut self) -> Vec<String> {
        self.in_apply_order()
            .into_iter()
            .filter(|a| a.is_applied())
            .map(|a| a.name().to_string())
            .collect()
    }

    /// Run every enabled applicator; one failing never stops the rest
    pub fn apply_all(&mut self, doc: &mut dyn Document, ctx: &ApplyContext<'_>) -> PassReport {
        let mut report = PassReport::default();
        for applicator in self.in_apply_order() {
            let name = applicator.name().to_string();
            if !applicator.enabled_in(ctx.settings) {
                debug!("Applicator '{}' disabled by settings", name);
                report.disabled.push(name);
                continue;
            }
            match applicator.apply(doc, ctx) {
                Ok(()) => report.applied.push(name),
                Err(e) => {
                    log_failure(&format!("'{}' applicator", name), &e);
                    // Take back whatever the partial pass wrote
                    if let Err(e) = applicator.undo(doc) {
                        log_failure(&format!("'{}' cleanup", name), &e);
                    }
                    report.failed.push(name);
                }
            }
        }
        report
    }

    /// Undo in reverse apply order; returns how many undos reported an error
    pub fn undo_all(&mut self, doc: &mut dyn Document) -> usize {
        let mut order = self.in_apply_order();
        order.reverse();
        let mut failures = 0;
        for applicator in order {
            if let Err(e) = applicator.undo(doc) {
                log_failure(&format!("'{}' undo", applicator.name()), &e);
                failures += 1;
            }
        }
        failures
    }
}

impl Default for Applicators {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{tags, MemoryDocument};
    use crate::styles::traits::testing::Fixture;

    #[test]
    fn test_settings_gate_applicators() {
        let mut doc = MemoryDocument::new();
        let mut fixture = Fixture::new("geocities");
        fixture.settings.custom_settings.cursor.enabled = false;
        fixture.settings.custom_settings.vintage_elements.enabled = false;

        let mut applicators = Applicators::new();
        let report = applicators.apply_all(&mut doc, &fixture.ctx());
        assert_eq!(report.applied, vec!["elements", "background", "fonts"]);
        assert_eq!(report.disabled, vec!["cursor", "vintage"]);
        assert_eq!(applicators.applied_names(), report.applied);

        assert_eq!(applicators.undo_all(&mut doc), 0);
        assert!(applicators.applied_names().is_empty());
        assert!(doc.engine_tagged_nodes().is_empty());
    }

    #[test]
    fn test_policy_failure_skips_one_feature() {
        let mut doc = MemoryDocument::new();
        doc.deny_style_property("cursor");
        let fixture = Fixture::new("geocities");

        let mut applicators = Applicators::new();
        let report = applicators.apply_all(&mut doc, &fixture.ctx());
        assert_eq!(report.failed, vec!["cursor"]);
        assert!(report.applied.contains(&"vintage".to_string()));
        assert!(!applicators.cursor.is_applied());

        let root = doc.root().unwrap();
        assert!(doc.attribute(root, tags::THEME).is_some());
    }
}
