use rand::{rngs::SmallRng, seq::SliceRandom, Rng, SeedableRng};
use tokio::time::Duration;
use tracing::{debug, info};

use super::record::StyleLedger;
use super::traits::{ApplyContext, Applicator};
use crate::audio::{AudioSink, NullAudio, SoundBoard, SoundTrigger};
use crate::config::CounterConfig;
use crate::dom::{Document, DocumentExt, NodeId};
use crate::error::{DomResult, Result};
use crate::settings::Settings;

const VINTAGE_SALT: u64 = 0x1998;
const COUNTER_DIGITS: usize = 6;
const MIN_STICKERS: usize = 2;
const MAX_STICKERS: usize = 4;

/// Corner and edge positions a sticker can occupy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StickerSlot {
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl StickerSlot {
    pub const ALL: [StickerSlot; 8] = [
        Self::TopLeft,
        Self::TopCenter,
        Self::TopRight,
        Self::MiddleLeft,
        Self::MiddleRight,
        Self::BottomLeft,
        Self::BottomCenter,
        Self::BottomRight,
    ];

    /// Inline placement declarations for the slot
    fn placement(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::TopLeft => &[("top", "8px"), ("left", "8px")],
            Self::TopCenter => &[("top", "8px"), ("left", "50%")],
            Self::TopRight => &[("top", "8px"), ("right", "8px")],
            Self::MiddleLeft => &[("top", "50%"), ("left", "8px")],
            Self::MiddleRight => &[("top", "50%"), ("right", "8px")],
            Self::BottomLeft => &[("bottom", "8px"), ("left", "8px")],
            Self::BottomCenter => &[("bottom", "8px"), ("left", "50%")],
            Self::BottomRight => &[("bottom", "8px"), ("right", "8px")],
        }
    }
}

/// Visitor counter, stickers and sound effects straight out of 1998
pub struct VintageElements {
    ledger: StyleLedger,
    rng: SmallRng,
    counter: Option<NodeId>,
    counter_value: u64,
    counter_timing: CounterConfig,
    stickers: Vec<(StickerSlot, NodeId)>,
    sounds: SoundBoard,
    applied: bool,
}

impl VintageElements {
    pub fn new() -> Self {
        Self::with_audio(Box::new(NullAudio))
    }

    pub fn with_audio(sink: Box<dyn AudioSink>) -> Self {
        Self {
            ledger: StyleLedger::new(),
            rng: SmallRng::seed_from_u64(VINTAGE_SALT),
            counter: None,
            counter_value: 0,
            counter_timing: CounterConfig::default(),
            stickers: Vec::new(),
            sounds: SoundBoard::new(sink),
            applied: false,
        }
    }

    pub fn counter(&self) -> Option<NodeId> {
        self.counter
    }

    pub fn counter_value(&self) -> Option<u64> {
        self.counter.map(|_| self.counter_value)
    }

    pub fn sticker_slots(&self) -> Vec<StickerSlot> {
        self.stickers.iter().map(|(slot, _)| *slot).collect()
    }

    pub fn sounds(&self) -> &SoundBoard {
        &self.sounds
    }

    /// Random wait before the next counter tick
    pub fn next_counter_delay(&mut self) -> Duration {
        let CounterConfig {
            min_interval_ms,
            max_interval_ms,
        } = self.counter_timing;
        Duration::from_millis(self.rng.gen_range(min_interval_ms..=max_interval_ms))
    }

    fn build_counter(&mut self, doc: &mut dyn Document) -> DomResult<NodeId> {
        let counter = self.ledger.attach(doc, "div", "counter")?;
        for (property, value) in [
            ("display", "inline-block"),
            ("font-family", "\"Courier New\", monospace"),
            ("background-color", "#000000"),
            ("color", "#00ff00"),
            ("padding", "2px 4px"),
            ("letter-spacing", "2px"),
        ] {
            doc.set_style_property(counter, property, value)?;
        }
        Ok(counter)
    }

    /// Render the counter value as one span per digit
    fn render_digits(&self, doc: &mut dyn Document, counter: NodeId) -> DomResult<()> {
        let digits = format!("{:0width$}", self.counter_value, width = COUNTER_DIGITS);
        let spans = doc.children(counter);
        if spans.len() != digits.len() {
            for span in spans {
                doc.remove_node(span)?;
            }
            for digit in digits.chars() {
                let span = doc.create_element("span")?;
                doc.set_text(span, &digit.to_string())?;
                doc.set_style_property(span, "border", "1px solid #333333")?;
                doc.append_child(counter, span)?;
            }
            return Ok(());
        }
        for (span, digit) in spans.into_iter().zip(digits.chars()) {
            doc.set_text(span, &digit.to_string())?;
        }
        Ok(())
    }

    /// Advance the visitor counter by one; `None` when there is no counter
    pub fn increment_counter(&mut self, doc: &mut dyn Document) -> Option<u64> {
        let counter = self.counter?;
        if !doc.is_connected(counter) {
            debug!("Visitor counter was removed by the page");
            self.counter = None;
            return None;
        }
        self.counter_value += 1;
        if let Err(e) = self.render_digits(doc, counter) {
            debug!("Counter update failed: {}", e);
        }
        self.sounds.trigger(SoundTrigger::CounterTick);
        Some(self.counter_value)
    }

    fn place_stickers(&mut self, doc: &mut dyn Document, urls: &[String]) {
        let count = self.rng.gen_range(MIN_STICKERS..=MAX_STICKERS);
        let slots: Vec<StickerSlot> = StickerSlot::ALL
            .choose_multiple(&mut self.rng, count)
            .copied()
            .collect();

        for slot in slots {
            let Some(url) = urls.choose(&mut self.rng) else {
                return;
            };
            let placed = self.ledger.attach(doc, "img", "sticker").and_then(|node| {
                doc.set_attribute(node, "src", url)?;
                doc.set_attribute(node, "alt", "")?;
                doc.set_style_property(node, "position", "fixed")?;
                doc.set_style_property(node, "pointer-events", "none")?;
                doc.set_style_property(node, "z-index", "9100")?;
                for (property, value) in slot.placement() {
                    doc.set_style_property(node, property, value)?;
                }
                Ok(node)
            });
            match placed {
                Ok(node) => self.stickers.push((slot, node)),
                Err(e) => debug!("Sticker at {:?} skipped: {}", slot, e),
            }
        }
    }

    /// First user interaction with the page
    pub fn on_user_gesture(&mut self) {
        self.sounds.on_user_gesture();
    }

    /// Click sound for interactive targets
    pub fn on_click(&mut self, doc: &dyn Document, target: NodeId) -> bool {
        let interactive = doc.tag_name(target).is_some_and(|t| t == "a" || t == "button")
            || doc.attribute(target, "role").as_deref() == Some("button");
        interactive && self.sounds.trigger(SoundTrigger::Click)
    }
}

impl Default for VintageElements {
    fn default() -> Self {
        Self::new()
    }
}

impl Applicator for VintageElements {
    fn name(&self) -> &str {
        "vintage"
    }

    fn description(&self) -> &str {
        "Visitor counter, corner stickers and synthesized sound effects"
    }

    fn enabled_in(&self, settings: &Settings) -> bool {
        settings.custom_settings.vintage_elements.enabled
    }

    fn apply(&mut self, doc: &mut dyn Document, ctx: &ApplyContext<'_>) -> Result<()> {
        self.undo(doc)?;
        let options = &ctx.settings.custom_settings.vintage_elements;
        self.rng = SmallRng::seed_from_u64(ctx.config.seed_for(VINTAGE_SALT));
        self.counter_timing = ctx.config.counter.clone();
        self.applied = true;

        if options.counter && ctx.theme.vintage.counter {
            self.counter_value = options
                .counter_start
                .unwrap_or_else(|| self.rng.gen_range(1_000..100_000));
            let counter = self.build_counter(doc)?;
            self.render_digits(doc, counter)?;
            self.counter = Some(counter);
        }

        if options.stickers && !ctx.assets.stickers.is_empty() {
            self.place_stickers(doc, &ctx.assets.stickers);
        }

        self.sounds
            .set_enabled(options.sounds && ctx.theme.vintage.sounds_enabled);

        info!(
            "Vintage elements applied: counter={}, {} stickers, sounds={}",
            self.counter.is_some(),
            self.stickers.len(),
            self.sounds.is_enabled()
        );
        Ok(())
    }

    fn undo(&mut self, doc: &mut dyn Document) -> Result<()> {
        let failures = self.ledger.restore(doc);
        if failures > 0 {
            debug!("Vintage elements left {} writes in place", failures);
        }
        self.counter = None;
        self.stickers.clear();
        self.sounds.set_enabled(false);
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
    use crate::audio::sink::testing::RecordingAudio;
    use crate::dom::{tags, MemoryDocument};
    use crate::styles::traits::testing::Fixture;
    use std::collections::HashSet;

    #[test]
    fn test_counter_renders_digits_and_increments() {
        let mut doc = MemoryDocument::new();
        let mut fixture = Fixture::new("geocities");
        fixture.settings.custom_settings.vintage_elements.counter_start = Some(1337);
        let mut vintage = VintageElements::new();
        vintage.apply(&mut doc, &fixture.ctx()).unwrap();

        let counter = vintage.counter().unwrap();
        assert_eq!(doc.text_content(counter).replace(' ', ""), "001337");
        assert_eq!(vintage.increment_counter(&mut doc), Some(1338));
        assert_eq!(doc.text_content(counter).replace(' ', ""), "001338");
    }

    #[test]
    fn test_counter_delay_in_range() {
        let mut vintage = VintageElements::new();
        for _ in 0..50 {
            let delay = vintage.next_counter_delay();
            assert!(delay >= Duration::from_secs(5) && delay <= Duration::from_secs(10));
        }
    }

    #[test]
    fn test_stickers_use_distinct_slots() {
        for seed in 0..20 {
            let mut doc = MemoryDocument::new();
            let mut fixture = Fixture::new("geocities");
            fixture.config.seed = Some(seed);
            let mut vintage = VintageElements::new();
            vintage.apply(&mut doc, &fixture.ctx()).unwrap();

            let slots = vintage.sticker_slots();
            assert!((MIN_STICKERS..=MAX_STICKERS).contains(&slots.len()));
            let unique: HashSet<_> = slots.iter().collect();
            assert_eq!(unique.len(), slots.len());
        }
    }

    #[test]
    fn test_theme_without_counter() {
        let mut doc = MemoryDocument::new();
        let fixture = Fixture::new("vaporwave");
        let mut vintage = VintageElements::new();
        vintage.apply(&mut doc, &fixture.ctx()).unwrap();
        assert!(vintage.counter().is_none());
        assert_eq!(vintage.increment_counter(&mut doc), None);
    }

    #[test]
    fn test_sounds_wait_for_gesture() {
        let mut doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let link = doc.append_element(body, "a").unwrap();
        let mut fixture = Fixture::new("geocities");
        fixture.settings.custom_settings.vintage_elements.sounds = true;

        let sink = RecordingAudio::allowing();
        let mut vintage = VintageElements::with_audio(Box::new(sink.clone()));
        vintage.apply(&mut doc, &fixture.ctx()).unwrap();

        assert!(!vintage.on_click(&doc, link));
        vintage.on_user_gesture();
        assert!(vintage.on_click(&doc, link));
        assert!(!vintage.on_click(&doc, body));
        assert_eq!(sink.played.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_undo_removes_everything() {
        let mut doc = MemoryDocument::new();
        let fixture = Fixture::new("geocities");
        let mut vintage = VintageElements::new();
        vintage.apply(&mut doc, &fixture.ctx()).unwrap();
        vintage.apply(&mut doc, &fixture.ctx()).unwrap();
        assert!(!doc.nodes_with_attribute(tags::OWNED).is_empty());

        vintage.undo(&mut doc).unwrap();
        assert!(doc.engine_tagged_nodes().is_empty());
        assert_eq!(doc.connected_count(), 3);
    }
}
