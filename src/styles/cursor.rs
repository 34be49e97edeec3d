use std::collections::VecDeque;

use tokio::time::{Duration, Instant};
use tracing::{debug, info};

use super::record::StyleLedger;
use super::traits::{ApplyContext, Applicator};
use crate::config::TrailConfig;
use crate::dom::{Document, DocumentExt, NodeId};
use crate::error::{DomError, DomResult, Result};
use crate::settings::Settings;

const AFFORDANCE_CSS: &str = "a[href], button, [role=button], input[type=submit], \
input[type=button], summary, label[for] { cursor: pointer !important; }\n\
input[type=text], input[type=search], input[type=email], input[type=password], \
input:not([type]), textarea { cursor: text !important; }\n";

#[derive(Debug, Clone, Copy)]
struct Particle {
    node: NodeId,
    born: Instant,
    live: bool,
}

/// Themed pointer, link/button affordance and an optional sparkle trail
pub struct CursorCustomizer {
    ledger: StyleLedger,
    trail_enabled: bool,
    trail: TrailConfig,
    color: String,
    /// Oldest first; never longer than `trail.max_particles`
    particles: VecDeque<Particle>,
    custom_cursor: bool,
    applied: bool,
}

impl CursorCustomizer {
    pub fn new() -> Self {
        Self {
            ledger: StyleLedger::new(),
            trail_enabled: false,
            trail: TrailConfig::default(),
            color: String::new(),
            particles: VecDeque::new(),
            custom_cursor: false,
            applied: false,
        }
    }

    /// Whether the root carries the theme's cursor image
    pub fn has_custom_cursor(&self) -> bool {
        self.custom_cursor
    }

    /// Particle nodes in the pool, visible or not
    pub fn pool_size(&self) -> usize {
        self.particles.len()
    }

    pub fn live_particles(&self) -> usize {
        self.particles.iter().filter(|p| p.live).count()
    }

    /// Spawn a trail particle at the pointer, recycling the oldest once the pool is full
    pub fn on_pointer_move(
        &mut self,
        doc: &mut dyn Document,
        x: f64,
        y: f64,
        now: Instant,
    ) -> DomResult<()> {
        if !self.applied || !self.trail_enabled {
            return Ok(());
        }

        let reusable = self.particles.iter().position(|p| !p.live);
        let recycled = match reusable {
            Some(index) => self.particles.remove(index).map(|p| p.node),
            None if self.particles.len() >= self.trail.max_particles => {
                self.particles.pop_front().map(|p| p.node)
            }
            None => None,
        };
        let (node, fresh) = match recycled {
            Some(node) if doc.is_connected(node) => (node, false),
            _ => (self.ledger.attach(doc, "div", "trail-particle")?, true),
        };

        match self.place(doc, node, fresh, x, y) {
            Ok(()) => {
                self.particles.push_back(Particle {
                    node,
                    born: now,
                    live: true,
                });
                Ok(())
            }
            Err(e) => {
                self.park(doc, node, now);
                Err(e)
            }
        }
    }

    fn place(
        &self,
        doc: &mut dyn Document,
        node: NodeId,
        fresh: bool,
        x: f64,
        y: f64,
    ) -> DomResult<()> {
        if fresh {
            for (property, value) in [
                ("position", "fixed"),
                ("pointer-events", "none"),
                ("border-radius", "50%"),
                ("z-index", "9500"),
                ("background-color", self.color.as_str()),
            ] {
                doc.set_style_property(node, property, value)?;
            }
        }
        let size = format!("{}px", self.trail.size_px);
        let (left, top) = (format!("{}px", x), format!("{}px", y));
        for (property, value) in [
            ("display", "block"),
            ("left", left.as_str()),
            ("top", top.as_str()),
            ("width", size.as_str()),
            ("height", size.as_str()),
            ("opacity", "1"),
        ] {
            doc.set_style_property(node, property, value)?;
        }
        Ok(())
    }

    /// Return a half-placed particle to the pool hidden, or drop it if it cannot be hidden
    fn park(&mut self, doc: &mut dyn Document, node: NodeId, now: Instant) {
        match doc.set_style_property(node, "display", "none") {
            Ok(()) => self.particles.push_back(Particle {
                node,
                born: now,
                live: false,
            }),
            Err(e) => {
                debug!("Trail particle {:?} could not be hidden: {}", node, e);
                if let Err(e) = doc.remove_node(node) {
                    debug!("Trail particle {:?} left in place: {}", node, e);
                }
            }
        }
    }

    /// Fade and shrink live particles; expired ones are hidden and returned to the pool
    pub fn animate(&mut self, doc: &mut dyn Document, now: Instant) {
        let lifetime = self.trail.lifetime().as_secs_f64().max(f64::EPSILON);
        let size = self.trail.size_px;
        for particle in self.particles.iter_mut().filter(|p| p.live) {
            let age = now.saturating_duration_since(particle.born).as_secs_f64();
            let progress = (age / lifetime).min(1.0);
            let result = if progress >= 1.0 {
                particle.live = false;
                doc.set_style_property(particle.node, "display", "none")
            } else {
                let remaining = 1.0 - progress;
                let px = format!("{:.1}px", size * remaining);
                doc.set_style_property(particle.node, "opacity", &format!("{:.2}", remaining))
                    .and_then(|_| doc.set_style_property(particle.node, "width", &px))
                    .and_then(|_| doc.set_style_property(particle.node, "height", &px))
            };
            if let Err(e) = result {
                debug!("Trail particle {:?} dropped: {}", particle.node, e);
                particle.live = false;
            }
        }
    }

    /// Time until the next animation frame is worth running
    pub fn next_frame(&self) -> Option<Duration> {
        (self.live_particles() > 0).then(|| Duration::from_millis(16))
    }
}

impl Default for CursorCustomizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Applicator for CursorCustomizer {
    fn name(&self) -> &str {
        "cursor"
    }

    fn description(&self) -> &str {
        "Theme cursor image, pointer affordance on controls and a fading particle trail"
    }

    fn enabled_in(&self, settings: &Settings) -> bool {
        settings.custom_settings.cursor.enabled
    }

    fn apply(&mut self, doc: &mut dyn Document, ctx: &ApplyContext<'_>) -> Result<()> {
        self.undo(doc)?;
        let root = doc.root().ok_or(DomError::MissingRoot)?;

        if ctx.assets.cursor.is_loaded() {
            let cursor = format!("url(\"{}\") 0 0, auto", ctx.assets.cursor.url());
            self.ledger.set_style(doc, root, "cursor", &cursor)?;
            self.custom_cursor = true;
        } else {
            info!("Cursor image unavailable; keeping the page cursor");
        }
        self.applied = true;

        let sheet = match doc.head() {
            Some(head) => self.ledger.attach_first(doc, head, "style", "cursor-affordance"),
            None => self.ledger.attach(doc, "style", "cursor-affordance"),
        };
        match sheet {
            Ok(sheet) => doc.set_text(sheet, AFFORDANCE_CSS)?,
            Err(e) => debug!("Cursor affordance skipped: {}", e),
        }

        self.trail_enabled = ctx.settings.custom_settings.cursor.trail;
        self.trail = ctx.config.trail.clone();
        self.color = ctx.theme.text_glow_color.clone();
        Ok(())
    }

    fn undo(&mut self, doc: &mut dyn Document) -> Result<()> {
        self.particles.clear();
        let failures = self.ledger.restore(doc);
        if failures > 0 {
            debug!("Cursor customizer left {} writes in place", failures);
        }
        self.trail_enabled = false;
        self.custom_cursor = false;
        self.applied = false;
        Ok(())
    }

    fn is_applied(&self) -> bool {
        self.applied
    }
}
