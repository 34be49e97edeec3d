//! # Orchestrator
//!
//! [`RetroTransformer`] is the one stateful object of the crate. It owns the host document
//! handle, the current [`Settings`], every applicator and effect, and the timers that keep them in
//! step with a page that keeps changing underneath.
//!
//! ## Lifecycle
//!
//! 1. **Activate**: probe the page, snapshot the root, mark regions, run the applicators, boost
//!    interactive controls, arm synchronization
//! 2. **Synchronize**: host mutations schedule a debounced re-pass; a periodic rescan catches
//!    anything the subscription missed; an address change triggers a full reapply once settled
//! 3. **Deactivate**: cancel every timer, then unwind in exactly the reverse order and restore
//!    the snapshot
//!
//! The engine is driven from outside: the host loop feeds it events and calls [`tick`] when the
//! next deadline passes. Every public operation is a failure boundary; nothing it does can fail
//! the caller.
//!
//! [`tick`]: RetroTransformer::tick

pub mod navigation;
pub mod pipeline;
pub mod snapshot;
pub mod sync;
pub mod timers;

pub use navigation::{NavigationSignal, NavigationWatch};
pub use pipeline::{Applicators, PassReport};
pub use snapshot::{DocumentSnapshot, InteractiveBoost};
pub use sync::{MutationFilter, SyncPlan};
pub use timers::{TimerKind, TimerQueue};

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::assets::ResourceLoader;
use crate::audio::AudioSink;
use crate::config::EngineConfig;
use crate::dom::{tags, Document, DocumentExt, NodeId, Selector};
use crate::effects::CrashEffect;
use crate::error::{EngineError, FailureClass, ThemeError};
use crate::probe::{CompatibilityProbe, IncompatibilityReport};
use crate::regions::RegionDetector;
use crate::settings::Settings;
use crate::styles::{ApplyContext, ThemeAssets};
use crate::theme::{ThemeCatalog, ThemeConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EngineState {
    Inactive,
    Active,
}

/// Input from the host page other than mutations
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    PointerMove { x: f64, y: f64 },
    /// Counts as a user gesture too, so the click that unlocks audio may already make a sound
    Click { target: NodeId },
    DoubleClick,
    /// Key press or touch; unlocks audio
    UserGesture,
    Navigation(NavigationSignal),
}

/// Log a failure caught at an entry point, keeping policy refusals distinct
pub(crate) fn log_failure(stage: &str, err: &EngineError) {
    if err.is_node_gone() {
        debug!("{}: node vanished mid-pass ({})", stage, err);
        return;
    }
    match err.class() {
        FailureClass::PolicyRestriction => {
            warn!("🚫 {} skipped, blocked by host policy: {}", stage, err)
        }
        FailureClass::Generic => error!("❌ {} failed: {}", stage, err),
    }
}

/// Adaptive page re-skinning engine
pub struct RetroTransformer<D: Document> {
    doc: D,
    catalog: Box<dyn ThemeCatalog>,
    loader: ResourceLoader,
    config: EngineConfig,
    settings: Settings,
    state: EngineState,

    theme: Option<ThemeConfig>,
    assets: ThemeAssets,

    probe: CompatibilityProbe,
    regions: RegionDetector,
    applicators: Applicators,
    crash: CrashEffect,
    boost: InteractiveBoost,
    snapshot: Option<DocumentSnapshot>,

    timers: TimerQueue,
    filter: MutationFilter,
    rescan: Selector,
    navigation: NavigationWatch,
    /// Host nodes added since the last debounced pass
    pending: Vec<NodeId>,

    last_report: Option<IncompatibilityReport>,
}

impl<D: Document> RetroTransformer<D> {
    pub fn new(
        doc: D,
        catalog: Box<dyn ThemeCatalog>,
        loader: ResourceLoader,
        config: EngineConfig,
    ) -> Self {
        let navigation = NavigationWatch::new(&doc);
        Self {
            filter: MutationFilter::new(&config.sync),
            crash: CrashEffect::new(config.crash.clone()),
            doc,
            catalog,
            loader,
            config,
            settings: Settings::default(),
            state: EngineState::Inactive,
            theme: None,
            assets: ThemeAssets::placeholder(),
            probe: CompatibilityProbe::new(),
            regions: RegionDetector::new(),
            applicators: Applicators::new(),
            boost: InteractiveBoost::new(),
            snapshot: None,
            timers: TimerQueue::new(),
            rescan: Selector::parse(sync::RESCAN_SELECTORS),
            navigation,
            pending: Vec::new(),
            last_report: None,
        }
    }

    /// Route sound effects to a real output
    pub fn with_audio(mut self, sink: Box<dyn AudioSink>) -> Self {
        self.applicators = Applicators::with_audio(sink);
        self
    }

    /// Initial settings, typically loaded from a store before the first activation
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    // ==========================================
    // ACCESSORS
    // ==========================================

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == EngineState::Active
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn theme(&self) -> Option<&ThemeConfig> {
        self.theme.as_ref()
    }

    /// Findings of the most recent compatibility probe
    pub fn last_report(&self) -> Option<&IncompatibilityReport> {
        self.last_report.as_ref()
    }

    pub fn document(&self) -> &D {
        &self.doc
    }

    /// Direct access for the host side; mutations made here are picked up on the next tick
    pub fn document_mut(&mut self) -> &mut D {
        &mut self.doc
    }

    pub fn into_document(self) -> D {
        self.doc
    }

    pub fn applicators(&self) -> &Applicators {
        &self.applicators
    }

    pub fn crash(&self) -> &CrashEffect {
        &self.crash
    }

    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    pub fn regions(&self) -> &RegionDetector {
        &self.regions
    }

    // ==========================================
    // LIFECYCLE
    // ==========================================

    /// Apply the current theme to the page; returns whether the engine is active afterwards.
    ///
    /// Only a page without a document root, or an unknown theme, keeps the engine inactive.
    pub async fn activate(&mut self) -> bool {
        if self.is_active() {
            debug!("Activate ignored: already active");
            return true;
        }

        let report = self.probe.check(&self.doc);
        for warning in &report.warnings {
            warn!("⚠️  Compatibility: {}", warning);
        }
        let critical = report.critical;
        self.last_report = Some(report);
        if critical {
            let err: EngineError = crate::error::DomError::MissingRoot.into();
            error!("❌ Activation refused: {}", err.user_message());
            return false;
        }

        let theme_id = self.settings.current_theme.clone();
        let Some(theme) = self.catalog.get_theme(&theme_id) else {
            log_failure("Activation", &ThemeError::NotFound { id: theme_id }.into());
            return false;
        };

        info!("🎨 Activating theme '{}'", theme.display_name);
        self.assets = ThemeAssets::load(&mut self.loader, &theme).await;
        self.theme = Some(theme);

        match DocumentSnapshot::capture(&self.doc) {
            Ok(snapshot) => self.snapshot = Some(snapshot),
            Err(e) => {
                log_failure("Snapshot", &e.into());
                self.theme = None;
                return false;
            }
        }

        let now = Instant::now();
        self.apply_all();
        self.navigation.reset(&self.doc);
        self.timers
            .schedule(TimerKind::Rescan, now + self.config.sync.rescan_interval());
        self.arm_feature_timers(now);
        self.state = EngineState::Active;

        info!(
            "✨ Theme '{}' active at {}",
            theme_id_of(&self.theme),
            self.doc.location()
        );
        true
    }

    /// Take everything back; returns whether there was anything to take back
    pub fn deactivate(&mut self) -> bool {
        if !self.is_active() {
            debug!("Deactivate ignored: not active");
            return false;
        }

        // Synchronization first, so nothing re-applies mid-teardown
        self.timers.cancel_all();
        self.pending.clear();

        self.teardown_all();
        let swept = self.sweep();
        if swept > 0 {
            warn!("Safety sweep removed {} leftover engine marks", swept);
        }
        if let Some(snapshot) = self.snapshot.take() {
            if let Err(e) = snapshot.restore(&mut self.doc) {
                log_failure("Snapshot restore", &e.into());
            }
        }
        self.doc.take_mutations();

        self.theme = None;
        self.state = EngineState::Inactive;
        info!("👋 Retro theme removed");
        true
    }

    /// Replace the settings; when active, reapply under them (or deactivate if disabled)
    pub async fn update_settings(&mut self, settings: Settings) {
        let theme_changed = settings.current_theme != self.settings.current_theme;
        self.settings = settings;

        if !self.is_active() {
            debug!("Settings stored; engine inactive");
            return;
        }
        if !self.settings.enabled {
            self.deactivate();
            return;
        }

        if theme_changed {
            let theme_id = self.settings.current_theme.clone();
            match self.catalog.get_theme(&theme_id) {
                Some(theme) => {
                    info!("🎨 Switching to theme '{}'", theme.display_name);
                    self.assets = ThemeAssets::load(&mut self.loader, &theme).await;
                    self.theme = Some(theme);
                }
                None => log_failure(
                    "Theme switch",
                    &ThemeError::NotFound { id: theme_id }.into(),
                ),
            }
        }

        let now = Instant::now();
        self.reapply(now);
    }

    // ==========================================
    // EVENT LOOP ENTRY POINTS
    // ==========================================

    /// Run everything due at `now`: host mutations first, then timers, then the trail animation
    pub fn tick(&mut self, now: Instant) {
        if !self.is_active() {
            return;
        }
        self.pump(now);

        for kind in self.timers.take_due(now) {
            match kind {
                TimerKind::Debounce => self.resync(),
                TimerKind::Rescan => {
                    self.rescan_untagged();
                    self.timers
                        .schedule(TimerKind::Rescan, now + self.config.sync.rescan_interval());
                }
                TimerKind::NavigationSettle => {
                    info!("🧭 Page changed to {}; reapplying", self.doc.location());
                    self.reapply(now);
                }
                TimerKind::CounterIncrement => {
                    if let Some(value) = self.applicators.vintage.increment_counter(&mut self.doc) {
                        debug!("Visitor counter at {}", value);
                        let delay = self.applicators.vintage.next_counter_delay();
                        self.timers.schedule(TimerKind::CounterIncrement, now + delay);
                    }
                }
                TimerKind::CrashWatchdog => {
                    if let Some(exit) = self.crash.check(&mut self.doc) {
                        info!("Ghost trail cleared: {:?}", exit);
                    }
                    self.crash.scan(&self.doc);
                    if self.crash.is_enabled() {
                        let at = now + self.config.crash.poll_interval();
                        self.timers.schedule(TimerKind::CrashWatchdog, at);
                    }
                }
            }
        }

        self.applicators.cursor.animate(&mut self.doc, now);
        self.doc.take_mutations();
    }

    pub fn handle_event(&mut self, event: HostEvent, now: Instant) {
        if !self.is_active() {
            return;
        }
        self.pump(now);

        match event {
            HostEvent::PointerMove { x, y } => {
                if let Err(e) = self.applicators.cursor.on_pointer_move(&mut self.doc, x, y, now) {
                    log_failure("Cursor trail", &e.into());
                }
                if let Err(e) = self.crash.on_pointer_move(&mut self.doc, x, y) {
                    log_failure("Ghost trail", &e.into());
                }
            }
            HostEvent::Click { target } => {
                self.applicators.vintage.on_user_gesture();
                self.applicators.vintage.on_click(&self.doc, target);
            }
            HostEvent::DoubleClick => self.crash.on_double_click(&mut self.doc),
            HostEvent::UserGesture => self.applicators.vintage.on_user_gesture(),
            HostEvent::Navigation(signal) => {
                if self.navigation.observe(&self.doc, Some(signal)) {
                    self.schedule_navigation(now);
                }
            }
        }

        self.doc.take_mutations();
    }

    /// When the host loop should next call [`tick`](Self::tick)
    pub fn next_deadline(&self, now: Instant) -> Option<Instant> {
        if !self.is_active() {
            return None;
        }
        let frame = self.applicators.cursor.next_frame().map(|d| now + d);
        match (self.timers.next_deadline(), frame) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // ==========================================
    // APPLY / TEARDOWN
    // ==========================================

    /// Regions, applicators, crash effect, boost; in that order
    fn apply_all(&mut self) {
        let Some(theme) = self.theme.as_ref() else {
            return;
        };

        let summary = self.regions.mark_regions(&mut self.doc);
        debug!(
            "Marked {} regions ({} nodes skipped)",
            summary.regions.len(),
            summary.skipped
        );

        let ctx = ApplyContext {
            theme,
            settings: &self.settings,
            assets: &self.assets,
            config: &self.config,
        };
        let report = self.applicators.apply_all(&mut self.doc, &ctx);
        info!(
            "   Applied: [{}]  disabled: [{}]  failed: [{}]",
            report.applied.join(", "),
            report.disabled.join(", "),
            report.failed.join(", ")
        );

        self.crash.set_config(self.config.crash.clone());
        self.crash.set_enabled(&mut self.doc, theme.crash_on_modal);
        self.crash.scan(&self.doc);

        let boosted = self.boost.apply(&mut self.doc, self.config.interactive_z_index);
        debug!("Boosted {} interactive controls", boosted);

        self.doc.take_mutations();
    }

    /// Exact reverse of [`apply_all`](Self::apply_all)
    fn teardown_all(&mut self) {
        let failures = self.boost.restore(&mut self.doc);
        if failures > 0 {
            debug!("{} boosted controls could not be restored", failures);
        }
        self.crash.set_enabled(&mut self.doc, false);
        self.applicators.undo_all(&mut self.doc);
        let unmarked = self.regions.unmark_regions(&mut self.doc);
        if unmarked.skipped > 0 {
            warn!("🚫 {} region marks could not be removed", unmarked.skipped);
        }
    }

    /// Full undo then apply under the current theme and settings
    fn reapply(&mut self, now: Instant) {
        self.pending.clear();
        self.timers.cancel(TimerKind::Debounce);
        self.timers.cancel(TimerKind::NavigationSettle);

        self.teardown_all();
        self.apply_all();
        self.navigation.reset(&self.doc);
        self.arm_feature_timers(now);
    }

    /// Remove any engine node or attribute the applicators missed
    fn sweep(&mut self) -> usize {
        let mut swept = 0;
        for node in self.doc.all_elements() {
            if self.doc.is_connected(node) && self.doc.attribute(node, tags::OWNED).is_some() {
                match self.doc.remove_node(node) {
                    Ok(()) => swept += 1,
                    Err(e) => log_failure("Sweep", &e.into()),
                }
            }
        }
        for node in self.doc.all_elements() {
            for name in self.doc.attribute_names(node) {
                if !tags::is_engine_attribute(&name) {
                    continue;
                }
                match self.doc.remove_attribute(node, &name) {
                    Ok(()) => swept += 1,
                    Err(e) => log_failure("Sweep", &e.into()),
                }
            }
        }
        swept
    }

    fn arm_feature_timers(&mut self, now: Instant) {
        self.timers.cancel(TimerKind::CounterIncrement);
        self.timers.cancel(TimerKind::CrashWatchdog);

        if self.applicators.vintage.counter().is_some() {
            let delay = self.applicators.vintage.next_counter_delay();
            self.timers.schedule(TimerKind::CounterIncrement, now + delay);
        }
        if self.crash.is_enabled() {
            self.timers.schedule(
                TimerKind::CrashWatchdog,
                now + self.config.crash.poll_interval(),
            );
        }
    }

    // ==========================================
    // SYNCHRONIZATION
    // ==========================================

    /// Consume pending host mutations and schedule whatever they call for
    fn pump(&mut self, now: Instant) {
        let records = self.doc.take_mutations();
        let plan = self.filter.plan(&self.doc, &records);
        if plan.ignored > 0 {
            debug!("Ignored {} engine-caused mutation records", plan.ignored);
        }

        let signal = plan.title_changed.then_some(NavigationSignal::TitleChanged);
        if self.navigation.observe(&self.doc, signal) {
            self.schedule_navigation(now);
            return;
        }
        if !plan.resync || self.timers.is_armed(TimerKind::NavigationSettle) {
            return;
        }
        for node in plan.added {
            if !self.pending.contains(&node) {
                self.pending.push(node);
            }
        }
        self.timers
            .schedule(TimerKind::Debounce, now + self.config.sync.debounce());
    }

    fn schedule_navigation(&mut self, now: Instant) {
        self.pending.clear();
        self.timers.cancel(TimerKind::Debounce);
        let settle = self.config.sync.navigation_settle();
        self.timers.schedule(TimerKind::NavigationSettle, now + settle);
        info!("🧭 Navigation detected; reapplying in {:?}", settle);
    }

    /// Debounced pass over nodes added since the last one
    fn resync(&mut self) {
        let added = std::mem::take(&mut self.pending);
        let Some(theme) = self.theme.as_ref() else {
            return;
        };

        let summary = self
            .applicators
            .elements
            .transform_new_elements(&mut self.doc, theme, &added);
        let ctx = ApplyContext {
            theme,
            settings: &self.settings,
            assets: &self.assets,
            config: &self.config,
        };
        let styled = self
            .applicators
            .fonts
            .transform_new_nodes(&mut self.doc, &ctx, &added);
        let boosted = self
            .boost
            .extend(&mut self.doc, &added, self.config.interactive_z_index);
        if self.crash.scan(&self.doc) {
            debug!("Modal appeared with new content");
        }

        debug!(
            "Resync over {} added nodes: {} tagged, {} skipped, {} text styled, {} boosted",
            added.len(),
            summary.tagged,
            summary.skipped,
            styled,
            boosted
        );
    }

    /// Periodic safety net for elements the subscription never reported
    fn rescan_untagged(&mut self) {
        let candidates = sync::untagged_candidates(&self.doc, &self.rescan);
        if candidates.is_empty() {
            return;
        }
        let Some(theme) = self.theme.as_ref() else {
            return;
        };
        let summary = self
            .applicators
            .elements
            .transform_new_elements(&mut self.doc, theme, &candidates);
        self.boost
            .extend(&mut self.doc, &candidates, self.config.interactive_z_index);
        if summary.tagged > 0 {
            debug!("Rescan tagged {} missed elements", summary.tagged);
        }
    }
}

fn theme_id_of(theme: &Option<ThemeConfig>) -> &str {
    theme.as_ref().map(|t| t.id.as_str()).unwrap_or("none")
}
