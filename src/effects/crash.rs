use std::collections::VecDeque;

use tracing::{debug, info};

use crate::config::CrashConfig;
use crate::dom::{tags, Document, DocumentExt, NodeId, Selector};
use crate::error::{DomError, DomResult};

/// What counts as a modal dialog
pub const MODAL_SELECTORS: &str =
    "dialog[open], [role=dialog], [role=alertdialog], [aria-modal=true], .modal, [class*=modal]";

const CLONE_ROLE: &str = "crash-clone";

#[derive(Debug, Clone, PartialEq)]
enum CrashState {
    Idle,
    Tracking {
        modal: NodeId,
        last_spawn: Option<(f64, f64)>,
        clones: VecDeque<NodeId>,
    },
}

/// Why a tracking session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrashExit {
    DoubleClick,
    ModalRemoved,
    ModalHidden,
    Disabled,
}

/// The "frozen window" gag: a modal leaves copies of itself wherever the pointer drags it.
///
/// Idle until a visible modal shows up while the theme asks for the effect; then every pointer
/// move far enough from the previous copy stamps a new inert clone, up to a fixed trail length.
/// A double-click, or the modal going away, clears every clone and returns to idle.
pub struct CrashEffect {
    config: CrashConfig,
    modals: Selector,
    enabled: bool,
    state: CrashState,
}

impl CrashEffect {
    pub fn new(config: CrashConfig) -> Self {
        Self {
            config,
            modals: Selector::parse(MODAL_SELECTORS),
            enabled: false,
            state: CrashState::Idle,
        }
    }

    pub fn set_config(&mut self, config: CrashConfig) {
        self.config = config;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self.state, CrashState::Tracking { .. })
    }

    pub fn modal(&self) -> Option<NodeId> {
        match &self.state {
            CrashState::Tracking { modal, .. } => Some(*modal),
            CrashState::Idle => None,
        }
    }

    pub fn clone_count(&self) -> usize {
        match &self.state {
            CrashState::Tracking { clones, .. } => clones.len(),
            CrashState::Idle => 0,
        }
    }

    /// Turn the effect on or off; turning it off ends any session
    pub fn set_enabled(&mut self, doc: &mut dyn Document, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.stop(doc, CrashExit::Disabled);
        }
    }

    /// First visible host modal, if any
    pub fn find_modal(&self, doc: &dyn Document) -> Option<NodeId> {
        doc.query_all(&self.modals)
            .into_iter()
            .find(|&n| !doc.is_engine_owned(n) && !doc.is_hidden(n))
    }

    /// Start tracking when a modal is present; returns whether a session started
    pub fn scan(&mut self, doc: &dyn Document) -> bool {
        if !self.enabled || self.is_tracking() {
            return false;
        }
        let Some(modal) = self.find_modal(doc) else {
            return false;
        };
        info!("Modal {:?} detected; ghost trail armed", modal);
        self.state = CrashState::Tracking {
            modal,
            last_spawn: None,
            clones: VecDeque::new(),
        };
        true
    }

    /// Stamp a clone at the pointer when it moved far enough since the last one
    pub fn on_pointer_move(&mut self, doc: &mut dyn Document, x: f64, y: f64) -> DomResult<bool> {
        let min_distance = self.config.min_distance;
        let max_clones = self.config.max_clones;
        let CrashState::Tracking {
            modal,
            last_spawn,
            clones,
        } = &mut self.state
        else {
            return Ok(false);
        };

        if let Some((lx, ly)) = *last_spawn {
            if (x - lx).hypot(y - ly) < min_distance {
                return Ok(false);
            }
        }

        let ghost = spawn_clone(doc, *modal, x, y)?;
        *last_spawn = Some((x, y));
        clones.push_back(ghost);
        while clones.len() > max_clones {
            if let Some(oldest) = clones.pop_front() {
                remove_clone(doc, oldest);
            }
        }
        Ok(true)
    }

    pub fn on_double_click(&mut self, doc: &mut dyn Document) {
        self.stop(doc, CrashExit::DoubleClick);
    }

    /// Visibility watchdog; ends the session when the modal is gone or hidden
    pub fn check(&mut self, doc: &mut dyn Document) -> Option<CrashExit> {
        let modal = self.modal()?;
        let exit = if !doc.is_connected(modal) {
            CrashExit::ModalRemoved
        } else if doc.is_hidden(modal) {
            CrashExit::ModalHidden
        } else {
            return None;
        };
        self.stop(doc, exit);
        Some(exit)
    }

    /// Remove every clone and go idle
    pub fn stop(&mut self, doc: &mut dyn Document, reason: CrashExit) {
        let state = std::mem::replace(&mut self.state, CrashState::Idle);
        if let CrashState::Tracking { clones, .. } = state {
            debug!("Ghost trail ended ({:?}); removing {} clones", reason, clones.len());
            for ghost in clones {
                remove_clone(doc, ghost);
            }
        }
    }
}

fn spawn_clone(doc: &mut dyn Document, modal: NodeId, x: f64, y: f64) -> DomResult<NodeId> {
    if !doc.is_connected(modal) {
        return Err(modal.gone());
    }
    let ghost = doc.clone_node(modal, true)?;
    for node in std::iter::once(ghost).chain(doc.descendants(ghost)) {
        doc.remove_attribute(node, "id")?;
    }
    doc.set_attribute(ghost, tags::OWNED, CLONE_ROLE)?;
    doc.set_attribute(ghost, "aria-hidden", "true")?;
    doc.set_attribute(ghost, "inert", "")?;
    let (left, top) = (format!("{}px", x), format!("{}px", y));
    for (property, value) in [
        ("position", "fixed"),
        ("left", left.as_str()),
        ("top", top.as_str()),
        ("margin", "0"),
        ("pointer-events", "none"),
        ("z-index", "9800"),
    ] {
        doc.set_style_property(ghost, property, value)?;
    }
    let parent = doc.body().or_else(|| doc.root()).ok_or(DomError::MissingRoot)?;
    doc.append_child(parent, ghost)?;
    Ok(ghost)
}

fn remove_clone(doc: &mut dyn Document, ghost: NodeId) {
    if doc.parent(ghost).is_some() {
        if let Err(e) = doc.remove_node(ghost) {
            debug!("Clone {:?} already gone: {}", ghost, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDocument;

    fn page_with_modal() -> (MemoryDocument, NodeId) {
        let mut doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let dialog = doc.append_element(body, "dialog").unwrap();
        doc.set_attribute(dialog, "open", "").unwrap();
        doc.set_attribute(dialog, "id", "confirm").unwrap();
        let ok = doc.append_element(dialog, "button").unwrap();
        doc.set_attribute(ok, "id", "confirm-ok").unwrap();
        (doc, dialog)
    }

    fn armed(doc: &mut MemoryDocument) -> CrashEffect {
        let mut crash = CrashEffect::new(CrashConfig::default());
        crash.set_enabled(doc, true);
        assert!(crash.scan(&*doc));
        crash
    }

    #[test]
    fn test_idle_without_modal_or_theme_request() {
        let (mut doc, _) = page_with_modal();
        let mut crash = CrashEffect::new(CrashConfig::default());
        assert!(!crash.scan(&doc));

        let mut plain = MemoryDocument::new();
        crash.set_enabled(&mut plain, true);
        assert!(!crash.scan(&plain));
        assert!(!crash.on_pointer_move(&mut doc, 0.0, 0.0).unwrap());
    }

    #[test]
    fn test_closed_dialog_is_not_a_modal() {
        let (mut doc, dialog) = page_with_modal();
        doc.remove_attribute(dialog, "open").unwrap();
        let mut crash = CrashEffect::new(CrashConfig::default());
        crash.set_enabled(&mut doc, true);
        assert!(!crash.scan(&doc));
    }

    #[test]
    fn test_clones_respect_min_distance() {
        let (mut doc, _) = page_with_modal();
        let mut crash = armed(&mut doc);

        assert!(crash.on_pointer_move(&mut doc, 100.0, 100.0).unwrap());
        assert!(!crash.on_pointer_move(&mut doc, 105.0, 105.0).unwrap());
        assert!(crash.on_pointer_move(&mut doc, 120.0, 100.0).unwrap());
        assert_eq!(crash.clone_count(), 2);

        // Clones carry no ids and are engine-owned
        for ghost in doc.nodes_with_attribute(tags::OWNED) {
            assert_eq!(doc.attribute(ghost, "id"), None);
            for inner in doc.descendants(ghost) {
                assert_eq!(doc.attribute(inner, "id"), None);
            }
        }
    }

    #[test]
    fn test_trail_is_capped() {
        let (mut doc, _) = page_with_modal();
        let mut crash = armed(&mut doc);
        for i in 0..80 {
            crash.on_pointer_move(&mut doc, i as f64 * 20.0, 0.0).unwrap();
        }
        assert_eq!(crash.clone_count(), 50);
        assert_eq!(doc.nodes_with_attribute(tags::OWNED).len(), 50);
    }

    #[test]
    fn test_double_click_clears() {
        let (mut doc, _) = page_with_modal();
        let mut crash = armed(&mut doc);
        crash.on_pointer_move(&mut doc, 0.0, 0.0).unwrap();
        crash.on_pointer_move(&mut doc, 50.0, 0.0).unwrap();

        crash.on_double_click(&mut doc);
        assert!(!crash.is_tracking());
        assert!(doc.nodes_with_attribute(tags::OWNED).is_empty());
        assert!(!crash.on_pointer_move(&mut doc, 500.0, 0.0).unwrap());
    }

    #[test]
    fn test_watchdog_detects_hidden_and_removed_modal() {
        let (mut doc, dialog) = page_with_modal();
        let mut crash = armed(&mut doc);
        crash.on_pointer_move(&mut doc, 0.0, 0.0).unwrap();
        assert_eq!(crash.check(&mut doc), None);

        doc.set_attribute(dialog, "style", "display: none;").unwrap();
        assert_eq!(crash.check(&mut doc), Some(CrashExit::ModalHidden));
        assert!(doc.nodes_with_attribute(tags::OWNED).is_empty());

        doc.remove_attribute(dialog, "style").unwrap();
        assert!(crash.scan(&doc));
        doc.remove_node(dialog).unwrap();
        assert_eq!(crash.check(&mut doc), Some(CrashExit::ModalRemoved));
    }
}
