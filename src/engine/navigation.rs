use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dom::Document;

/// Host-side hints that the visible page may have changed without a reload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NavigationSignal {
    PushState,
    ReplaceState,
    PopState,
    TitleChanged,
}

/// Remembers the last address the engine applied against.
///
/// Signals and title drift only prompt a comparison; a change of address is what counts.
#[derive(Debug, Clone, Default)]
pub struct NavigationWatch {
    location: String,
    title: String,
}

impl NavigationWatch {
    pub fn new(doc: &dyn Document) -> Self {
        Self {
            location: doc.location(),
            title: doc.title(),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Accept the current address as applied
    pub fn reset(&mut self, doc: &dyn Document) {
        self.location = doc.location();
        self.title = doc.title();
    }

    /// Whether the address moved since the last check; the new address becomes the baseline
    pub fn observe(&mut self, doc: &dyn Document, signal: Option<NavigationSignal>) -> bool {
        let title = doc.title();
        if title != self.title {
            debug!("Title drifted from {:?} to {:?}", self.title, title);
            self.title = title;
        }
        let location = doc.location();
        if location == self.location {
            return false;
        }
        debug!(
            "Navigation {:?}: {} -> {}",
            signal, self.location, location
        );
        self.location = location;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDocument;

    #[test]
    fn test_only_address_changes_count() {
        let mut doc = MemoryDocument::new();
        doc.set_location("https://example.com/");
        let mut watch = NavigationWatch::new(&doc);

        doc.set_title("Other").unwrap();
        assert!(!watch.observe(&doc, Some(NavigationSignal::TitleChanged)));

        doc.push_state("https://example.com/inbox");
        assert!(watch.observe(&doc, Some(NavigationSignal::PushState)));
        assert!(!watch.observe(&doc, None));
        assert_eq!(watch.location(), "https://example.com/inbox");
    }

    #[test]
    fn test_signal_json_names() {
        let json = serde_json::to_string(&NavigationSignal::PopState).unwrap();
        assert_eq!(json, "\"popState\"");
    }
}
