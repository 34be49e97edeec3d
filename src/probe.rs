use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dom::{Document, DocumentExt, Selector};

pub const MAX_SHADOW_ROOTS: usize = 10;
pub const MAX_FRAMES: usize = 5;
pub const MAX_NODES: usize = 10_000;
pub const MAX_CANVASES: usize = 3;
/// Fraction of both viewport dimensions a video must cover to count as full-screen
pub const VIDEO_COVERAGE: f64 = 0.8;

/// Script globals left behind by client-side routing frameworks
const SPA_GLOBALS: &[&str] = &[
    "__NEXT_DATA__",
    "__NUXT__",
    "__REACT_DEVTOOLS_GLOBAL_HOOK__",
    "React",
    "angular",
    "ng",
    "Vue",
    "__VUE__",
    "__SVELTE__",
    "Ember",
];

/// Attributes frameworks stamp on their mount points
const SPA_MOUNT_SELECTORS: &str = "[data-reactroot], [ng-version], [data-v-app], [data-server-rendered]";

/// Findings of one compatibility pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncompatibilityReport {
    pub has_issues: bool,
    /// Activation must not proceed
    pub critical: bool,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

impl IncompatibilityReport {
    fn issue(&mut self, message: impl Into<String>, critical: bool) {
        self.issues.push(message.into());
        self.critical |= critical;
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    fn finish(mut self) -> Self {
        self.has_issues = !self.issues.is_empty() || !self.warnings.is_empty();
        self
    }
}

/// Read-only inspection of the host for traits that degrade the engine.
///
/// Every finding except a missing document root is advisory.
pub struct CompatibilityProbe {
    frames: Selector,
    canvases: Selector,
    videos: Selector,
    spa_mounts: Selector,
}

impl CompatibilityProbe {
    pub fn new() -> Self {
        Self {
            frames: Selector::parse("iframe, frame"),
            canvases: Selector::parse("canvas"),
            videos: Selector::parse("video"),
            spa_mounts: Selector::parse(SPA_MOUNT_SELECTORS),
        }
    }

    pub fn check(&self, doc: &dyn Document) -> IncompatibilityReport {
        let mut report = IncompatibilityReport::default();

        let Some(root) = doc.root() else {
            report.issue("Document has no root element", true);
            info!("Compatibility probe: critical, no document root");
            return report.finish();
        };

        let shadow_roots = doc.shadow_root_count();
        if shadow_roots > MAX_SHADOW_ROOTS {
            report.warn(format!(
                "Page uses {} shadow roots; content inside them will not be themed",
                shadow_roots
            ));
        }

        let frames = doc.query_all(&self.frames).len();
        if frames > MAX_FRAMES {
            report.warn(format!(
                "Page embeds {} frames; framed content keeps its own look",
                frames
            ));
        }

        let nodes = 1 + doc.descendants(root).len();
        if nodes > MAX_NODES {
            report.warn(format!(
                "Page has {} nodes; theming and synchronization may be slow",
                nodes
            ));
        }

        if let Some(policy) = doc.content_security_policy() {
            if is_strict_policy(&policy) {
                report.warn("Strict content security policy may block injected styles and assets");
            }
        }

        let canvases = doc.query_all(&self.canvases).len();
        if canvases > MAX_CANVASES {
            report.warn(format!(
                "Page draws on {} canvases; canvas content cannot be restyled",
                canvases
            ));
        }

        if self.has_fullscreen_video(doc) {
            report.warn("A video covers most of the viewport; decorations may be hidden behind it");
        }

        if let Some(marker) = self.spa_marker(doc) {
            report.warn(format!(
                "Single-page application detected ({}); navigation tracking is active",
                marker
            ));
        }

        if let Some(cursor) = doc.computed_style(root, "cursor") {
            if cursor != "auto" && cursor != "default" {
                report.warn(format!("Page already forces a custom cursor ({})", cursor));
            }
        }

        let report = report.finish();
        debug!(
            "Compatibility probe: {} issues, {} warnings",
            report.issues.len(),
            report.warnings.len()
        );
        report
    }

    fn has_fullscreen_video(&self, doc: &dyn Document) -> bool {
        let viewport = doc.viewport();
        doc.query_all(&self.videos).into_iter().any(|video| {
            doc.bounding_rect(video).is_some_and(|rect| {
                rect.width > viewport.width * VIDEO_COVERAGE
                    && rect.height > viewport.height * VIDEO_COVERAGE
            })
        })
    }

    fn spa_marker(&self, doc: &dyn Document) -> Option<String> {
        if let Some(global) = SPA_GLOBALS.iter().find(|name| doc.has_global(name)) {
            return Some(global.to_string());
        }
        doc.query_all(&self.spa_mounts)
            .first()
            .and_then(|&node| doc.tag_name(node))
            .map(|tag| format!("framework mount point <{}>", tag))
    }
}

impl Default for CompatibilityProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// A policy is strict when it governs styles without allowing inline ones, or demands trusted types
pub fn is_strict_policy(policy: &str) -> bool {
    let directives: Vec<(&str, &str)> = policy
        .split(';')
        .filter_map(|d| {
            let d = d.trim();
            if d.is_empty() {
                return None;
            }
            Some(d.split_once(char::is_whitespace).unwrap_or((d, "")))
        })
        .collect();

    if directives
        .iter()
        .any(|(name, _)| name.eq_ignore_ascii_case("require-trusted-types-for"))
    {
        return true;
    }

    let style_sources = directives
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("style-src"))
        .or_else(|| {
            directives
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case("default-src"))
        });
    match style_sources {
        Some((_, sources)) => !sources.contains("'unsafe-inline'"),
        None => false,
    }
}
