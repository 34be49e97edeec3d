//! Attribute and class names the engine writes into host documents.
//!
//! Every engine mutation is keyed off one of these so that teardown can find it again with a
//! document-wide sweep.

/// Shared prefix of every engine attribute
pub const PREFIX: &str = "data-retro-";

/// Marks a node the engine created; value names its role
pub const OWNED: &str = "data-retro-owned";

pub const REGION: &str = "data-retro-region";
pub const REGION_INDEX: &str = "data-retro-region-index";

/// Element classification written by the element transformer
pub const ELEMENT: &str = "data-retro-element";

/// Theme id on the document root
pub const THEME: &str = "data-retro-theme";

pub const GLOW: &str = "data-retro-glow";
pub const FONT: &str = "data-retro-font";
pub const HEADING_GLOW: &str = "data-retro-heading-glow";
pub const BLINK: &str = "data-retro-blink";
pub const WRAP_FIXED: &str = "data-retro-wrap";
pub const BOOSTED: &str = "data-retro-boosted";

pub const ACTIVE_CLASS: &str = "retro-active";
pub const THEME_CLASS_PREFIX: &str = "retro-theme-";

/// Whether an attribute name belongs to the engine
pub fn is_engine_attribute(name: &str) -> bool {
    name.starts_with(PREFIX)
}
