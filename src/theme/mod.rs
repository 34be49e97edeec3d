//! # Themes
//!
//! A [`ThemeConfig`] is an immutable description of one retro look: which assets to use, which
//! fonts, which accent colors, and which optional gags. The engine never authors themes; it looks
//! them up through a [`ThemeCatalog`].
//!
//! ## Built-in Themes
//!
//! - **geocities**: starfield tiles, Comic Sans, visitor counter and stickers
//! - **windows95**: teal desktop, system fonts, the ghost-trail gag on dialogs
//! - **vaporwave**: pink/cyan gradient grid, glowing headings
//! - **terminal**: phosphor green on black, monospace everything

pub mod catalog;

pub use catalog::{BuiltinThemes, ThemeCatalog};

use serde::{Deserialize, Serialize};

pub type ThemeId = String;

/// Complete visual description of a theme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeConfig {
    pub id: ThemeId,
    pub display_name: String,

    /// Asset id of the page background (image-like or procedural)
    pub background_ref: String,
    pub font_families: FontFamilies,

    /// Asset id of the pointer image
    pub cursor_ref: String,
    pub neon_border_color: String,
    pub text_glow_color: String,
    pub vintage: VintageTheme,

    /// Text colors chosen by background luminance
    #[serde(default)]
    pub text_colors: ContrastPair,

    /// Message scrolled across the page banner
    #[serde(default = "default_banner_text")]
    pub banner_text: String,

    /// Whether modal dialogs trigger the ghost-trail gag
    #[serde(default)]
    pub crash_on_modal: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontFamilies {
    pub heading: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VintageTheme {
    pub counter: bool,
    #[serde(default)]
    pub sticker_refs: Vec<String>,
    #[serde(default)]
    pub sounds_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContrastPair {
    /// Used on dark backgrounds
    pub on_dark: String,
    /// Used on light backgrounds
    pub on_light: String,
}

impl Default for ContrastPair {
    fn default() -> Self {
        Self {
            on_dark: "#f5f5f5".to_string(),
            on_light: "#1a1a1a".to_string(),
        }
    }
}

fn default_banner_text() -> String {
    "*** Welcome to my homepage! ***".to_string()
}

impl ThemeConfig {
    /// Root class naming this theme
    pub fn root_class(&self) -> String {
        format!("{}{}", crate::dom::tags::THEME_CLASS_PREFIX, self.id)
    }

    /// Every asset id the theme refers to
    pub fn asset_refs(&self) -> Vec<&str> {
        let mut refs = vec![self.background_ref.as_str(), self.cursor_ref.as_str()];
        refs.extend(self.vintage.sticker_refs.iter().map(String::as_str));
        refs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_json_shape() {
        let theme = BuiltinThemes::new().get_theme("geocities").unwrap();
        let json = serde_json::to_value(&theme).unwrap();
        assert!(json.get("displayName").is_some());
        assert!(json.get("fontFamilies").is_some());
        assert!(json["vintage"].get("stickerRefs").is_some());

        let back: ThemeConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, theme);
    }

    #[test]
    fn test_asset_refs_cover_everything() {
        let theme = BuiltinThemes::new().get_theme("geocities").unwrap();
        let refs = theme.asset_refs();
        assert!(refs.contains(&theme.background_ref.as_str()));
        assert!(refs.contains(&theme.cursor_ref.as_str()));
        assert_eq!(refs.len(), 2 + theme.vintage.sticker_refs.len());
    }
}
