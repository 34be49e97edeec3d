use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::{ContrastPair, FontFamilies, ThemeConfig, VintageTheme};
use crate::error::{Result, ThemeError};

/// Source of theme definitions
pub trait ThemeCatalog: Send + Sync {
    fn get_theme(&self, id: &str) -> Option<ThemeConfig>;

    fn theme_ids(&self) -> Vec<String>;
}

/// Registry of the built-in themes, optionally extended with custom ones
///
/// Themes are registered by id and handed out as owned snapshots.
pub struct BuiltinThemes {
    themes: HashMap<String, ThemeConfig>,
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    themes: Vec<ThemeConfig>,
}

impl BuiltinThemes {
    /// Create a new catalog with all built-in themes
    pub fn new() -> Self {
        let mut catalog = Self {
            themes: HashMap::new(),
        };

        catalog.register_builtin_themes();
        catalog
    }

    /// Register all built-in themes
    fn register_builtin_themes(&mut self) {
        self.register(ThemeConfig {
            id: "geocities".to_string(),
            display_name: "GeoCities 1998".to_string(),
            background_ref: "procedural:stars".to_string(),
            font_families: FontFamilies {
                heading: "\"Comic Sans MS\", \"Comic Sans\", cursive".to_string(),
                body: "\"Times New Roman\", Times, serif".to_string(),
            },
            cursor_ref: "cursors/sparkle.cur".to_string(),
            neon_border_color: "#00ff00".to_string(),
            text_glow_color: "#ffff00".to_string(),
            vintage: VintageTheme {
                counter: true,
                sticker_refs: vec![
                    "gifs/under-construction.gif".to_string(),
                    "gifs/netscape-now.gif".to_string(),
                    "gifs/email-me.gif".to_string(),
                    "gifs/best-viewed.gif".to_string(),
                ],
                sounds_enabled: true,
            },
            text_colors: ContrastPair {
                on_dark: "#ffff66".to_string(),
                on_light: "#000080".to_string(),
            },
            banner_text: "*** Welcome to my homepage! Sign my guestbook! ***".to_string(),
            crash_on_modal: false,
        });

        self.register(ThemeConfig {
            id: "windows95".to_string(),
            display_name: "Windows 95".to_string(),
            background_ref: "procedural:teal".to_string(),
            font_families: FontFamilies {
                heading: "\"MS Sans Serif\", Tahoma, sans-serif".to_string(),
                body: "\"MS Sans Serif\", Tahoma, sans-serif".to_string(),
            },
            cursor_ref: "cursors/hourglass.cur".to_string(),
            neon_border_color: "#c0c0c0".to_string(),
            text_glow_color: "#000080".to_string(),
            vintage: VintageTheme {
                counter: false,
                sticker_refs: vec!["gifs/start-button.gif".to_string()],
                sounds_enabled: true,
            },
            text_colors: ContrastPair {
                on_dark: "#ffffff".to_string(),
                on_light: "#000000".to_string(),
            },
            banner_text: "It is now safe to turn off your computer.".to_string(),
            crash_on_modal: true,
        });

        self.register(ThemeConfig {
            id: "vaporwave".to_string(),
            display_name: "Vaporwave".to_string(),
            background_ref: "procedural:grid".to_string(),
            font_families: FontFamilies {
                heading: "\"Arial Black\", Impact, sans-serif".to_string(),
                body: "Verdana, Geneva, sans-serif".to_string(),
            },
            cursor_ref: "cursors/dolphin.cur".to_string(),
            neon_border_color: "#ff71ce".to_string(),
            text_glow_color: "#01cdfe".to_string(),
            vintage: VintageTheme {
                counter: false,
                sticker_refs: vec![
                    "gifs/palm.gif".to_string(),
                    "gifs/bust.gif".to_string(),
                ],
                sounds_enabled: false,
            },
            text_colors: ContrastPair {
                on_dark: "#fffb96".to_string(),
                on_light: "#b967ff".to_string(),
            },
            banner_text: "ＡＥＳＴＨＥＴＩＣ".to_string(),
            crash_on_modal: false,
        });

        self.register(ThemeConfig {
            id: "terminal".to_string(),
            display_name: "Green Screen Terminal".to_string(),
            background_ref: "procedural:scanlines".to_string(),
            font_families: FontFamilies {
                heading: "\"Courier New\", Courier, monospace".to_string(),
                body: "\"Courier New\", Courier, monospace".to_string(),
            },
            cursor_ref: "cursors/block.cur".to_string(),
            neon_border_color: "#33ff33".to_string(),
            text_glow_color: "#33ff33".to_string(),
            vintage: VintageTheme {
                counter: true,
                sticker_refs: vec![],
                sounds_enabled: false,
            },
            text_colors: ContrastPair {
                on_dark: "#33ff33".to_string(),
                on_light: "#003300".to_string(),
            },
            banner_text: "READY.".to_string(),
            crash_on_modal: false,
        });
    }

    /// Register a custom theme, replacing any theme with the same id
    pub fn register(&mut self, theme: ThemeConfig) {
        self.themes.insert(theme.id.clone(), theme);
    }

    /// Extend the catalog with themes from a TOML file (`[[themes]]` tables)
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let file: CatalogFile = toml::from_str(&content).map_err(|e| ThemeError::ParseFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let count = file.themes.len();
        for theme in file.themes {
            self.register(theme);
        }
        Ok(count)
    }

    /// Check if a theme is available
    pub fn has_theme(&self, id: &str) -> bool {
        self.themes.contains_key(id)
    }

    /// Get the number of registered themes
    pub fn len(&self) -> usize {
        self.themes.len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }
}

impl Default for BuiltinThemes {
    fn default() -> Self {
        Self::new()
    }
}

impl ThemeCatalog for BuiltinThemes {
    fn get_theme(&self, id: &str) -> Option<ThemeConfig> {
        self.themes.get(id).cloned()
    }

    fn theme_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.themes.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_builtin_themes_available() {
        let catalog = BuiltinThemes::new();

        assert!(catalog.has_theme("geocities"));
        assert!(catalog.has_theme("windows95"));
        assert!(catalog.has_theme("vaporwave"));
        assert!(catalog.has_theme("terminal"));

        assert_eq!(catalog.len(), 4);
    }

    #[test]
    fn test_get_theme() {
        let catalog = BuiltinThemes::new();

        let win = catalog.get_theme("windows95");
        assert!(win.is_some());
        assert!(win.unwrap().crash_on_modal);

        assert!(catalog.get_theme("unknown").is_none());
        assert_eq!(catalog.theme_ids()[0], "geocities");
    }

    #[test]
    fn test_custom_catalog_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("themes.toml");
        std::fs::write(
            &path,
            r##"
[[themes]]
id = "matrix"
displayName = "Matrix"
backgroundRef = "procedural:scanlines"
cursorRef = "cursors/block.cur"
neonBorderColor = "#00ff41"
textGlowColor = "#00ff41"

[themes.fontFamilies]
heading = "monospace"
body = "monospace"

[themes.vintage]
counter = false
"##,
        )
        .unwrap();

        let mut catalog = BuiltinThemes::new();
        assert_eq!(catalog.load_file(&path).unwrap(), 1);
        let matrix = catalog.get_theme("matrix").unwrap();
        assert_eq!(matrix.text_colors, ContrastPair::default());
        assert!(!matrix.crash_on_modal);
        assert_eq!(catalog.len(), 5);
    }
}
