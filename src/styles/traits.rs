use crate::assets::{LoadOutcome, ResourceLoader, UNIVERSAL_FALLBACK};
use crate::config::EngineConfig;
use crate::dom::Document;
use crate::error::Result;
use crate::settings::Settings;
use crate::theme::ThemeConfig;

/// Core trait that every style applicator implements
///
/// Applicators own one visual concern each. They must be symmetric: `apply` replaces whatever an
/// earlier `apply` did rather than stacking on top of it, and `undo` puts every node it touched
/// back the way it found it.
pub trait Applicator: Send {
    /// Returns the unique name of this applicator
    fn name(&self) -> &str;

    /// Returns a human-readable description of this applicator
    fn description(&self) -> &str;

    /// Whether the user's settings switch this applicator on
    fn enabled_in(&self, settings: &Settings) -> bool;

    /// Apply the effect to the document
    ///
    /// # Arguments
    ///
    /// * `doc` - The host document
    /// * `ctx` - Theme, settings and prefetched assets for this pass
    fn apply(&mut self, doc: &mut dyn Document, ctx: &ApplyContext<'_>) -> Result<()>;

    /// Reverse everything `apply` did; a no-op when nothing was applied
    fn undo(&mut self, doc: &mut dyn Document) -> Result<()>;

    fn is_applied(&self) -> bool;
}

/// Everything an applicator may read during one pass
#[derive(Debug, Clone, Copy)]
pub struct ApplyContext<'a> {
    pub theme: &'a ThemeConfig,
    pub settings: &'a Settings,
    pub assets: &'a ThemeAssets,
    pub config: &'a EngineConfig,
}

/// Theme assets resolved ahead of an apply pass
///
/// Loading is asynchronous (it may wait out a retry), applying is not, so the orchestrator
/// resolves every reference a theme makes before any applicator runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeAssets {
    pub background: LoadOutcome,
    pub cursor: LoadOutcome,
    /// Stickers that actually loaded; fallbacks are left out
    pub stickers: Vec<String>,
}

impl ThemeAssets {
    pub async fn load(loader: &mut ResourceLoader, theme: &ThemeConfig) -> Self {
        let background = loader.load_outcome(&theme.background_ref, None).await;
        let cursor = loader.load_outcome(&theme.cursor_ref, None).await;

        let mut stickers = Vec::new();
        for sticker in &theme.vintage.sticker_refs {
            if let LoadOutcome::Loaded(url) = loader.load_outcome(sticker, None).await {
                stickers.push(url);
            }
        }

        Self {
            background,
            cursor,
            stickers,
        }
    }

    /// Assets that are nothing but placeholders
    pub fn placeholder() -> Self {
        Self {
            background: LoadOutcome::Fallback(UNIVERSAL_FALLBACK.to_string()),
            cursor: LoadOutcome::Fallback(UNIVERSAL_FALLBACK.to_string()),
            stickers: Vec::new(),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::theme::{BuiltinThemes, ThemeCatalog};

    /// Owned inputs for building an [`ApplyContext`] in tests
    pub struct Fixture {
        pub theme: ThemeConfig,
        pub settings: Settings,
        pub assets: ThemeAssets,
        pub config: EngineConfig,
    }

    impl Fixture {
        pub fn new(theme: &str) -> Self {
            let theme = BuiltinThemes::new().get_theme(theme).unwrap();
            let config = EngineConfig {
                seed: Some(42),
                ..EngineConfig::default()
            };
            Self {
                settings: Settings::enabled_with_theme(&theme.id),
                assets: ThemeAssets {
                    background: LoadOutcome::Loaded("data:image/png;base64,AAAA".to_string()),
                    cursor: LoadOutcome::Loaded("assets/cursors/sparkle.cur".to_string()),
                    stickers: vec![
                        "assets/gifs/a.gif".to_string(),
                        "assets/gifs/b.gif".to_string(),
                        "assets/gifs/c.gif".to_string(),
                    ],
                },
                theme,
                config,
            }
        }

        pub fn ctx(&self) -> ApplyContext<'_> {
            ApplyContext {
                theme: &self.theme,
                settings: &self.settings,
                assets: &self.assets,
                config: &self.config,
            }
        }
    }
}
