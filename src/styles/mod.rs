//! # Retro Style Applicators
//!
//! Each applicator owns one visual concern and knows how to take it back. The orchestrator runs
//! them in a fixed order after regions are marked and undoes them in exactly the reverse order.
//!
//! ## Built-in Applicators
//!
//! - **Elements**: tags containers, controls, links and images; injects the theme stylesheet
//! - **Background**: tiled or procedural page background, neon borders, contrast overlay
//! - **Fonts**: font cascade, heading glow, scrolling banners, blinking text
//! - **Cursor**: themed pointer, control affordance, particle trail
//! - **Vintage**: visitor counter, stickers, sound effects
//!
//! ## Usage
//!
//! ```rust
//! use retro_skin::dom::MemoryDocument;
//! use retro_skin::styles::{Applicator, ApplyContext, BackgroundStyler, ThemeAssets};
//! use retro_skin::theme::{BuiltinThemes, ThemeCatalog};
//! use retro_skin::{EngineConfig, Settings};
//!
//! let theme = BuiltinThemes::new().get_theme("geocities").unwrap();
//! let settings = Settings::enabled_with_theme("geocities");
//! let assets = ThemeAssets::placeholder();
//! let config = EngineConfig::default();
//! let ctx = ApplyContext { theme: &theme, settings: &settings, assets: &assets, config: &config };
//!
//! let mut doc = MemoryDocument::new();
//! let mut background = BackgroundStyler::new();
//! background.apply(&mut doc, &ctx).unwrap();
//! background.undo(&mut doc).unwrap();
//! ```

pub mod color;
pub mod record;
pub mod traits;

// Applicator implementations
pub mod background;
pub mod cursor;
pub mod elements;
pub mod fonts;
pub mod vintage;

// Re-exports for convenience
pub use record::StyleLedger;
pub use traits::{Applicator, ApplyContext, ThemeAssets};

pub use background::BackgroundStyler;
pub use cursor::CursorCustomizer;
pub use elements::{ElementKind, ElementTransformer, TransformSummary};
pub use fonts::FontTransformer;
pub use vintage::{StickerSlot, VintageElements};
