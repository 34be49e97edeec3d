//! # Retro-Skin
//!
//! Re-skin any live web document with reversible retro themes (GeoCities, Windows 95, Vaporwave,
//! Terminal) that keep up with pages whose content changes after load.
//!
//! The engine talks to the page only through the [`dom::Document`] capability, so the same code
//! drives a browser binding or the in-memory [`dom::MemoryDocument`] the CLI and tests use.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use retro_skin::{
//!     assets::{DirectoryFetcher, ResourceLoader, StaticAssetResolver},
//!     dom::PageFixture,
//!     theme::BuiltinThemes,
//!     EngineConfig, RetroTransformer, Settings,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = EngineConfig::default();
//! let doc = PageFixture::from_file("page.toml")?.build()?;
//! let loader = ResourceLoader::new(
//!     Box::new(StaticAssetResolver::new("assets")),
//!     Box::new(DirectoryFetcher::new("assets")),
//!     config.assets.retry_delay(),
//! );
//!
//! let mut engine = RetroTransformer::new(doc, Box::new(BuiltinThemes::new()), loader, config)
//!     .with_settings(Settings::enabled_with_theme("vaporwave"));
//! engine.activate().await;
//! engine.deactivate();
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`dom`] - Host document capability, selectors, in-memory host
//! - [`regions`] - Classify headers, heroes, navigation, content and sidebars
//! - [`styles`] - The five reversible style applicators
//! - [`effects`] - Modal "crash" ghost trail
//! - [`probe`] - Compatibility checks before activation
//! - [`engine`] - The orchestrator and its synchronization machinery
//! - [`commands`] - JSON command surface and incompatibility log
//! - [`runtime`] - Single-task tokio host loop
//! - [`config`] / [`settings`] - Engine tuning and user preferences

pub mod assets;
pub mod audio;
pub mod commands;
pub mod config;
pub mod dom;
pub mod effects;
pub mod engine;
pub mod error;
pub mod probe;
pub mod regions;
pub mod runtime;
pub mod settings;
pub mod styles;
pub mod theme;

// Re-export commonly used types for convenience
pub use crate::{
    commands::{Command, CommandResponse, CommandRouter},
    config::EngineConfig,
    engine::{HostEvent, RetroTransformer},
    error::{EngineError, Result},
    probe::{CompatibilityProbe, IncompatibilityReport},
    settings::Settings,
    theme::{BuiltinThemes, ThemeCatalog},
};
