use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SettingsError};
use crate::theme::ThemeId;

/// User preferences as delivered by the settings store
///
/// Treated as an immutable snapshot: the engine replaces it wholesale on update and never writes
/// it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub enabled: bool,
    pub current_theme: ThemeId,
    #[serde(default)]
    pub custom_settings: CustomSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: false,
            current_theme: "geocities".to_string(),
            custom_settings: CustomSettings::default(),
        }
    }
}

impl Settings {
    pub fn enabled_with_theme(theme: &str) -> Self {
        Self {
            enabled: true,
            current_theme: theme.to_string(),
            custom_settings: CustomSettings::default(),
        }
    }
}

/// Four independently toggleable feature groups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomSettings {
    pub background: BackgroundSettings,
    pub fonts: FontSettings,
    pub cursor: CursorSettings,
    pub vintage_elements: VintageSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackgroundSettings {
    pub enabled: bool,
    /// Neon glow border around major structural sections
    pub glow_borders: bool,
    /// Contrast overlay over the new background
    pub overlay: bool,
}

impl Default for BackgroundSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            glow_borders: true,
            overlay: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FontSettings {
    pub enabled: bool,
    pub heading_glow: bool,
    /// Number of scrolling banners; zero disables them
    pub banners: usize,
    pub blink: bool,
}

impl Default for FontSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            heading_glow: true,
            banners: 1,
            blink: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CursorSettings {
    pub enabled: bool,
    pub trail: bool,
}

impl Default for CursorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            trail: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VintageSettings {
    pub enabled: bool,
    pub counter: bool,
    pub stickers: bool,
    pub sounds: bool,
    /// Counter start value; random when unset
    pub counter_start: Option<u64>,
}

impl Default for VintageSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            counter: true,
            stickers: true,
            sounds: false,
            counter_start: None,
        }
    }
}

/// Persistence of [`Settings`], scoped however the host environment prefers
pub trait SettingsStore: Send {
    fn load(&self) -> Result<Settings>;

    fn save(&mut self, settings: &Settings) -> Result<()>;
}

/// In-memory store with a global default and optional per-session overrides
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    global: Settings,
    sessions: HashMap<String, Settings>,
    active_session: Option<String>,
}

impl MemorySettingsStore {
    pub fn new(global: Settings) -> Self {
        Self {
            global,
            sessions: HashMap::new(),
            active_session: None,
        }
    }

    /// Route subsequent loads/saves to a session-scoped override
    pub fn use_session(&mut self, session: Option<&str>) {
        self.active_session = session.map(str::to_string);
    }

    pub fn global(&self) -> &Settings {
        &self.global
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<Settings> {
        let scoped = self
            .active_session
            .as_ref()
            .and_then(|session| self.sessions.get(session));
        Ok(scoped.unwrap_or(&self.global).clone())
    }

    fn save(&mut self, settings: &Settings) -> Result<()> {
        match &self.active_session {
            Some(session) => {
                self.sessions.insert(session.clone(), settings.clone());
            }
            None => self.global = settings.clone(),
        }
        Ok(())
    }
}

/// TOML-file-backed store; a missing file yields defaults
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            debug!("No settings file at {:?}; using defaults", self.path);
            return Ok(Settings::default());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| SettingsError::ReadFailed {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;
        let settings = toml::from_str(&content).map_err(|e| SettingsError::Malformed {
            reason: e.to_string(),
        })?;
        Ok(settings)
    }

    fn save(&mut self, settings: &Settings) -> Result<()> {
        let content = toml::to_string_pretty(settings).map_err(|e| SettingsError::Malformed {
            reason: e.to_string(),
        })?;
        std::fs::write(&self.path, content).map_err(|e| SettingsError::WriteFailed {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}
