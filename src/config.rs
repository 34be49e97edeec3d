use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Main configuration for the retro-skin engine
///
/// Holds tuning knobs only. What to apply comes from [`Settings`](crate::settings::Settings),
/// how it looks comes from a [`ThemeConfig`](crate::theme::ThemeConfig).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// z-index given to interactive elements so decorations never cover them
    pub interactive_z_index: i32,

    /// Seed for every random choice the engine makes; random when unset
    pub seed: Option<u64>,

    /// Synchronization with the host document
    pub sync: SyncConfig,

    /// Asset loading policy
    pub assets: AssetConfig,

    /// Cursor trail pool
    pub trail: TrailConfig,

    /// Ghost-trail gag on modal dialogs
    pub crash: CrashConfig,

    /// Typography transformer tuning
    pub fonts: FontConfig,

    /// Visitor counter cadence
    pub counter: CounterConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interactive_z_index: 10_000,
            seed: None,
            sync: SyncConfig::default(),
            assets: AssetConfig::default(),
            trail: TrailConfig::default(),
            crash: CrashConfig::default(),
            fonts: FontConfig::default(),
            counter: CounterConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: EngineConfig = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.sync.validate()?;
        self.trail.validate()?;
        self.crash.validate()?;
        self.fonts.validate()?;
        self.counter.validate()?;
        Ok(())
    }

    /// Seed used for a given purpose, derived from the base seed when one is configured
    pub fn seed_for(&self, salt: u64) -> u64 {
        match self.seed {
            Some(seed) => seed ^ salt.wrapping_mul(0x9E37_79B9_7F4A_7C15),
            None => rand::random(),
        }
    }
}

/// Host synchronization timings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Collapse bursts of mutations into one re-pass after this quiet window (ms)
    pub debounce_ms: u64,

    /// Safety-net sweep for untagged structural elements (ms)
    pub rescan_interval_ms: u64,

    /// Wait after a client-side navigation before reapplying (ms)
    pub navigation_settle_ms: u64,

    /// Minimum box (width, height) before a class/style change counts as layout-relevant
    pub sizable_min_width: f64,
    pub sizable_min_height: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            rescan_interval_ms: 1000,
            navigation_settle_ms: 500,
            sizable_min_width: 100.0,
            sizable_min_height: 50.0,
        }
    }
}

impl SyncConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn rescan_interval(&self) -> Duration {
        Duration::from_millis(self.rescan_interval_ms)
    }

    pub fn navigation_settle(&self) -> Duration {
        Duration::from_millis(self.navigation_settle_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.rescan_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "sync.rescan_interval_ms".to_string(),
                value: self.rescan_interval_ms.to_string()
            }.into());
        }

        if self.debounce_ms >= self.rescan_interval_ms {
            return Err(ConfigError::InvalidValue {
                key: "sync.debounce_ms".to_string(),
                value: format!("{} (must be shorter than the rescan interval)", self.debounce_ms)
            }.into());
        }

        Ok(())
    }
}

/// Asset loading policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Delay before the single retry of a failed load (ms)
    pub retry_delay_ms: u64,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self { retry_delay_ms: 500 }
    }
}

impl AssetConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Cursor trail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailConfig {
    /// Upper bound on particle nodes alive at once
    pub max_particles: usize,

    /// Fade-out time of a single particle (ms)
    pub lifetime_ms: u64,

    /// Particle diameter at spawn (px)
    pub size_px: f64,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            max_particles: 20,
            lifetime_ms: 600,
            size_px: 8.0,
        }
    }
}

impl TrailConfig {
    pub fn lifetime(&self) -> Duration {
        Duration::from_millis(self.lifetime_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.max_particles == 0 || self.lifetime_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "trail".to_string(),
                value: format!("max_particles={}, lifetime_ms={}", self.max_particles, self.lifetime_ms)
            }.into());
        }
        Ok(())
    }
}

/// Crash effect configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrashConfig {
    /// Minimum pointer travel before another clone spawns (px)
    pub min_distance: f64,

    /// Clones kept before the oldest is dropped
    pub max_clones: usize,

    /// Visibility watchdog period (ms)
    pub poll_interval_ms: u64,
}

impl Default for CrashConfig {
    fn default() -> Self {
        Self {
            min_distance: 15.0,
            max_clones: 50,
            poll_interval_ms: 500,
        }
    }
}

impl CrashConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.max_clones == 0 || self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "crash".to_string(),
                value: format!("max_clones={}, poll_interval_ms={}", self.max_clones, self.poll_interval_ms)
            }.into());
        }
        Ok(())
    }
}

/// Typography transformer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// Upper bound on simultaneously blinking text nodes
    pub max_blinking: usize,

    /// Width ratio over the parent beyond which an element gets wrapped
    pub overflow_ratio: f64,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            max_blinking: 3,
            overflow_ratio: 1.2,
        }
    }
}

impl FontConfig {
    fn validate(&self) -> Result<()> {
        if self.overflow_ratio < 1.0 {
            return Err(ConfigError::InvalidValue {
                key: "fonts.overflow_ratio".to_string(),
                value: self.overflow_ratio.to_string()
            }.into());
        }
        Ok(())
    }
}

/// Visitor counter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    pub min_interval_ms: u64,
    pub max_interval_ms: u64,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 5_000,
            max_interval_ms: 10_000,
        }
    }
}

impl CounterConfig {
    fn validate(&self) -> Result<()> {
        if self.min_interval_ms == 0 || self.min_interval_ms > self.max_interval_ms {
            return Err(ConfigError::InvalidValue {
                key: "counter.interval_range".to_string(),
                value: format!("{}-{}", self.min_interval_ms, self.max_interval_ms)
            }.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sync.debounce(), Duration::from_millis(100));
        assert_eq!(config.crash.max_clones, 50);
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("engine.toml");

        let mut original = EngineConfig::default();
        original.seed = Some(42);
        original.trail.max_particles = 12;

        original.save_to_file(&file_path).unwrap();
        let loaded = EngineConfig::from_file(&file_path).unwrap();

        assert_eq!(loaded.seed, Some(42));
        assert_eq!(loaded.trail.max_particles, 12);
        assert_eq!(loaded.sync.rescan_interval_ms, original.sync.rescan_interval_ms);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("partial.toml");
        std::fs::write(&file_path, "[sync]\ndebounce_ms = 250\n").unwrap();

        let loaded = EngineConfig::from_file(&file_path).unwrap();
        assert_eq!(loaded.sync.debounce_ms, 250);
        assert_eq!(loaded.sync.rescan_interval_ms, 1000);
        assert_eq!(loaded.counter.max_interval_ms, 10_000);
    }

    #[test]
    fn test_invalid_counter_range() {
        let mut config = EngineConfig::default();
        config.counter.min_interval_ms = 20_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debounce_must_be_shorter_than_rescan() {
        let mut config = EngineConfig::default();
        config.sync.debounce_ms = 5_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_seed_derivation_is_stable() {
        let mut config = EngineConfig::default();
        config.seed = Some(7);
        assert_eq!(config.seed_for(3), config.seed_for(3));
        assert_ne!(config.seed_for(3), config.seed_for(4));
    }
}
