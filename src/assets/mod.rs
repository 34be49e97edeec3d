//! # Asset Resolution and Loading
//!
//! Themes refer to assets by opaque id. An [`AssetResolver`] turns an id into either a URL that
//! must be fetched and validated, or a [`PatternDescriptor`] rendered locally with no network
//! access at all. The [`ResourceLoader`] sits on top and guarantees callers always get something
//! renderable back.

pub mod loader;
pub mod procedural;

pub use loader::{LoadOutcome, ResourceLoader, UNIVERSAL_FALLBACK};
pub use procedural::{PatternDescriptor, PatternKind};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::AssetError;

/// What an asset id refers to
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedAsset {
    /// Image-like asset that must be fetched and decoded
    Url(String),
    /// Declarative pattern rendered locally
    Procedural(PatternDescriptor),
}

/// Maps asset ids to loadable descriptions. Must be pure.
pub trait AssetResolver: Send + Sync {
    fn resolve(&self, asset_id: &str) -> ResolvedAsset;
}

/// Fetches raw bytes for a URL
pub trait AssetFetcher: Send {
    fn fetch(&mut self, url: &str) -> Result<Vec<u8>, AssetError>;
}

/// Resolver for `procedural:<name>` ids plus URLs relative to a base
#[derive(Debug, Clone)]
pub struct StaticAssetResolver {
    base_url: String,
    patterns: HashMap<String, PatternDescriptor>,
}

impl StaticAssetResolver {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            patterns: PatternDescriptor::builtin(),
        }
    }

    pub fn with_pattern(mut self, name: &str, pattern: PatternDescriptor) -> Self {
        self.patterns.insert(name.to_string(), pattern);
        self
    }
}

impl Default for StaticAssetResolver {
    fn default() -> Self {
        Self::new("assets")
    }
}

impl AssetResolver for StaticAssetResolver {
    fn resolve(&self, asset_id: &str) -> ResolvedAsset {
        if let Some(name) = asset_id.strip_prefix("procedural:") {
            let pattern = self
                .patterns
                .get(name)
                .cloned()
                .unwrap_or_else(PatternDescriptor::plain);
            return ResolvedAsset::Procedural(pattern);
        }
        let is_absolute = asset_id.starts_with("data:")
            || asset_id.starts_with("http://")
            || asset_id.starts_with("https://")
            || asset_id.starts_with('/');
        if is_absolute {
            ResolvedAsset::Url(asset_id.to_string())
        } else {
            ResolvedAsset::Url(format!("{}/{}", self.base_url, asset_id))
        }
    }
}

/// Reads assets from a local directory; URLs are treated as paths relative to it
#[derive(Debug, Clone)]
pub struct DirectoryFetcher {
    root: PathBuf,
}

impl DirectoryFetcher {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl AssetFetcher for DirectoryFetcher {
    fn fetch(&mut self, url: &str) -> Result<Vec<u8>, AssetError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Err(AssetError::Blocked {
                url: url.to_string(),
            });
        }
        let path = self.root.join(url.trim_start_matches('/'));
        std::fs::read(&path).map_err(|_| AssetError::NotFound {
            url: url.to_string(),
        })
    }
}

/// Fetcher serving a fixed map of URLs; everything else is not found
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    files: HashMap<String, Vec<u8>>,
    requests: Vec<String>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: &str, bytes: Vec<u8>) {
        self.files.insert(url.to_string(), bytes);
    }

    /// Every URL requested so far, in order
    pub fn requests(&self) -> &[String] {
        &self.requests
    }
}

impl AssetFetcher for MemoryFetcher {
    fn fetch(&mut self, url: &str) -> Result<Vec<u8>, AssetError> {
        self.requests.push(url.to_string());
        self.files
            .get(url)
            .cloned()
            .ok_or_else(|| AssetError::NotFound {
                url: url.to_string(),
            })
    }
}
