use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tracing::{debug, warn};

use super::{AssetFetcher, AssetResolver, ResolvedAsset};
use crate::error::AssetError;

/// 1×1 transparent GIF returned when nothing better is available
pub const UNIVERSAL_FALLBACK: &str =
    "data:image/gif;base64,R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7";

/// Extensions whose payload is decoded to prove the asset is usable
const DECODABLE_EXTENSIONS: &[&str] = &["png", "gif", "jpg", "jpeg"];

/// Result of a load: either the real asset or the fallback that replaced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(String),
    Fallback(String),
}

impl LoadOutcome {
    pub fn url(&self) -> &str {
        match self {
            Self::Loaded(url) | Self::Fallback(url) => url,
        }
    }

    pub fn into_url(self) -> String {
        match self {
            Self::Loaded(url) | Self::Fallback(url) => url,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

/// Loads theme assets with bounded retry and a guaranteed fallback
///
/// Per session, every URL is fetched at most twice: a failed first attempt is retried once after
/// a fixed delay, and a URL that fails both attempts is never requested again. Successes are
/// memoized as well, so repeated activations cost nothing.
pub struct ResourceLoader {
    resolver: Box<dyn AssetResolver>,
    fetcher: Box<dyn AssetFetcher>,
    retry_delay: Duration,
    loaded: HashMap<String, String>,
    failed: HashSet<String>,
    attempts: HashMap<String, usize>,
}

impl ResourceLoader {
    pub fn new(
        resolver: Box<dyn AssetResolver>,
        fetcher: Box<dyn AssetFetcher>,
        retry_delay: Duration,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            retry_delay,
            loaded: HashMap::new(),
            failed: HashSet::new(),
            attempts: HashMap::new(),
        }
    }

    /// Load an asset and return something renderable, never failing
    pub async fn load(&mut self, asset_id: &str, fallback: Option<&str>) -> String {
        self.load_outcome(asset_id, fallback).await.into_url()
    }

    /// Like [`load`](Self::load) but tells the caller whether the fallback was used
    pub async fn load_outcome(&mut self, asset_id: &str, fallback: Option<&str>) -> LoadOutcome {
        let fallback = fallback.unwrap_or(UNIVERSAL_FALLBACK).to_string();

        let url = match self.resolver.resolve(asset_id) {
            ResolvedAsset::Procedural(pattern) => {
                let key = format!("procedural:{:?}", pattern);
                if let Some(uri) = self.loaded.get(&key) {
                    return LoadOutcome::Loaded(uri.clone());
                }
                return match pattern.to_data_uri() {
                    Ok(uri) => {
                        self.loaded.insert(key, uri.clone());
                        LoadOutcome::Loaded(uri)
                    }
                    Err(e) => {
                        warn!("Procedural asset {} failed to render: {}", asset_id, e);
                        LoadOutcome::Fallback(fallback)
                    }
                };
            }
            ResolvedAsset::Url(url) => url,
        };

        if let Some(usable) = self.loaded.get(&url) {
            return LoadOutcome::Loaded(usable.clone());
        }
        if self.failed.contains(&url) {
            debug!("Asset {} failed earlier this session; using fallback", url);
            return LoadOutcome::Fallback(fallback);
        }

        let first = self.attempt(&url);
        let result = match first {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!("Asset {} failed ({}); retrying in {:?}", url, e, self.retry_delay);
                tokio::time::sleep(self.retry_delay).await;
                self.attempt(&url)
            }
        };

        match result {
            Ok(()) => {
                self.loaded.insert(url.clone(), url.clone());
                LoadOutcome::Loaded(url)
            }
            Err(e) => {
                warn!("Asset {} unavailable after retry: {}", url, e);
                self.failed.insert(url);
                LoadOutcome::Fallback(fallback)
            }
        }
    }

    fn attempt(&mut self, url: &str) -> Result<(), AssetError> {
        *self.attempts.entry(url.to_string()).or_insert(0) += 1;

        if url.starts_with("data:") {
            return Ok(());
        }

        let bytes = self.fetcher.fetch(url)?;
        if bytes.is_empty() {
            return Err(AssetError::NotFound {
                url: url.to_string(),
            });
        }

        let extension = url
            .rsplit('.')
            .next()
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();
        if DECODABLE_EXTENSIONS.contains(&extension.as_str()) {
            image::load_from_memory(&bytes).map_err(|e| AssetError::Undecodable {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// Number of fetch attempts made for a resolved URL
    pub fn attempts(&self, url: &str) -> usize {
        self.attempts.get(url).copied().unwrap_or(0)
    }

    pub fn is_known_failure(&self, url: &str) -> bool {
        self.failed.contains(url)
    }

    pub fn resolver(&self) -> &dyn AssetResolver {
        self.resolver.as_ref()
    }
}
