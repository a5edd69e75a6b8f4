//! Configuration store for the backend URL and the model redirect table.
//!
//! Settings live in a flat JSON file (`<config_dir>/rellama/config.json`).
//! Reads go through an in-process cache; every mutation rewrites the file
//! and refreshes the cache, so concurrent readers always observe the last
//! persisted state.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{RellamaError, Result};

/// A single model redirect: requests for `source` are served by `destination`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectEntry {
    pub source: String,
    pub destination: String,
}

/// On-disk document shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    /// Backend base URL, normalized to end with `/api/`. Empty when unset.
    #[serde(default)]
    url: String,
    /// Model redirects, at most one entry per source.
    #[serde(default)]
    redirects: Vec<RedirectEntry>,
}

/// Read-through cached handle to the configuration file.
///
/// Shared as `Arc<ConfigStore>` between the proxy and the chat session;
/// neither component mutates redirects, both resolve through it per request.
pub struct ConfigStore {
    path: PathBuf,
    cache: RwLock<Option<ConfigFile>>,
}

impl ConfigStore {
    /// Create a store backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    /// Default config file location: `<config_dir>/rellama/config.json`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|c| c.join("rellama"))
            .unwrap_or_else(|| PathBuf::from(".rellama"))
            .join("config.json")
    }

    /// Create a store at the default location.
    pub fn open_default() -> Self {
        Self::new(Self::default_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Backend base URL, or `None` when no URL has been configured yet.
    pub fn url(&self) -> Result<Option<String>> {
        let config = self.read()?;
        if config.url.is_empty() {
            Ok(None)
        } else {
            Ok(Some(config.url))
        }
    }

    /// Normalize and persist the backend URL.
    ///
    /// Accepts bare hosts (`localhost:11434`), defaults the scheme to https,
    /// and forces the stored value to end with `/api/` so that route names
    /// can be appended directly. Returns the stored form.
    pub fn set_url(&self, raw: &str) -> Result<String> {
        let mut url = raw.to_string();

        if !url.starts_with("https://") && !url.starts_with("http://") {
            url = format!("https://{url}");
        }

        if url.ends_with("/api") {
            url.push('/');
        }

        if !url.ends_with("/api/") {
            url = format!("{}/api/", url.trim_end_matches('/'));
        }

        Url::parse(&url).map_err(|e| RellamaError::Config(format!("Invalid URL '{raw}': {e}")))?;

        let mut config = self.read()?;
        config.url = url.clone();
        self.write(config)?;

        Ok(url)
    }

    /// Current redirect table, in insertion order.
    pub fn redirects(&self) -> Result<Vec<RedirectEntry>> {
        Ok(self.read()?.redirects)
    }

    /// Insert or replace the redirect for `source`.
    pub fn set_redirect(&self, source: &str, destination: &str) -> Result<()> {
        let mut config = self.read()?;
        config.redirects.retain(|r| r.source != source);
        config.redirects.push(RedirectEntry {
            source: source.to_string(),
            destination: destination.to_string(),
        });
        self.write(config)
    }

    /// Resolve a model name through the redirect table.
    ///
    /// Exactly one hop: with `a -> b` and `b -> c` configured, `a` resolves
    /// to `b`. A name with no entry resolves to itself; resolution never
    /// fails (an unreadable table resolves every name to itself).
    pub fn resolve_model(&self, source: &str) -> String {
        match self.read() {
            Ok(config) => config
                .redirects
                .iter()
                .find(|r| r.source == source)
                .map(|r| r.destination.clone())
                .unwrap_or_else(|| source.to_string()),
            Err(e) => {
                tracing::warn!("Failed to read redirect table, passing model through: {e}");
                source.to_string()
            }
        }
    }

    /// Read the cached config, loading it from disk on first access.
    /// A missing file yields the default (empty) configuration.
    fn read(&self) -> Result<ConfigFile> {
        if let Some(cached) = self.cache.read().expect("config cache poisoned").as_ref() {
            return Ok(cached.clone());
        }

        let config = if self.path.exists() {
            let content = std::fs::read_to_string(&self.path).map_err(|e| {
                RellamaError::Config(format!(
                    "Failed to read config file {}: {e}",
                    self.path.display()
                ))
            })?;
            serde_json::from_str(&content).map_err(|e| {
                RellamaError::Config(format!(
                    "Failed to parse config file {}: {e}",
                    self.path.display()
                ))
            })?
        } else {
            ConfigFile::default()
        };

        *self.cache.write().expect("config cache poisoned") = Some(config.clone());
        Ok(config)
    }

    /// Persist the config and refresh the cache.
    fn write(&self, config: ConfigFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RellamaError::Config(format!(
                    "Failed to create config directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let json = serde_json::to_string_pretty(&config)
            .map_err(|e| RellamaError::Serialization(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&self.path, json).map_err(|e| {
            RellamaError::Config(format!(
                "Failed to write config file {}: {e}",
                self.path.display()
            ))
        })?;

        *self.cache.write().expect("config cache poisoned") = Some(config);
        Ok(())
    }
}
