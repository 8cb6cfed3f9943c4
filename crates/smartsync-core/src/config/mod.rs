//! Sync configuration file.
//!
//! One JSON document names the remote, the local database, the collections to
//! sync, and the cycle timeouts. Environment variables override the file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::CollectionName;
use crate::sync::SyncOptions;
use crate::util::{is_http_url, normalize_text_option};

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const REMOTE_URL_ENV: &str = "SMARTSYNC_REMOTE_URL";
pub const DB_PATH_ENV: &str = "SMARTSYNC_DB_PATH";

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;
const DEFAULT_PERSIST_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SmartSyncConfig {
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    /// Collections synced when none are named explicitly
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_persist_timeout_secs")]
    pub persist_timeout_secs: u64,
    #[serde(default)]
    pub filter_fallback_client_side: bool,
}

const fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

const fn default_persist_timeout_secs() -> u64 {
    DEFAULT_PERSIST_TIMEOUT_SECS
}

impl Default for SmartSyncConfig {
    fn default() -> Self {
        Self {
            remote_url: None,
            db_path: None,
            collections: Vec::new(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            persist_timeout_secs: DEFAULT_PERSIST_TIMEOUT_SECS,
            filter_fallback_client_side: false,
        }
    }
}

impl SmartSyncConfig {
    /// Load and validate a config file. A missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let mut config = serde_json::from_str::<Self>(&raw).map_err(|error| {
            Error::Config(format!(
                "Failed to parse config at {}: {}",
                path.display(),
                error
            ))
        })?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    /// Apply `SMARTSYNC_*` overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = normalize_text_option(lookup(REMOTE_URL_ENV)) {
            self.remote_url = Some(url);
        }
        if let Some(path) = normalize_text_option(lookup(DB_PATH_ENV)) {
            self.db_path = Some(PathBuf::from(path));
        }
        self.normalize();
        self.validate()
    }

    pub fn remote_url(&self) -> Option<&str> {
        self.remote_url.as_deref()
    }

    /// Configured collections as validated names
    pub fn collections(&self) -> Result<Vec<CollectionName>> {
        self.collections.iter().map(CollectionName::new).collect()
    }

    pub const fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            persist_timeout: Duration::from_secs(self.persist_timeout_secs),
            filter_fallback_client_side: self.filter_fallback_client_side,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.remote_url {
            if !is_http_url(url) {
                return Err(Error::Config(format!(
                    "remote_url must include http:// or https:// (got '{url}')"
                )));
            }
        }
        if self.fetch_timeout_secs == 0 || self.persist_timeout_secs == 0 {
            return Err(Error::Config(
                "timeouts must be at least one second".to_string(),
            ));
        }
        self.collections()
            .map(|_| ())
            .map_err(|error| Error::Config(format!("invalid collection list: {error}")))
    }

    fn normalize(&mut self) {
        self.remote_url = normalize_text_option(self.remote_url.take())
            .map(|url| url.trim_end_matches('/').to_string());
        self.collections = self
            .collections
            .iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        let mut seen = HashSet::new();
        self.collections.retain(|name| seen.insert(name.clone()));
    }
}
