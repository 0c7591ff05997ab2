//! Configuration management.
//!
//! `WorkerConfig` is what a `CacheWorker` needs at runtime. `Config` is the
//! on-disk application configuration it is derived from, stored at
//! `~/.config/assetcache/config.json` with environment overrides.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::fetch::client::DEFAULT_TIMEOUT_SECS;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "assetcache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Origin used when nothing is configured.
const DEFAULT_ORIGIN: &str = "http://localhost:8080";

/// Parallel downloads during an offline pre-fetch.
const DEFAULT_PREFETCH_CONCURRENCY: usize = 8;

const ORIGIN_ENV: &str = "ASSETCACHE_ORIGIN";
const CACHE_DIR_ENV: &str = "ASSETCACHE_CACHE_DIR";
const LOG_FILE_ENV: &str = "ASSETCACHE_LOG_FILE";

/// Names of the three namespaces a worker uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheNames {
    pub content: String,
    pub temp: String,
    pub manifest: String,
}

impl Default for CacheNames {
    fn default() -> Self {
        Self {
            content: "app-cache".to_string(),
            temp: "app-temp-cache".to_string(),
            manifest: "app-manifest".to_string(),
        }
    }
}

impl CacheNames {
    pub fn all(&self) -> [&str; 3] {
        [self.content.as_str(), self.temp.as_str(), self.manifest.as_str()]
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Origin the assets are served from; only its scheme/host/port matter.
    pub origin: Url,
    pub cache_names: CacheNames,
    pub prefetch_concurrency: usize,
    /// Activate right after a successful install instead of waiting.
    pub skip_waiting_on_install: bool,
}

impl WorkerConfig {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            cache_names: CacheNames::default(),
            prefetch_concurrency: DEFAULT_PREFETCH_CONCURRENCY,
            skip_waiting_on_install: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub origin: String,
    pub cache_dir: Option<PathBuf>,
    pub request_timeout_secs: u64,
    pub prefetch_concurrency: usize,
    pub skip_waiting_on_install: bool,
    pub cache_names: CacheNames,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            cache_dir: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            prefetch_concurrency: DEFAULT_PREFETCH_CONCURRENCY,
            skip_waiting_on_install: true,
            cache_names: CacheNames::default(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load the config file (defaults if absent) and apply env overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_env();
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    fn apply_env(&mut self) {
        if let Ok(origin) = std::env::var(ORIGIN_ENV) {
            self.origin = origin;
        }
        if let Ok(dir) = std::env::var(CACHE_DIR_ENV) {
            self.cache_dir = Some(PathBuf::from(dir));
        }
        if let Ok(file) = std::env::var(LOG_FILE_ENV) {
            self.log_file = Some(PathBuf::from(file));
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Store root: the configured directory, else the platform cache dir.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn worker_config(&self) -> Result<WorkerConfig> {
        let origin = Url::parse(&self.origin)
            .with_context(|| format!("Invalid origin URL: {}", self.origin))?;
        if origin.cannot_be_a_base() {
            anyhow::bail!("Origin cannot be used as a base URL: {}", self.origin);
        }
        Ok(WorkerConfig {
            origin,
            cache_names: self.cache_names.clone(),
            prefetch_concurrency: self.prefetch_concurrency.max(1),
            skip_waiting_on_install: self.skip_waiting_on_install,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"origin": "https://app.example.com"}"#).unwrap();
        assert_eq!(config.request_timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.prefetch_concurrency, DEFAULT_PREFETCH_CONCURRENCY);
        assert!(config.skip_waiting_on_install);
        assert_eq!(config.cache_names, CacheNames::default());
    }

    #[test]
    fn test_worker_config() {
        let config = Config {
            origin: "https://app.example.com".to_string(),
            prefetch_concurrency: 0,
            ..Config::default()
        };
        let worker = config.worker_config().unwrap();
        assert_eq!(worker.origin.host_str(), Some("app.example.com"));
        assert_eq!(worker.prefetch_concurrency, 1);
    }

    #[test]
    fn test_invalid_origin() {
        let config = Config {
            origin: "not a url".to_string(),
            ..Config::default()
        };
        assert!(config.worker_config().is_err());

        let config = Config {
            origin: "mailto:someone@example.com".to_string(),
            ..Config::default()
        };
        assert!(config.worker_config().is_err());
    }

    #[test]
    fn test_explicit_cache_dir_wins() {
        let config = Config {
            cache_dir: Some(PathBuf::from("/tmp/assets")),
            ..Config::default()
        };
        assert_eq!(config.cache_dir().unwrap(), PathBuf::from("/tmp/assets"));
    }
}
