//! Config.
//!
//! Loads `gonav.toml`, falling back to defaults on a missing or invalid
//! file — never a hard error, so a bare checkout with no config file still
//! starts up with sane defaults.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::queue::QueueConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GonavConfig {
    pub server: ServerConfig,
    pub queue: QueueFileConfig,
    pub cache: CacheConfig,
}

impl Default for GonavConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            queue: QueueFileConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueFileConfig {
    pub max_concurrent_downloads: usize,
    pub download_timeout_secs: u64,
    pub queue_size: usize,
    pub retry_attempts: u32,
}

impl Default for QueueFileConfig {
    fn default() -> Self {
        let defaults = QueueConfig::default();
        Self {
            max_concurrent_downloads: defaults.max_concurrent_downloads,
            download_timeout_secs: defaults.download_timeout.as_secs(),
            queue_size: defaults.queue_size,
            retry_attempts: defaults.retry_attempts,
        }
    }
}

impl QueueFileConfig {
    pub fn to_queue_config(&self) -> QueueConfig {
        QueueConfig {
            max_concurrent_downloads: self.max_concurrent_downloads,
            download_timeout: Duration::from_secs(self.download_timeout_secs),
            queue_size: self.queue_size,
            retry_attempts: self.retry_attempts,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_age_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_age_secs: 3600 }
    }
}

impl CacheConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

impl GonavConfig {
    /// Reads `path`; a missing file or one that fails to parse falls back to
    /// [`GonavConfig::default`] with a logged warning rather than a hard
    /// error, since the server must still start without a config file.
    pub fn load(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "no config file found, using defaults");
                return Self::default();
            }
        };

        match toml::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "config file failed to parse, using defaults");
                Self::default()
            }
        }
    }
}
