//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (OFFCACHE_*)
//! 2. TOML config file (if OFFCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (OFFCACHE_*)
/// 2. TOML config file (if OFFCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via OFFCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Base URL of the site; root-relative paths resolve against it.
    ///
    /// Set via OFFCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Deploy version tag used in generation names (`static-<version>`).
    ///
    /// Set via OFFCACHE_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via OFFCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via OFFCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Network timeout in milliseconds, applied to every fetch.
    ///
    /// Set via OFFCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Seconds between janitor sweeps of the dynamic generation.
    ///
    /// Set via OFFCACHE_JANITOR_INTERVAL_SECS environment variable.
    #[serde(default = "default_janitor_interval_secs")]
    pub janitor_interval_secs: u64,

    /// Dynamic entries older than this are evicted by the janitor.
    ///
    /// Set via OFFCACHE_MAX_AGE_DAYS environment variable.
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,

    /// Root-relative URLs cached at install time. All must succeed.
    #[serde(default = "default_static_manifest")]
    pub static_manifest: Vec<String>,

    /// Path prefixes that always go network-first.
    #[serde(default = "default_network_first")]
    pub network_first: Vec<String>,

    /// Path prefixes or absolute URL prefixes served cache-first.
    #[serde(default = "default_cache_first")]
    pub cache_first: Vec<String>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./offcache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_version() -> String {
    "v1.0.0".into()
}

fn default_user_agent() -> String {
    "offcache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_janitor_interval_secs() -> u64 {
    24 * 60 * 60
}

fn default_max_age_days() -> u32 {
    7
}

fn default_static_manifest() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/css/premium-animations.css",
        "/js/premium-interactions.js",
        "/js/advanced-features.js",
        "/assets/arabic-calligraphy-logo.png",
        "/assets/quran-book-3d-render.png",
        "/assets/divine-light-rays.png",
        "/assets/islamic-geometric-pattern-gold.png",
        "/assets/particle-system-elements.png",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_network_first() -> Vec<String> {
    vec!["/api/".into(), "/search/".into(), "/analytics/".into()]
}

fn default_cache_first() -> Vec<String> {
    vec![
        "/assets/".into(),
        "/css/".into(),
        "/js/".into(),
        "https://fonts.googleapis.com/".into(),
        "https://fonts.gstatic.com/".into(),
    ]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            version: default_version(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            janitor_interval_secs: default_janitor_interval_secs(),
            max_age_days: default_max_age_days(),
            static_manifest: default_static_manifest(),
            network_first: default_network_first(),
            cache_first: default_cache_first(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Janitor sweep interval.
    pub fn janitor_interval(&self) -> Duration {
        Duration::from_secs(self.janitor_interval_secs)
    }

    /// Janitor retention window.
    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.max_age_days))
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `OFFCACHE_`
    /// 2. TOML file from `OFFCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed,
    /// or if validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("OFFCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("OFFCACHE_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./offcache.sqlite"));
        assert_eq!(config.origin, "http://localhost:8080");
        assert_eq!(config.version, "v1.0.0");
        assert_eq!(config.user_agent, "offcache/0.1");
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.janitor_interval_secs, 86_400);
        assert_eq!(config.max_age_days, 7);
        assert_eq!(config.static_manifest.first().map(String::as_str), Some("/"));
        assert_eq!(config.network_first, vec!["/api/", "/search/", "/analytics/"]);
        assert!(config.cache_first.iter().any(|p| p.starts_with("https://fonts.")));
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
        assert_eq!(config.janitor_interval(), Duration::from_secs(86_400));
        assert_eq!(config.max_age(), chrono::Duration::days(7));
    }
}
