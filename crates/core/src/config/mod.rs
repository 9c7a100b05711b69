//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (FOLIO_SW_*)
//! 2. TOML config file (if FOLIO_SW_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::GenerationSet;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (FOLIO_SW_*)
/// 2. TOML config file (if FOLIO_SW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite cache storage database.
    ///
    /// Set via FOLIO_SW_CACHE_DB_PATH environment variable.
    #[serde(default = "default_cache_db_path")]
    pub cache_db_path: PathBuf,

    /// Path to the PortfolioDB submission store.
    ///
    /// Set via FOLIO_SW_QUEUE_DB_PATH environment variable.
    #[serde(default = "default_queue_db_path")]
    pub queue_db_path: PathBuf,

    /// Origin the worker serves; relative paths resolve against it.
    ///
    /// Set via FOLIO_SW_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Registration scope path.
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Version tag appended to cache generation names.
    ///
    /// Set via FOLIO_SW_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Paths fetched into the static generation at install.
    #[serde(default = "default_precache_manifest")]
    pub precache_manifest: Vec<String>,

    /// URL substrings routed network-first.
    #[serde(default = "default_network_first_patterns")]
    pub network_first_patterns: Vec<String>,

    /// Path suffixes routed cache-first.
    #[serde(default = "default_cache_first_extensions")]
    pub cache_first_extensions: Vec<String>,

    /// User-Agent string for outbound requests.
    ///
    /// Set via FOLIO_SW_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via FOLIO_SW_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes buffered per response.
    ///
    /// Set via FOLIO_SW_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Redirects followed per request before giving up.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Background-sync tag that drains the submission queue.
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,

    /// Endpoint path deferred submissions are POSTed to.
    #[serde(default = "default_contact_endpoint")]
    pub contact_endpoint: String,

    /// Stop retrying a submission after this many failed attempts.
    ///
    /// Unset means retry on every drain.
    #[serde(default)]
    pub max_delivery_attempts: Option<u32>,

    /// Request skip-waiting during install so a fresh worker activates
    /// without waiting for old clients to close.
    #[serde(default = "default_true")]
    pub skip_waiting_on_install: bool,

    /// Title of push notifications.
    #[serde(default = "default_notification_title")]
    pub notification_title: String,
}

fn default_cache_db_path() -> PathBuf {
    PathBuf::from("./folio-sw-cache.sqlite")
}

fn default_queue_db_path() -> PathBuf {
    PathBuf::from("./PortfolioDB.sqlite")
}

fn default_origin() -> String {
    "http://localhost:5173".into()
}

fn default_scope() -> String {
    "/".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_precache_manifest() -> Vec<String> {
    ["/", "/index.html", "/src/main.jsx", "/src/App.jsx", "/src/index.css", "/src/assets/logo.png", "/src/assets/herobg.png"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_network_first_patterns() -> Vec<String> {
    vec!["/api/".into(), "https://api.".into()]
}

fn default_cache_first_extensions() -> Vec<String> {
    [".png", ".jpg", ".jpeg", ".svg", ".webp", ".woff2", ".woff", ".ttf"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_user_agent() -> String {
    "folio-sw/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_max_redirects() -> usize {
    5
}

fn default_sync_tag() -> String {
    "contact-form-sync".into()
}

fn default_contact_endpoint() -> String {
    "/api/contact".into()
}

fn default_true() -> bool {
    true
}

fn default_notification_title() -> String {
    "Portfolio".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_db_path: default_cache_db_path(),
            queue_db_path: default_queue_db_path(),
            origin: default_origin(),
            scope: default_scope(),
            cache_version: default_cache_version(),
            precache_manifest: default_precache_manifest(),
            network_first_patterns: default_network_first_patterns(),
            cache_first_extensions: default_cache_first_extensions(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            max_redirects: default_max_redirects(),
            sync_tag: default_sync_tag(),
            contact_endpoint: default_contact_endpoint(),
            max_delivery_attempts: None,
            skip_waiting_on_install: true,
            notification_title: default_notification_title(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Generation names derived from `cache_version`.
    pub fn generations(&self) -> GenerationSet {
        GenerationSet::for_version(&self.cache_version)
    }

    /// Parsed origin URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfigError::Invalid { field: "origin".into(), reason: format!("unsupported scheme {scheme}") }),
        }
    }

    /// Resolve a path or absolute URL against the origin.
    pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
        self.origin_url()?
            .join(path)
            .map_err(|e| ConfigError::Invalid { field: "path".into(), reason: format!("{path}: {e}") })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `FOLIO_SW_`
    /// 2. TOML file from `FOLIO_SW_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("FOLIO_SW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("FOLIO_SW_")
                .ignore(&["CONFIG_FILE"])
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
        assert_eq!(config.cache_db_path, PathBuf::from("./folio-sw-cache.sqlite"));
        assert_eq!(config.queue_db_path, PathBuf::from("./PortfolioDB.sqlite"));
        assert_eq!(config.cache_version, "v1");
        assert_eq!(config.sync_tag, "contact-form-sync");
        assert_eq!(config.contact_endpoint, "/api/contact");
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.precache_manifest[0], "/");
        assert!(config.cache_first_extensions.contains(&".woff2".to_string()));
        assert!(config.max_delivery_attempts.is_none());
        assert!(config.skip_waiting_on_install);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_generations() {
        let config = AppConfig { cache_version: "v7".into(), ..Default::default() };
        let generations = config.generations();
        assert_eq!(generations.static_name(), "static-v7");
        assert_eq!(generations.dynamic_name(), "dynamic-v7");
    }

    #[test]
    fn test_resolve_against_origin() {
        let config = AppConfig { origin: "https://portfolio.example".into(), ..Default::default() };
        assert_eq!(config.resolve("/api/contact").unwrap().as_str(), "https://portfolio.example/api/contact");
        assert_eq!(config.resolve("https://cdn.example/x.png").unwrap().as_str(), "https://cdn.example/x.png");
    }

    #[test]
    fn test_origin_url_rejects_non_http() {
        let config = AppConfig { origin: "file:///srv/www".into(), ..Default::default() };
        assert!(matches!(config.origin_url(), Err(ConfigError::Invalid { .. })));
    }
}
