//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
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
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Name of the current cache bucket. Bump on every deploy.
    ///
    /// Set via SWCACHE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Path to SQLite cache database.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin that relative paths (allow-list, offline page, CACHE_URLS) resolve against.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path of the pre-cached page served to HTML requests when offline.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// Shell documents, scripts and styles precached on install and served cache-first.
    #[serde(default = "default_static_paths")]
    pub static_paths: Vec<String>,

    /// Path prefixes (`/images/`) or absolute URL prefixes of image hosts.
    #[serde(default = "default_image_prefixes")]
    pub image_prefixes: Vec<String>,

    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    /// Path prefixes or absolute URL prefixes of font hosts.
    #[serde(default = "default_font_prefixes")]
    pub font_prefixes: Vec<String>,

    #[serde(default = "default_font_extensions")]
    pub font_extensions: Vec<String>,

    /// Path prefixes of backend endpoints served network-first.
    #[serde(default = "default_api_prefixes")]
    pub api_prefixes: Vec<String>,

    /// Freshness window for static resources in milliseconds.
    #[serde(default = "default_static_max_age_ms")]
    pub static_max_age_ms: u64,

    /// Freshness window for images in milliseconds.
    #[serde(default = "default_image_max_age_ms")]
    pub image_max_age_ms: u64,

    /// Freshness window for fonts in milliseconds.
    #[serde(default = "default_font_max_age_ms")]
    pub font_max_age_ms: u64,

    /// How long network-first waits for the network before falling back to cache.
    ///
    /// Set via SWCACHE_NETWORK_TIMEOUT_MS environment variable.
    #[serde(default = "default_network_timeout_ms")]
    pub network_timeout_ms: u64,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SWCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via SWCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SWCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_notification_title")]
    pub notification_title: String,

    #[serde(default = "default_notification_body")]
    pub notification_body: String,

    /// Icon and badge shown with push notifications.
    #[serde(default = "default_notification_icon")]
    pub notification_icon: String,
}

fn default_cache_version() -> String {
    "heritage-site-v1.0.0".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_offline_page() -> String {
    "/offline.html".into()
}

fn default_static_paths() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/about.html",
        "/single-project.html",
        "/blog-post.html",
        "/contacts.html",
        "/privacy-policy.html",
        "/search-results.html",
        "/css/bootstrap.css",
        "/css/fonts.css",
        "/css/style.css",
        "/css/local-fonts.css",
        "/css/performance.css",
        "/js/core.min.js",
        "/js/script.js",
        "/js/font-fallback.js",
        "/js/performance-optimizer.js",
        "/images/favicon.ico",
        "/images/logo-default-152x94.png",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_image_prefixes() -> Vec<String> {
    [
        "/images/",
        "https://www.ihchina.cn/Uploads/Picture/",
        "https://bkimg.cdn.bcebos.com/",
        "https://vodpub6.v.news.cn/",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_image_extensions() -> Vec<String> {
    [".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg", ".ico"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_font_prefixes() -> Vec<String> {
    ["https://fonts.googleapis.com/", "https://fonts.gstatic.com/", "/fonts/"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_font_extensions() -> Vec<String> {
    [".woff", ".woff2", ".ttf", ".eot", ".otf"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_api_prefixes() -> Vec<String> {
    vec!["/api/".into(), "/bat/".into()]
}

fn default_static_max_age_ms() -> u64 {
    3_600_000 // 1h
}

fn default_image_max_age_ms() -> u64 {
    86_400_000 // 24h
}

fn default_font_max_age_ms() -> u64 {
    2_592_000_000 // 30d
}

fn default_network_timeout_ms() -> u64 {
    3_000
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_notification_title() -> String {
    "Heritage site".into()
}

fn default_notification_body() -> String {
    "New content is available".into()
}

fn default_notification_icon() -> String {
    "/images/favicon.ico".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_version: default_cache_version(),
            db_path: default_db_path(),
            origin: default_origin(),
            offline_page: default_offline_page(),
            static_paths: default_static_paths(),
            image_prefixes: default_image_prefixes(),
            image_extensions: default_image_extensions(),
            font_prefixes: default_font_prefixes(),
            font_extensions: default_font_extensions(),
            api_prefixes: default_api_prefixes(),
            static_max_age_ms: default_static_max_age_ms(),
            image_max_age_ms: default_image_max_age_ms(),
            font_max_age_ms: default_font_max_age_ms(),
            network_timeout_ms: default_network_timeout_ms(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            user_agent: default_user_agent(),
            notification_title: default_notification_title(),
            notification_body: default_notification_body(),
            notification_icon: default_notification_icon(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Network-first race deadline.
    pub fn network_timeout(&self) -> Duration {
        Duration::from_millis(self.network_timeout_ms)
    }

    /// Parsed origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<url::Url, ConfigError> {
        let parsed = url::Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            scheme => Err(ConfigError::Invalid {
                field: "origin".into(),
                reason: format!("unsupported scheme: {scheme}"),
            }),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWCACHE_`
    /// 2. TOML file from `SWCACHE_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
