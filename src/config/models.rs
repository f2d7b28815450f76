//! Configuration data structures for the folio-edge caching proxy.
//!
//! This module defines the schema for the application settings, including
//! server parameters, the cache worker (version, manifest, domain lists),
//! outbound network tuning, snapshot storage and logging.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use serde::{Deserialize, Serialize};

/// The root configuration object for the application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP server settings (host, port).
    #[serde(default)]
    pub server: ServerConfig,

    /// Cache worker settings: version, origin, precache manifest and domain lists.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Outbound HTTP client settings.
    #[serde(default)]
    pub network: NetworkConfig,

    /// On-disk snapshot settings for cache generations.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the built-in HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The IP address or hostname the server should bind to.
    /// Default: `127.0.0.1`
    #[serde(default = "default_host")]
    pub host: String,

    /// The port number the server should listen on.
    /// Default: `8080`
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Settings for the request-interception layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Name of the cache generation owned by this build.
    /// Default: `portfolio-v1`
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// The public origin of the dashboard. Requests on this origin are
    /// classified as same-origin.
    /// Default: `http://localhost:8080`
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Where same-origin network fetches are actually sent. Unset means the
    /// public origin is fetched directly, which is only valid when this
    /// proxy is not itself listening on that origin.
    /// Default: `http://127.0.0.1:3000`
    #[serde(default = "default_upstream_origin")]
    pub upstream_origin: Option<String>,

    /// Document served for HTML navigations when both network and cache miss.
    /// Default: `/index.html`
    #[serde(default = "default_app_shell")]
    pub app_shell: String,

    /// Root-relative asset paths fetched during install.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Host substrings that always bypass the cache (quote feeds, backend).
    #[serde(default = "default_api_domains")]
    pub api_domains: Vec<String>,

    /// Host substrings of trusted third-party static hosts.
    #[serde(default = "default_cdn_markers")]
    pub cdn_markers: Vec<String>,
}

/// Settings for the outbound HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// TCP connect timeout in seconds.
    /// Default: `10`
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// Whole-request timeout in seconds. Unset leaves requests to resolve or
    /// fail on their own.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,

    /// Maximum number of idle connections kept per upstream host.
    /// Default: `10`
    #[serde(default = "default_pool_size")]
    pub pool_max_idle_per_host: usize,

    /// User agent sent on fetches originated by the cache layer.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Settings for persisting cache generations between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Whether generations are saved to and restored from disk.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Snapshot directory.
    /// Default: `~/.folio-edge/cache`
    #[serde(default = "default_storage_dir")]
    pub directory: String,
}

/// Settings for application logging and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    /// Default: `info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for logs (`pretty`, `json`, `compact`).
    /// Default: `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Whether to redact API keys and tokens from logged URLs.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub sanitize_urls: bool,
}

// Default trait implementations linking to custom logic

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            cache_version: default_cache_version(),
            origin: default_origin(),
            upstream_origin: default_upstream_origin(),
            app_shell: default_app_shell(),
            precache: default_precache(),
            api_domains: default_api_domains(),
            cdn_markers: default_cdn_markers(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_seconds: default_connect_timeout(),
            timeout_seconds: None,
            pool_max_idle_per_host: default_pool_size(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: default_storage_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            sanitize_urls: true,
        }
    }
}

// Helper functions for serde defaults and shared constants
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cache_version() -> String {
    "portfolio-v1".to_string()
}

fn default_origin() -> String {
    "http://localhost:8080".to_string()
}

fn default_upstream_origin() -> Option<String> {
    Some("http://127.0.0.1:3000".to_string())
}

fn default_app_shell() -> String {
    "/index.html".to_string()
}

fn default_precache() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/manifest.json",
        "/js/app.js",
        "/js/widget.js",
        "/css/styles.css",
        "/icons/icon-192.png",
        "/icons/icon-512.png",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_api_domains() -> Vec<String> {
    [
        "localhost:5000",
        "127.0.0.1:5000",
        "generativelanguage.googleapis.com",
        "query1.finance.yahoo.com",
        "finnhub.io",
        "alphavantage.co",
        "api.coingecko.com",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_cdn_markers() -> Vec<String> {
    [
        "cdn.jsdelivr.net",
        "unpkg.com",
        "cdnjs.cloudflare.com",
        "fonts.googleapis.com",
        "fonts.gstatic.com",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_pool_size() -> usize {
    10
}

fn default_user_agent() -> String {
    format!("folio-edge/{}", env!("CARGO_PKG_VERSION"))
}

fn default_true() -> bool {
    true
}

fn default_storage_dir() -> String {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".folio-edge")
        .join("cache")
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
