//! Configuration validation rules.
//!
//! Checks `AppConfig` values after they have been merged from defaults,
//! file and environment, before anything is built from them.

use crate::config::AppConfig;
use crate::error::{ProxyError, Result};
use std::net::IpAddr;
use url::Url;

fn invalid(field: &str, reason: impl std::fmt::Display) -> ProxyError {
    ProxyError::Config(format!("{}: {}", field, reason))
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ProxyError::Config` if:
    /// - `worker.cache_version` is blank
    /// - `worker.origin` or `worker.upstream_origin` is not an http(s) URL
    /// - `worker.upstream_origin` is unset while `worker.origin` is the
    ///   server's own listen address (every fetch would loop back)
    /// - `worker.app_shell` or any precache entry is not root-relative
    /// - `logging.format` is not one of `pretty`, `json`, `compact`
    pub fn validate(&self) -> Result<()> {
        let worker = &self.worker;

        if worker.cache_version.trim().is_empty() {
            return Err(invalid("worker.cache_version", "must not be empty"));
        }

        let origin = parse_origin("worker.origin", &worker.origin)?;
        match &worker.upstream_origin {
            Some(upstream) => {
                parse_origin("worker.upstream_origin", upstream)?;
            }
            None if self.listens_on(&origin) => {
                return Err(invalid(
                    "worker.upstream_origin",
                    format!(
                        "must be set when worker.origin ({}) is this server's own address",
                        worker.origin
                    ),
                ));
            }
            None => {}
        }

        if !is_root_relative(&worker.app_shell) {
            return Err(invalid("worker.app_shell", "must be a path starting with a single '/'"));
        }

        if let Some(bad) = worker.precache.iter().find(|p| !is_root_relative(p)) {
            return Err(invalid(
                "worker.precache",
                format!("'{}' is not a root-relative path", bad),
            ));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json" | "compact") {
            return Err(invalid(
                "logging.format",
                format!("unknown format '{}'", self.logging.format),
            ));
        }

        if worker.api_domains.iter().any(|d| d.trim().is_empty())
            || worker.cdn_markers.iter().any(|d| d.trim().is_empty())
        {
            tracing::warn!("Blank entries in api_domains/cdn_markers are ignored");
        }

        Ok(())
    }
}

impl AppConfig {
    /// Whether `origin` resolves to the address the server binds.
    fn listens_on(&self, origin: &Url) -> bool {
        if origin.port_or_known_default() != Some(self.server.port) {
            return false;
        }
        let Some(host) = origin.host_str() else {
            return false;
        };
        let host = host.trim_start_matches('[').trim_end_matches(']').to_ascii_lowercase();
        let bind = self.server.host.to_ascii_lowercase();

        host == bind || (is_loopback(&host) && (is_loopback(&bind) || is_unspecified(&bind)))
    }
}

fn is_loopback(host: &str) -> bool {
    host == "localhost" || host.parse::<IpAddr>().map(|ip| ip.is_loopback()).unwrap_or(false)
}

fn is_unspecified(host: &str) -> bool {
    host.parse::<IpAddr>().map(|ip| ip.is_unspecified()).unwrap_or(false)
}

/// A path on the app origin. `//host/...` is rejected because URL
/// resolution elsewhere would read it as a different host.
fn is_root_relative(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//")
}

pub(crate) fn parse_origin(field: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value).map_err(|e| invalid(field, e))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid(field, "must be an http(s) origin"));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_version() {
        let mut config = AppConfig::default();
        config.worker.cache_version = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cache_version"));
    }

    #[test]
    fn test_validate_bad_origin() {
        let mut config = AppConfig::default();
        config.worker.origin = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        config.worker.origin = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_relative_precache_entry() {
        let mut config = AppConfig::default();
        config.worker.precache.push("js/app.js".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("js/app.js"));
    }

    #[test]
    fn test_validate_unknown_log_format() {
        let mut config = AppConfig::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_self_referencing_origin() {
        let mut config = AppConfig::default();
        config.worker.upstream_origin = None;
        // localhost:8080 is where the default server binds
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("upstream_origin"));

        config.server.host = "0.0.0.0".to_string();
        assert!(config.validate().is_err());

        config.server.port = 9090;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_direct_origin_without_upstream() {
        let mut config = AppConfig::default();
        config.worker.upstream_origin = None;
        config.worker.origin = "https://dash.example.com".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_scheme_relative_paths() {
        let mut config = AppConfig::default();
        config.worker.app_shell = "//evil.example/index.html".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.worker.precache.push("//evil.example/app.js".to_string());
        assert!(config.validate().is_err());
    }
}
