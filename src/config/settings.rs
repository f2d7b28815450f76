// Immutable worker settings built once at startup
// Author: kelexine (https://github.com/kelexine)

use super::validation::parse_origin;
use super::WorkerConfig;
use crate::error::{ProxyError, Result};
use url::Url;

/// Read-only view of the worker configuration shared by the classifier,
/// the strategy engine and the lifecycle controller.
///
/// Domain list entries are lowercased and blank entries dropped so that
/// matching never has to re-normalize them.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    cache_version: String,
    origin: Url,
    upstream_origin: Option<Url>,
    app_shell: String,
    precache: Vec<String>,
    api_domains: Vec<String>,
    cdn_markers: Vec<String>,
}

impl WorkerSettings {
    pub fn from_config(config: &WorkerConfig) -> Result<Self> {
        let origin = parse_origin("worker.origin", &config.origin)?;
        let upstream_origin = config
            .upstream_origin
            .as_deref()
            .map(|u| parse_origin("worker.upstream_origin", u))
            .transpose()?;

        Ok(Self {
            cache_version: config.cache_version.trim().to_string(),
            origin,
            upstream_origin,
            app_shell: config.app_shell.clone(),
            precache: config.precache.clone(),
            api_domains: normalize(&config.api_domains),
            cdn_markers: normalize(&config.cdn_markers),
        })
    }

    pub fn cache_version(&self) -> &str {
        &self.cache_version
    }

    /// Serialized app origin, e.g. `http://localhost:8080`.
    pub fn origin(&self) -> String {
        self.origin.origin().ascii_serialization()
    }

    pub fn origin_url(&self) -> &Url {
        &self.origin
    }

    pub fn upstream_origin(&self) -> Option<&Url> {
        self.upstream_origin.as_ref()
    }

    pub fn app_shell(&self) -> &str {
        &self.app_shell
    }

    pub fn precache(&self) -> &[String] {
        &self.precache
    }

    pub fn api_domains(&self) -> &[String] {
        &self.api_domains
    }

    pub fn cdn_markers(&self) -> &[String] {
        &self.cdn_markers
    }

    /// Resolve a root-relative path (with optional query) against the app
    /// origin. The host always stays the origin's: `//host/x` is a path here,
    /// not a scheme-relative reference.
    pub fn resolve(&self, target: &str) -> Result<Url> {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };
        if !path.starts_with('/') {
            return Err(ProxyError::InvalidRequest(format!(
                "'{}' is not a root-relative path",
                target
            )));
        }

        let mut url = self.origin.clone();
        url.set_path(path);
        url.set_query(query);
        url.set_fragment(None);
        Ok(url)
    }

    pub fn app_shell_url(&self) -> Result<Url> {
        self.resolve(&self.app_shell)
    }
}

fn normalize(entries: &[String]) -> Vec<String> {
    entries
        .iter()
        .map(|e| e.trim().to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_lists_are_normalized() {
        let config = WorkerConfig {
            api_domains: vec!["  Finnhub.IO ".to_string(), "".to_string()],
            ..WorkerConfig::default()
        };
        let settings = WorkerSettings::from_config(&config).unwrap();
        assert_eq!(settings.api_domains(), &["finnhub.io".to_string()]);
    }

    #[test]
    fn test_resolve_against_origin() {
        let settings = WorkerSettings::from_config(&WorkerConfig::default()).unwrap();
        assert_eq!(settings.origin(), "http://localhost:8080");
        assert_eq!(
            settings.app_shell_url().unwrap().as_str(),
            "http://localhost:8080/index.html"
        );
        assert_eq!(
            settings.resolve("/api/quote?symbol=AAPL").unwrap().as_str(),
            "http://localhost:8080/api/quote?symbol=AAPL"
        );
    }

    #[test]
    fn test_resolve_never_leaves_the_origin() {
        let settings = WorkerSettings::from_config(&WorkerConfig::default()).unwrap();
        let url = settings.resolve("//evil.example/steal?x=1").unwrap();
        assert_eq!(url.host_str(), Some("localhost"));
        assert_eq!(url.port(), Some(8080));
        assert_eq!(url.path(), "//evil.example/steal");
        assert_eq!(url.query(), Some("x=1"));

        assert!(settings.resolve("index.html").is_err());
    }
}
