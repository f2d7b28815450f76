// Request classifier
// Author: kelexine (https://github.com/kelexine)

use crate::config::WorkerSettings;
use crate::models::RequestDescriptor;
use std::fmt;

/// How an intercepted request is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Non-GET, or a live API host. Never touches the cache.
    Bypass,
    /// The dashboard's own assets: stale-while-revalidate.
    SameOrigin,
    /// Third-party static hosts: network-first with cache fallback.
    TrustedExternal,
    /// Any other third party. Left to the network.
    UntrustedExternal,
}

impl Classification {
    /// Whether the cache layer substitutes the response for this class.
    pub fn is_intercepted(&self) -> bool {
        matches!(
            self,
            Classification::SameOrigin | Classification::TrustedExternal
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Classification::Bypass => "bypass",
            Classification::SameOrigin => "same_origin",
            Classification::TrustedExternal => "trusted_external",
            Classification::UntrustedExternal => "untrusted_external",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a request. The rules are applied in order; first match wins.
pub fn classify(request: &RequestDescriptor, settings: &WorkerSettings) -> Classification {
    if !request.is_get() {
        return Classification::Bypass;
    }

    let host = request.host();
    if host_matches(&host, settings.api_domains()) {
        return Classification::Bypass;
    }

    if request.origin() != settings.origin() {
        if host_matches(&host, settings.cdn_markers()) {
            return Classification::TrustedExternal;
        }
        return Classification::UntrustedExternal;
    }

    Classification::SameOrigin
}

/// Exact or substring match against already-normalized entries.
fn host_matches(host: &str, entries: &[String]) -> bool {
    entries.iter().any(|entry| host.contains(entry.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerConfig;
    use axum::http::{HeaderMap, Method};
    use url::Url;

    fn settings() -> WorkerSettings {
        WorkerSettings::from_config(&WorkerConfig::default()).unwrap()
    }

    fn get(url: &str) -> RequestDescriptor {
        RequestDescriptor::get(Url::parse(url).unwrap())
    }

    #[test]
    fn test_non_get_is_bypassed() {
        let req = RequestDescriptor::new(
            Method::POST,
            Url::parse("http://localhost:8080/index.html").unwrap(),
            HeaderMap::new(),
        );
        assert_eq!(classify(&req, &settings()), Classification::Bypass);
    }

    #[test]
    fn test_api_domains_are_bypassed() {
        let s = settings();
        assert_eq!(classify(&get("http://localhost:5000/api/portfolios"), &s), Classification::Bypass);
        assert_eq!(classify(&get("https://finnhub.io/api/v1/quote?symbol=AAPL"), &s), Classification::Bypass);
        // substring match catches subdomains
        assert_eq!(classify(&get("https://www.alphavantage.co/query"), &s), Classification::Bypass);
    }

    #[test]
    fn test_cdn_is_trusted() {
        assert_eq!(
            classify(&get("https://cdn.jsdelivr.net/npm/chart.js"), &settings()),
            Classification::TrustedExternal
        );
    }

    #[test]
    fn test_unknown_external_is_untrusted() {
        assert_eq!(
            classify(&get("https://tracker.example.com/pixel.gif"), &settings()),
            Classification::UntrustedExternal
        );
    }

    #[test]
    fn test_same_origin() {
        assert_eq!(
            classify(&get("http://localhost:8080/js/app.js"), &settings()),
            Classification::SameOrigin
        );
        // a different port is a different origin
        assert_eq!(
            classify(&get("http://localhost:9090/js/app.js"), &settings()),
            Classification::UntrustedExternal
        );
    }

    #[test]
    fn test_api_rule_wins_over_same_origin() {
        let config = WorkerConfig {
            api_domains: vec!["localhost:8080".to_string()],
            ..WorkerConfig::default()
        };
        let s = WorkerSettings::from_config(&config).unwrap();
        assert_eq!(classify(&get("http://localhost:8080/index.html"), &s), Classification::Bypass);
    }

    #[test]
    fn test_interception() {
        assert!(Classification::SameOrigin.is_intercepted());
        assert!(Classification::TrustedExternal.is_intercepted());
        assert!(!Classification::Bypass.is_intercepted());
        assert!(!Classification::UntrustedExternal.is_intercepted());
    }
}
