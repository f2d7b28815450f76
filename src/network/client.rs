// reqwest-backed network access
// Author: kelexine (https://github.com/kelexine)

use super::headers::{
    cacheable_request_headers, forwardable_request_headers, forwardable_response_headers,
    storable_response_headers, via_value,
};
use super::Fetcher;
use crate::config::{NetworkConfig, WorkerSettings};
use crate::error::{ProxyError, Result};
use crate::models::{RequestDescriptor, StoredResponse};
use crate::utils::logging::sanitize_url;
use axum::body::Body;
use axum::response::Response;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// HTTP client used both for cacheable fetches and for passthrough forwarding.
///
/// Same-origin URLs are rewritten to the configured upstream origin before
/// they hit the wire; the rest of the cache layer only ever sees public URLs.
#[derive(Clone)]
pub struct HttpFetcher {
    http_client: Client,
    app_origin: String,
    upstream_origin: Option<Url>,
}

impl HttpFetcher {
    pub fn new(config: &NetworkConfig, settings: &WorkerSettings) -> Result<Self> {
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .tcp_nodelay(true)
            .user_agent(config.user_agent.clone())
            // Redirects are the page's business, not ours
            .redirect(reqwest::redirect::Policy::none())
            .use_rustls_tls();

        if let Some(secs) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let http_client = builder
            .build()
            .map_err(|e| ProxyError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        debug!("Created HTTP client with connection pooling and keep-alive");

        Ok(Self {
            http_client,
            app_origin: settings.origin(),
            upstream_origin: settings.upstream_origin().cloned(),
        })
    }

    /// Where a request for `url` is actually sent.
    pub fn target_url(&self, url: &Url) -> Url {
        let upstream = match &self.upstream_origin {
            Some(upstream) if url.origin().ascii_serialization() == self.app_origin => upstream,
            _ => return url.clone(),
        };

        let mut target = url.clone();
        // Both origins were validated as http(s) URLs with a host
        let _ = target.set_scheme(upstream.scheme());
        let _ = target.set_host(upstream.host_str());
        let _ = target.set_port(upstream.port());
        target
    }

    /// Forward a request untouched and stream the upstream response back.
    pub async fn forward(&self, request: &RequestDescriptor, body: Bytes) -> Result<Response> {
        let target = self.target_url(request.url());
        debug!("Passthrough {} {}", request.method(), sanitize_url(target.as_str()));

        let upstream = self
            .http_client
            .request(request.method().clone(), target)
            .headers(forwardable_request_headers(request.headers()))
            .header(reqwest::header::VIA, via_value())
            .body(body)
            .send()
            .await
            .map_err(|e| ProxyError::Network(e.to_string()))?;

        let status = upstream.status();
        let headers = forwardable_response_headers(upstream.headers());

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<StoredResponse> {
        let target = self.target_url(request.url());
        debug!("Fetching {}", sanitize_url(target.as_str()));

        let response = self
            .http_client
            .get(target)
            .headers(cacheable_request_headers(request.headers()))
            .header(reqwest::header::VIA, via_value())
            .send()
            .await
            .map_err(|e| ProxyError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = storable_response_headers(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| ProxyError::Network(format!("body read failed: {}", e)))?;

        Ok(StoredResponse::new(status, headers, body))
    }
}
