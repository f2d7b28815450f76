//! Immutable description of an intercepted request.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use axum::http::{header, HeaderMap, HeaderValue, Method};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Cache key for a request: method plus absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestKey(String);

impl RequestKey {
    pub fn new(method: &Method, url: &Url) -> Self {
        Self(format!("{} {}", method.as_str(), url.as_str()))
    }

    /// Key for a GET of `url`, the only kind ever stored.
    pub fn get(url: &Url) -> Self {
        Self::new(&Method::GET, url)
    }

    pub fn is_get(&self) -> bool {
        self.0.starts_with("GET ")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Method, URL and headers of one intercepted request.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    url: Url,
    headers: HeaderMap,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: Url, headers: HeaderMap) -> Self {
        Self {
            method,
            url,
            headers,
        }
    }

    /// A bare GET with no headers.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url, HeaderMap::new())
    }

    /// Same request with an `Accept` header. Invalid header values are ignored.
    pub fn with_accept(mut self, accept: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(accept) {
            self.headers.insert(header::ACCEPT, value);
        }
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }

    /// Serialized origin (`scheme://host[:port]`).
    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    /// Lowercase host, with the port appended when it is explicit.
    pub fn host(&self) -> String {
        let host = self.url.host_str().unwrap_or_default().to_ascii_lowercase();
        match self.url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host,
        }
    }

    pub fn accept(&self) -> Option<&str> {
        self.headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
    }

    /// Whether the request is a page navigation asking for HTML.
    pub fn accepts_html(&self) -> bool {
        self.accept()
            .map(|a| a.to_ascii_lowercase().contains("text/html"))
            .unwrap_or(false)
    }

    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.method, &self.url)
    }
}
