//! Header filtering between the page, the cache and upstream.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

/// Connection-scoped headers that must not be forwarded or stored.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    HeaderName::from_static("keep-alive"),
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(name) || name == HeaderName::from_static("proxy-connection")
}

/// Name this proxy records in `Via`, on responses it serves and on requests
/// it sends upstream.
pub const VIA_PSEUDONYM: &str = "folio-edge";

pub fn via_value() -> HeaderValue {
    HeaderValue::from_static(concat!("1.1 folio-edge/", env!("CARGO_PKG_VERSION")))
}

/// Whether a request already went through this proxy once, i.e. the
/// upstream it was sent to routes back here.
pub fn has_looped(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::VIA)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|hop| hop.split_whitespace().nth(1))
        .any(|received_by| received_by.split('/').next() == Some(VIA_PSEUDONYM))
}

/// Request headers forwarded on a passthrough.
pub fn forwardable_request_headers(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .filter(|(name, _)| !is_hop_by_hop(name) && *name != header::HOST)
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Request headers sent when the response may end up in the cache.
///
/// `Accept-Encoding` is dropped so stored bodies are never compressed for
/// one client's preferences, and conditional headers are dropped so upstream
/// always answers with a full body.
pub fn cacheable_request_headers(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .filter(|(name, _)| {
            !is_hop_by_hop(name)
                && *name != header::HOST
                && *name != header::ACCEPT_ENCODING
                && *name != header::IF_NONE_MATCH
                && *name != header::IF_MODIFIED_SINCE
                && *name != header::RANGE
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Response headers kept on a response handed back to the page.
pub fn forwardable_response_headers(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .filter(|(name, _)| !is_hop_by_hop(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Response headers kept on a stored response. Content length is recomputed
/// from the buffered body when the entry is served.
pub fn storable_response_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter(|(name, _)| !is_hop_by_hop(name) && **name != header::CONTENT_LENGTH)
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}
