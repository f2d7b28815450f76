// HTTP middleware
// Author: kelexine (https://github.com/kelexine)

use crate::network::headers::via_value;
use crate::utils::logging::sanitize_url;
use axum::extract::Request;
use axum::http::{header, HeaderValue, Uri};
use tracing::Span;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;

/// Create request ID layers for the application
pub fn request_id_layers() -> (SetRequestIdLayer<MakeRequestUuid>, PropagateRequestIdLayer) {
    (
        SetRequestIdLayer::x_request_id(MakeRequestUuid),
        PropagateRequestIdLayer::x_request_id(),
    )
}

/// Stamp every response with a `Via` header naming this proxy, unless
/// upstream already set one.
pub fn via_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::if_not_present(header::VIA, via_value())
}

/// Span for the HTTP trace layer. Bypassed API calls carry keys in their
/// query strings, so the URI is recorded redacted.
pub fn request_span(request: &Request) -> Span {
    tracing::debug_span!(
        "request",
        method = %request.method(),
        uri = %loggable_uri(request.uri()),
        version = ?request.version(),
    )
}

fn loggable_uri(uri: &Uri) -> String {
    sanitize_url(&uri.to_string())
}
