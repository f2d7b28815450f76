// HTTP routes configuration
// Author: kelexine (https://github.com/kelexine)

use super::handlers::{health_handler, intercept_handler, metrics_handler};
use super::middleware::{request_id_layers, request_span, via_layer};
use crate::config::AppConfig;
use crate::error::Result;
use crate::network::HttpFetcher;
use crate::worker::CacheController;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Paths under this prefix are answered by the proxy itself and never
/// reach the cache layer.
pub const CONTROL_PREFIX: &str = "/__edge";

/// Largest request body forwarded on a passthrough.
pub(super) const BODY_LIMIT: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub controller: Arc<CacheController>,
    pub fetcher: HttpFetcher,
}

pub fn create_router(
    config: AppConfig,
    controller: Arc<CacheController>,
    fetcher: HttpFetcher,
) -> Result<Router> {
    let state = AppState {
        config,
        controller,
        fetcher,
    };

    let (set_request_id, propagate_request_id) = request_id_layers();

    let app = Router::new()
        .route(&format!("{}/health", CONTROL_PREFIX), get(health_handler))
        .route(&format!("{}/metrics", CONTROL_PREFIX), get(metrics_handler))
        // Everything else is an intercepted fetch
        .fallback(intercept_handler)
        .layer(tower_http::limit::RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(via_layer())
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(propagate_request_id)
        .layer(set_request_id)
        .with_state(state);

    Ok(app)
}
