// HTTP request handlers
// Author: kelexine (https://github.com/kelexine)

use super::routes::{AppState, BODY_LIMIT};
use crate::config::WorkerSettings;
use crate::error::{ProxyError, Result};
use crate::models::RequestDescriptor;
use crate::network::headers::has_looped;
use crate::utils::logging::sanitize_url;
use crate::worker::{FetchOutcome, WorkerLifecycle};
use axum::{
    extract::{Request, State},
    http::{header, request::Parts, HeaderValue, Method},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub checks: HashMap<String, HealthCheck>,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: String,
    pub message: String,
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut checks = HashMap::new();
    let status = state.controller.status();

    // Is the current build's generation the one in control?
    let (overall_status, generation_check) = match &status.active {
        Some(active) if *active == status.version => (
            HealthStatus::Healthy,
            HealthCheck {
                status: "ok".to_string(),
                message: format!("Generation {} is active", active),
            },
        ),
        Some(active) => (
            HealthStatus::Degraded,
            HealthCheck {
                status: "warning".to_string(),
                message: format!(
                    "Serving from {} while {} is not installed",
                    active, status.version
                ),
            },
        ),
        None => (
            HealthStatus::Unhealthy,
            HealthCheck {
                status: "error".to_string(),
                message: "No active generation, all requests pass through".to_string(),
            },
        ),
    };
    checks.insert("active_generation".to_string(), generation_check);

    let generations: Vec<String> = status
        .cache
        .generations
        .iter()
        .map(|g| format!("{} ({} entries, {} bytes)", g.name, g.entries, g.bytes))
        .collect();
    checks.insert(
        "cache_store".to_string(),
        HealthCheck {
            status: "ok".to_string(),
            message: format!(
                "{}; hits={} misses={}",
                if generations.is_empty() { "empty".to_string() } else { generations.join(", ") },
                status.cache.hits,
                status.cache.misses
            ),
        },
    );

    checks.insert(
        "configuration".to_string(),
        HealthCheck {
            status: "ok".to_string(),
            message: format!(
                "Origin: {}, upstream: {}",
                state.controller.settings().origin(),
                state
                    .config
                    .worker
                    .upstream_origin
                    .as_deref()
                    .unwrap_or("(same as origin)")
            ),
        },
    );

    Json(HealthResponse {
        status: overall_status,
        checks,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::gather_metrics(),
    )
}

/// Build the descriptor for an inbound request.
///
/// Absolute-form targets (forward-proxy style) keep their URL; origin-form
/// targets are resolved against the app origin.
pub fn describe_request(parts: &Parts, settings: &WorkerSettings) -> Result<RequestDescriptor> {
    let uri = &parts.uri;
    let url = if uri.scheme().is_some() && uri.authority().is_some() {
        Url::parse(&uri.to_string())?
    } else {
        let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
        settings.resolve(path)?
    };

    Ok(RequestDescriptor::new(
        parts.method.clone(),
        url,
        parts.headers.clone(),
    ))
}

/// Fallback handler: every request that is not a control route is a fetch
/// event for the cache layer.
pub async fn intercept_handler(
    State(state): State<AppState>,
    request: Request,
) -> std::result::Result<Response, ProxyError> {
    use tracing::warn;

    let (parts, body) = request.into_parts();

    if parts.method == Method::CONNECT {
        return Err(ProxyError::InvalidRequest(
            "CONNECT tunnels are not supported".to_string(),
        ));
    }

    // Our own request came back: the upstream routes to this proxy
    if has_looped(&parts.headers) {
        let target = sanitize_url(&parts.uri.to_string());
        warn!("Refusing looped request for {}", target);
        return Err(ProxyError::LoopDetected(target));
    }

    let descriptor = describe_request(&parts, state.controller.settings())?;

    match state.controller.on_fetch(descriptor.clone()).await {
        FetchOutcome::Respond(served) => {
            // Dropping `served` detaches any background revalidation
            let source = served.source;
            let mut response = served.response.into_response();
            response
                .headers_mut()
                .insert("x-edge-source", HeaderValue::from_static(source.label()));
            Ok(response)
        }
        FetchOutcome::Passthrough => {
            let body = axum::body::to_bytes(body, BODY_LIMIT)
                .await
                .map_err(|e| ProxyError::InvalidRequest(format!("unreadable body: {}", e)))?;

            state.fetcher.forward(&descriptor, body).await.map_err(|e| {
                warn!("Passthrough failed: {}", e);
                e
            })
        }
    }
}
