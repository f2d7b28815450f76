// Error types for the folio-edge caching proxy
// Author: kelexine (https://github.com/kelexine)

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Precache failed for {path}: {reason}")]
    PrecacheFailure { path: String, reason: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("An install is already in progress")]
    InstallInProgress,

    #[error("Generation {0} has not been installed")]
    NotInstalled(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request loop detected: {0}")]
    LoopDetected(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

// Convert ProxyError to HTTP responses for Axum
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ProxyError::InvalidRequest(_) | ProxyError::Url(_) => {
                (StatusCode::BAD_REQUEST, "invalid_request_error", self.to_string())
            }
            ProxyError::Config(_) | ProxyError::ConfigParsing(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error", self.to_string())
            }
            ProxyError::LoopDetected(_) => {
                (StatusCode::LOOP_DETECTED, "loop_detected_error", self.to_string())
            }
            ProxyError::Network(_) | ProxyError::Http(_) => {
                (StatusCode::BAD_GATEWAY, "network_error", self.to_string())
            }
            ProxyError::PrecacheFailure { .. }
            | ProxyError::InstallInProgress
            | ProxyError::NotInstalled(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "lifecycle_error", self.to_string())
            }
            ProxyError::Storage(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", self.to_string())
            }
            _ => {
                (StatusCode::INTERNAL_SERVER_ERROR, "api_error", self.to_string())
            }
        };

        let body = json!({
            "type": "error",
            "error": {
                "type": error_type,
                "message": message,
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
