//! Structured logging and URL redaction utilities.
//!
//! This module configures the `tracing` ecosystem for the application,
//! supporting multiple output formats and providing a helper that keeps API
//! keys carried in query strings out of the logs.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::config::LoggingConfig;
use crate::error::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Query parameters whose values are replaced before a URL is logged.
const SECRET_PARAMS: [&str; 6] = ["key", "apikey", "api_key", "token", "access_token", "secret"];

static SANITIZE: AtomicBool = AtomicBool::new(true);

/// Initializes the global tracing subscriber for the application.
///
/// Supports three output formats:
/// - `json`: Structured JSON logs for production ingestion.
/// - `compact`: Single-line output.
/// - `pretty` (default): Human-readable, colorized output for development.
///
/// Log levels are controlled via the `RUST_LOG` environment variable or
/// the provided `LoggingConfig`.
pub fn init(config: &LoggingConfig) -> Result<()> {
    SANITIZE.store(config.sanitize_urls, Ordering::Relaxed);

    // Configure filter from environment or config file
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        "compact" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().compact())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

/// Redacts secret-bearing query parameters from a URL for logging.
///
/// Quote and AI providers take their API key as `?key=...` or `?token=...`,
/// and those requests are logged on every passthrough. Values of the
/// parameters in `SECRET_PARAMS` become `[REDACTED]`; everything else is
/// left as is. Disabled when `logging.sanitize_urls` is false.
pub fn sanitize_url(input: &str) -> String {
    if !SANITIZE.load(Ordering::Relaxed) {
        return input.to_string();
    }
    redact_query(input)
}

fn redact_query(input: &str) -> String {
    let Some((base, rest)) = input.split_once('?') else {
        return input.to_string();
    };
    let (query, fragment) = match rest.split_once('#') {
        Some((q, f)) => (q, Some(f)),
        None => (rest, None),
    };

    let redacted: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, _)) if SECRET_PARAMS.contains(&name.to_ascii_lowercase().as_str()) => {
                format!("{}=[REDACTED]", name)
            }
            _ => pair.to_string(),
        })
        .collect();

    let mut result = format!("{}?{}", base, redacted.join("&"));
    if let Some(fragment) = fragment {
        result.push('#');
        result.push_str(fragment);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_api_key() {
        let input = "https://generativelanguage.googleapis.com/v1beta/models/x:generateContent?key=AIzaSyD-secret";
        let output = redact_query(input);
        assert!(output.ends_with("?key=[REDACTED]"));
        assert!(!output.contains("AIzaSyD-secret"));
    }

    #[test]
    fn test_redact_keeps_other_params() {
        let input = "https://finnhub.io/api/v1/quote?symbol=AAPL&token=abc123#top";
        let output = redact_query(input);
        assert_eq!(output, "https://finnhub.io/api/v1/quote?symbol=AAPL&token=[REDACTED]#top");
    }

    #[test]
    fn test_redact_without_query() {
        let input = "http://localhost:8080/index.html";
        assert_eq!(redact_query(input), input);
    }
}
