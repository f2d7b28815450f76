//! Axum-based HTTP server hosting the cache layer.
//!
//! This module is the adapter between real HTTP traffic and the
//! `WorkerLifecycle` events: it turns inbound requests into
//! `RequestDescriptor`s, hands them to the controller, and either writes
//! back the produced response or forwards the request untouched.
//!
//! # Components
//!
//! - `handlers`: The interception fallback plus the health and metrics endpoints.
//! - `middleware`: Request ID tracking and the `Via` header.
//! - `routes`: The router configuration that ties everything together.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod handlers;
mod middleware;
mod routes;

pub use handlers::describe_request;
pub use routes::{create_router, AppState, CONTROL_PREFIX};
