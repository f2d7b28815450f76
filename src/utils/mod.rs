//! Utility functions and helpers for folio-edge.
//!
//! # Submodules
//!
//! - `logging`: Tracing initialization and URL redaction for logs.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod logging;
