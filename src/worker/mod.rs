//! Request interception: classification, caching strategies and the
//! install/activate/fetch lifecycle.
//!
//! # Components
//!
//! - `classifier`: Maps a request to Bypass, SameOrigin, TrustedExternal or UntrustedExternal.
//! - `strategy`: Network-first and stale-while-revalidate over the cache store.
//! - `lifecycle`: The controller that precaches, garbage-collects generations and
//!   routes fetch events.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod classifier;
pub mod lifecycle;
pub mod strategy;

pub use classifier::{classify, Classification};
pub use lifecycle::{
    ActivateReport, CacheController, ControllerStatus, FetchOutcome, InstallReport, WorkerLifecycle,
};
pub use strategy::{ResponseSource, Served, StrategyEngine};
