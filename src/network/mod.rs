// Network access for the cache layer
// Author: kelexine (https://github.com/kelexine)

mod client;
pub mod headers;

pub use client::HttpFetcher;

use crate::error::Result;
use crate::models::{RequestDescriptor, StoredResponse};

/// The network as seen by the strategy engine.
///
/// A non-2xx answer is still `Ok`; `Err` means the fetch itself failed
/// (connection refused, DNS, reset, ...). Callers decide what counts as usable.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a GET request and buffer the full response.
    async fn fetch(&self, request: &RequestDescriptor) -> Result<StoredResponse>;
}
