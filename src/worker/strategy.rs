// Strategy engine - network-first and stale-while-revalidate over the cache store
// Author: kelexine (https://github.com/kelexine)

use crate::cache::CacheStore;
use crate::config::WorkerSettings;
use crate::metrics;
use crate::models::{RequestDescriptor, RequestKey, StoredResponse};
use crate::network::Fetcher;
use crate::utils::logging::sanitize_url;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
    AppShell,
    Offline,
}

impl ResponseSource {
    pub fn label(&self) -> &'static str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Cache => "cache",
            ResponseSource::AppShell => "app_shell",
            ResponseSource::Offline => "offline",
        }
    }
}

/// A response produced by a strategy.
#[derive(Debug)]
pub struct Served {
    pub response: StoredResponse,
    pub source: ResponseSource,
    revalidation: Option<JoinHandle<()>>,
}

impl Served {
    fn new(response: StoredResponse, source: ResponseSource) -> Self {
        Self {
            response,
            source,
            revalidation: None,
        }
    }

    fn offline() -> Self {
        Self::new(StoredResponse::offline(), ResponseSource::Offline)
    }

    /// Handle of the background refresh spawned on a stale-while-revalidate
    /// hit. Dropping it leaves the refresh running; awaiting it is only
    /// useful for observing the cache afterwards.
    pub fn take_revalidation(&mut self) -> Option<JoinHandle<()>> {
        self.revalidation.take()
    }
}

/// Executes caching strategies against one generation of the store.
///
/// No strategy ever returns an error: every path ends in a cached response,
/// a network response, the app shell, or the synthetic `503 Offline`.
#[derive(Clone)]
pub struct StrategyEngine {
    settings: Arc<WorkerSettings>,
    store: Arc<CacheStore>,
    fetcher: Arc<dyn Fetcher>,
}

impl StrategyEngine {
    pub fn new(
        settings: Arc<WorkerSettings>,
        store: Arc<CacheStore>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            settings,
            store,
            fetcher,
        }
    }

    /// Network first; a cached copy only when the network cannot deliver.
    ///
    /// A 2xx answer is stored and returned. On a fetch error or a non-2xx
    /// answer the cached entry is returned if there is one, and `503 Offline`
    /// otherwise.
    pub async fn network_first(&self, generation: &str, request: &RequestDescriptor) -> Served {
        let key = request.key();

        if let Some(response) = self.fetch_ok(request).await {
            self.store.put(generation, key, response.clone());
            return Served::new(response, ResponseSource::Network);
        }

        match self.store.get(generation, &key) {
            Some(cached) => Served::new(cached, ResponseSource::Cache),
            None => Served::offline(),
        }
    }

    /// Cache first, refreshed in the background.
    ///
    /// A cached entry is returned at once and a detached task refetches it;
    /// a 2xx refetch overwrites the entry, anything else is dropped and the
    /// old entry stays. On a miss the network answers; a 2xx answer is stored.
    /// If the network cannot deliver, HTML navigations get the cached app
    /// shell and everything else gets `503 Offline`.
    pub async fn stale_while_revalidate(
        &self,
        generation: &str,
        request: &RequestDescriptor,
    ) -> Served {
        let key = request.key();

        if let Some(cached) = self.store.get(generation, &key) {
            let mut served = Served::new(cached, ResponseSource::Cache);
            served.revalidation = Some(self.revalidate(generation, request));
            return served;
        }

        if let Some(response) = self.fetch_ok(request).await {
            self.store.put(generation, key, response.clone());
            return Served::new(response, ResponseSource::Network);
        }

        if request.accepts_html() {
            if let Some(shell) = self.app_shell(generation) {
                return Served::new(shell, ResponseSource::AppShell);
            }
        }

        Served::offline()
    }

    /// Fetch from the network, keeping only a 2xx answer. A rejected fetch
    /// and a non-2xx answer are the same failure to every strategy.
    async fn fetch_ok(&self, request: &RequestDescriptor) -> Option<StoredResponse> {
        let url = sanitize_url(request.url().as_str());
        match self.fetcher.fetch(request).await {
            Ok(response) if response.is_ok() => Some(response),
            Ok(response) => {
                debug!("Network returned {} for {}", response.status, url);
                None
            }
            Err(e) => {
                debug!("Network failed for {}: {}", url, e);
                None
            }
        }
    }

    /// Spawn the one-way background refresh for a cache hit. Its outcome is
    /// only ever visible through the cache; nothing reports back to the
    /// request that triggered it.
    fn revalidate(&self, generation: &str, request: &RequestDescriptor) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let fetcher = Arc::clone(&self.fetcher);
        let generation = generation.to_string();
        let request = request.clone();

        tokio::spawn(async move {
            let url = sanitize_url(request.url().as_str());
            match fetcher.fetch(&request).await {
                Ok(response) if response.is_ok() => {
                    let written = store.put(&generation, request.key(), response);
                    debug!("Revalidated {} (written: {})", url, written);
                    metrics::record_revalidation(written);
                }
                Ok(response) => {
                    debug!("Revalidation of {} got {}, keeping cached copy", url, response.status);
                    metrics::record_revalidation(false);
                }
                Err(e) => {
                    debug!("Revalidation of {} failed, keeping cached copy: {}", url, e);
                    metrics::record_revalidation(false);
                }
            }
        })
    }

    fn app_shell(&self, generation: &str) -> Option<StoredResponse> {
        match self.settings.app_shell_url() {
            Ok(url) => self.store.get(generation, &RequestKey::get(&url)),
            Err(e) => {
                warn!("App shell path is not a valid URL: {}", e);
                None
            }
        }
    }
}
