// Lifecycle controller - install, activate and fetch handling
// Author: kelexine (https://github.com/kelexine)

use super::classifier::{classify, Classification};
use super::strategy::{Served, StrategyEngine};
use crate::cache::{CacheStats, CacheStore, Snapshot, SnapshotStore};
use crate::config::WorkerSettings;
use crate::error::{ProxyError, Result};
use crate::metrics;
use crate::models::{RequestDescriptor, RequestKey, StoredResponse};
use crate::network::Fetcher;
use crate::utils::logging::sanitize_url;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub version: String,
    pub entries: usize,
    /// Activate right away instead of waiting for open pages to go away.
    pub skip_waiting: bool,
}

/// Result of a successful activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivateReport {
    pub version: String,
    /// Generations garbage-collected by this activation, sorted.
    pub removed: Vec<String>,
}

/// What the hosting adapter should do with an intercepted request.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Not intercepted: hand the request to the network untouched.
    Passthrough,
    /// Answer with this response.
    Respond(Served),
}

/// The three events a hosting runtime delivers to the cache layer.
#[async_trait::async_trait]
pub trait WorkerLifecycle: Send + Sync {
    /// Precache the manifest into the current version's generation.
    async fn on_install(&self) -> Result<InstallReport>;

    /// Drop every other generation and start controlling requests.
    async fn on_activate(&self) -> Result<ActivateReport>;

    /// Decide how to answer one request. Never fails.
    async fn on_fetch(&self, request: RequestDescriptor) -> FetchOutcome;
}

/// Point-in-time view of the controller, for health reporting.
#[derive(Debug, Clone)]
pub struct ControllerStatus {
    pub version: String,
    pub active: Option<String>,
    pub cache: CacheStats,
}

/// Owns the cache store and drives the worker lifecycle for one deployed
/// version.
pub struct CacheController {
    settings: Arc<WorkerSettings>,
    store: Arc<CacheStore>,
    fetcher: Arc<dyn Fetcher>,
    engine: StrategyEngine,
    /// Generation that currently controls requests; `None` until the first activation.
    active: RwLock<Option<String>>,
    installing: Mutex<()>,
    snapshots: Option<SnapshotStore>,
}

impl CacheController {
    /// Controller over an empty store
    pub fn new(settings: Arc<WorkerSettings>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self::from_snapshot(settings, fetcher, Snapshot::default())
    }

    /// Controller resuming from previously saved generations
    pub fn from_snapshot(
        settings: Arc<WorkerSettings>,
        fetcher: Arc<dyn Fetcher>,
        snapshot: Snapshot,
    ) -> Self {
        let store = Arc::new(CacheStore::from_generations(snapshot.generations));
        let engine = StrategyEngine::new(
            Arc::clone(&settings),
            Arc::clone(&store),
            Arc::clone(&fetcher),
        );

        Self {
            settings,
            store,
            fetcher,
            engine,
            active: RwLock::new(snapshot.active),
            installing: Mutex::new(()),
            snapshots: None,
        }
    }

    /// Persist generations through `snapshots` after activation and on `persist`
    pub fn with_snapshots(mut self, snapshots: SnapshotStore) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    pub fn settings(&self) -> &Arc<WorkerSettings> {
        &self.settings
    }

    pub fn active_generation(&self) -> Option<String> {
        self.active.read().clone()
    }

    pub fn status(&self) -> ControllerStatus {
        ControllerStatus {
            version: self.settings.cache_version().to_string(),
            active: self.active_generation(),
            cache: self.store.stats(),
        }
    }

    /// Save the store and the active generation, if snapshots are configured
    pub async fn persist(&self) -> Result<()> {
        match &self.snapshots {
            Some(snapshots) => {
                let active = self.active_generation();
                snapshots.save(&self.store, active.as_deref()).await
            }
            None => Ok(()),
        }
    }

    /// Fetch one manifest entry; anything but a 2xx answer fails the install.
    async fn precache_entry(&self, path: &str) -> Result<(RequestKey, StoredResponse)> {
        let failure = |reason: String| ProxyError::PrecacheFailure {
            path: path.to_string(),
            reason,
        };

        let url = self.settings.resolve(path).map_err(|e| failure(e.to_string()))?;
        let request = RequestDescriptor::get(url);

        let response = self.fetcher.fetch(&request).await.map_err(|e| {
            metrics::record_precache_fetch(false);
            failure(e.to_string())
        })?;

        if !response.is_ok() {
            metrics::record_precache_fetch(false);
            return Err(failure(format!("HTTP {}", response.status)));
        }

        metrics::record_precache_fetch(true);
        debug!("Precached {} ({} bytes)", path, response.size());
        Ok((request.key(), response))
    }
}

#[async_trait::async_trait]
impl WorkerLifecycle for CacheController {
    async fn on_install(&self) -> Result<InstallReport> {
        let _guard = self
            .installing
            .try_lock()
            .map_err(|_| ProxyError::InstallInProgress)?;

        let version = self.settings.cache_version().to_string();
        info!(
            "Installing generation {} ({} manifest entries)",
            version,
            self.settings.precache().len()
        );

        // Entries are staged off to the side; the store only sees them once
        // every fetch has succeeded.
        let fetches = self
            .settings
            .precache()
            .iter()
            .map(|path| self.precache_entry(path));

        let entries: HashMap<RequestKey, StoredResponse> =
            match futures::future::try_join_all(fetches).await {
                Ok(entries) => entries.into_iter().collect(),
                Err(e) => {
                    error!("Install of {} failed: {}", version, e);
                    metrics::record_lifecycle("install", false);
                    return Err(e);
                }
            };

        let count = entries.len();
        self.store.commit(&version, entries);
        metrics::record_lifecycle("install", true);
        metrics::update_cache_entries(&self.store.stats());
        info!("Installed generation {} with {} entries", version, count);

        Ok(InstallReport {
            version,
            entries: count,
            skip_waiting: true,
        })
    }

    async fn on_activate(&self) -> Result<ActivateReport> {
        let version = self.settings.cache_version().to_string();

        if !self.store.has(&version) {
            metrics::record_lifecycle("activate", false);
            return Err(ProxyError::NotInstalled(version));
        }

        let removed: Vec<String> = self
            .store
            .names()
            .into_iter()
            .filter(|name| *name != version)
            .filter(|name| self.store.delete(name))
            .collect();

        // Claim: requests from already-open pages now go through this generation
        *self.active.write() = Some(version.clone());

        metrics::record_lifecycle("activate", true);
        metrics::update_cache_entries(&self.store.stats());
        info!(
            "Activated generation {} (removed: {})",
            version,
            if removed.is_empty() { "none".to_string() } else { removed.join(", ") }
        );

        if let Err(e) = self.persist().await {
            warn!("Failed to save cache snapshot after activation: {}", e);
        }

        Ok(ActivateReport { version, removed })
    }

    async fn on_fetch(&self, request: RequestDescriptor) -> FetchOutcome {
        let Some(generation) = self.active_generation() else {
            metrics::record_fetch_event("uncontrolled");
            return FetchOutcome::Passthrough;
        };

        let classification = classify(&request, &self.settings);
        metrics::record_fetch_event(classification.label());
        debug!(
            "{} {} -> {}",
            request.method(),
            sanitize_url(request.url().as_str()),
            classification
        );

        let started = Instant::now();
        let (strategy, served) = match classification {
            Classification::Bypass | Classification::UntrustedExternal => {
                return FetchOutcome::Passthrough;
            }
            Classification::TrustedExternal => (
                "network_first",
                self.engine.network_first(&generation, &request).await,
            ),
            Classification::SameOrigin => (
                "stale_while_revalidate",
                self.engine.stale_while_revalidate(&generation, &request).await,
            ),
        };

        metrics::record_response(
            strategy,
            served.source.label(),
            started.elapsed().as_secs_f64(),
        );
        FetchOutcome::Respond(served)
    }
}
