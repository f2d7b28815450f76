// Cache store - owns the named cache generations
// Author: kelexine (https://github.com/kelexine)

use crate::cache::models::{CacheStats, Generation, GenerationStats};
use crate::models::{RequestKey, StoredResponse};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// In-memory collection of named cache generations.
///
/// Every operation takes the lock for the duration of a single map access, so
/// overlapping handlers never observe a half-written entry; concurrent writes
/// to the same key resolve last-write-wins.
#[derive(Default)]
pub struct CacheStore {
    generations: RwLock<HashMap<String, Generation>>,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
}

impl CacheStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from previously saved generations
    pub fn from_generations(generations: HashMap<String, Generation>) -> Self {
        Self {
            generations: RwLock::new(generations),
            ..Self::default()
        }
    }

    /// Create the generation if it does not exist yet.
    /// Returns `true` when a new generation was created.
    pub fn open(&self, name: &str) -> bool {
        let mut generations = self.generations.write();
        if generations.contains_key(name) {
            return false;
        }
        generations.insert(name.to_string(), Generation::new());
        debug!("Opened cache generation {}", name);
        true
    }

    pub fn has(&self, name: &str) -> bool {
        self.generations.read().contains_key(name)
    }

    /// Generation names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.generations.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Remove a generation and everything in it
    pub fn delete(&self, name: &str) -> bool {
        let removed = self.generations.write().remove(name).is_some();
        if removed {
            debug!("Deleted cache generation {}", name);
        }
        removed
    }

    /// Look up a stored response
    pub fn get(&self, name: &str, key: &RequestKey) -> Option<StoredResponse> {
        let found = self
            .generations
            .read()
            .get(name)
            .and_then(|g| g.entries.get(key))
            .cloned();

        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store a response, replacing any previous entry for the key.
    ///
    /// Only GET keys are accepted, and only into a generation that already
    /// exists: a write that races a deletion must not bring the generation
    /// back. Returns whether the entry was written.
    pub fn put(&self, name: &str, key: RequestKey, response: StoredResponse) -> bool {
        if !key.is_get() {
            debug!("Refusing to cache non-GET key {}", key);
            return false;
        }

        let mut generations = self.generations.write();
        match generations.get_mut(name) {
            Some(generation) => {
                generation.entries.insert(key, response);
                self.writes.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => {
                debug!("Dropping write for {}: generation {} is gone", key, name);
                false
            }
        }
    }

    /// Install a fully-built generation in one step, replacing any existing
    /// generation with the same name.
    pub fn commit(&self, name: &str, entries: HashMap<RequestKey, StoredResponse>) {
        let count = entries.len();
        self.generations
            .write()
            .insert(name.to_string(), Generation::with_entries(entries));
        debug!("Committed generation {} with {} entries", name, count);
    }

    /// Copy of every generation, for snapshotting
    pub fn export(&self) -> HashMap<String, Generation> {
        self.generations.read().clone()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let mut generations: Vec<GenerationStats> = self
            .generations
            .read()
            .iter()
            .map(|(name, g)| GenerationStats {
                name: name.clone(),
                entries: g.entries.len(),
                bytes: g.bytes(),
                created_at: g.created_at,
            })
            .collect();
        generations.sort_by(|a, b| a.name.cmp(&b.name));

        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            generations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;
    use url::Url;

    fn key(path: &str) -> RequestKey {
        RequestKey::get(&Url::parse("http://localhost:8080").unwrap().join(path).unwrap())
    }

    fn body(text: &'static str) -> StoredResponse {
        StoredResponse::new(200, vec![], text)
    }

    #[test]
    fn test_open_is_idempotent() {
        let store = CacheStore::new();
        assert!(store.open("v1"));
        assert!(!store.open("v1"));
        assert_eq!(store.names(), vec!["v1".to_string()]);
    }

    #[test]
    fn test_put_and_get() {
        let store = CacheStore::new();
        store.open("v1");
        assert!(store.put("v1", key("/app.js"), body("one")));
        assert!(store.put("v1", key("/app.js"), body("two")));

        assert_eq!(store.get("v1", &key("/app.js")), Some(body("two")));
        assert_eq!(store.get("v1", &key("/missing.js")), None);

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.writes, 2);
    }

    #[test]
    fn test_put_rejects_non_get() {
        let store = CacheStore::new();
        store.open("v1");
        let url = Url::parse("http://localhost:8080/api/portfolios").unwrap();
        assert!(!store.put("v1", RequestKey::new(&Method::POST, &url), body("x")));
        assert_eq!(store.stats().generations[0].entries, 0);
    }

    #[test]
    fn test_put_does_not_resurrect_deleted_generation() {
        let store = CacheStore::new();
        store.open("v1");
        assert!(store.delete("v1"));
        assert!(!store.put("v1", key("/late.js"), body("late")));
        assert!(!store.has("v1"));
    }

    #[test]
    fn test_commit_replaces_generation() {
        let store = CacheStore::new();
        store.open("v2");
        store.put("v2", key("/stale.js"), body("stale"));

        let mut entries = HashMap::new();
        entries.insert(key("/index.html"), body("<html>"));
        store.commit("v2", entries);

        assert_eq!(store.get("v2", &key("/stale.js")), None);
        assert_eq!(store.get("v2", &key("/index.html")), Some(body("<html>")));
    }

    #[test]
    fn test_stats_are_sorted() {
        let store = CacheStore::new();
        store.open("v2");
        store.open("v1");
        store.put("v1", key("/a"), body("abc"));

        let stats = store.stats();
        assert_eq!(stats.generations[0].name, "v1");
        assert_eq!(stats.generations[0].bytes, 3);
        assert_eq!(stats.generations[1].name, "v2");
    }
}
