//! On-disk snapshots of the cache store.
//!
//! Layout of the snapshot directory:
//!
//! - `state.json`: the active generation name and the list of generation files
//! - `gen-<sha256(name)[..16]>.json`: one file per generation, bodies base64
//!
//! Generation files are written before `state.json`, each through a temporary
//! file and a rename, so a crash mid-save leaves the previous state readable.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::cache::models::Generation;
use crate::cache::store::CacheStore;
use crate::error::{ProxyError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

const STATE_FILE: &str = "state.json";

/// Everything restored from disk at startup.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub active: Option<String>,
    pub generations: HashMap<String, Generation>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    active: Option<String>,
    saved_at: DateTime<Utc>,
    generations: Vec<GenerationRef>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GenerationRef {
    name: String,
    file: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct GenerationFile {
    name: String,
    generation: Generation,
}

/// Reads and writes snapshots in a single directory.
///
/// Clones share one save lock: saves to the same store never interleave
/// their temporary files.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    saving: Arc<Mutex<()>>,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            saving: Arc::new(Mutex::new(())),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for a generation; hashed so any version string is a safe name.
    fn file_name(name: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(name.as_bytes());
        let digest = hex::encode(hasher.finalize());
        format!("gen-{}.json", &digest[..16])
    }

    /// Load the last saved snapshot. `Ok(None)` if nothing was ever saved.
    pub async fn load(&self) -> Result<Option<Snapshot>> {
        let state_path = self.dir.join(STATE_FILE);
        let raw = match tokio::fs::read(&state_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let state: StateFile = serde_json::from_slice(&raw)?;

        let mut generations = HashMap::new();
        for entry in &state.generations {
            let raw = tokio::fs::read(self.dir.join(&entry.file))
                .await
                .map_err(|e| {
                    ProxyError::Storage(format!("generation {} unreadable: {}", entry.name, e))
                })?;
            let file: GenerationFile = serde_json::from_slice(&raw)?;
            if file.name != entry.name {
                return Err(ProxyError::Storage(format!(
                    "{} holds generation {}, expected {}",
                    entry.file, file.name, entry.name
                )));
            }
            generations.insert(file.name, file.generation);
        }

        let active = state.active.filter(|name| generations.contains_key(name));

        info!(
            "Loaded {} cache generation(s) from {} (saved {})",
            generations.len(),
            self.dir.display(),
            state.saved_at.to_rfc3339()
        );

        Ok(Some(Snapshot { active, generations }))
    }

    /// Write every generation in `store` plus the active name, then remove
    /// files of generations that no longer exist.
    pub async fn save(&self, store: &CacheStore, active: Option<&str>) -> Result<()> {
        let _saving = self.saving.lock().await;
        tokio::fs::create_dir_all(&self.dir).await?;

        let generations = store.export();
        let mut refs = Vec::with_capacity(generations.len());
        let mut keep: HashSet<String> = HashSet::new();

        for (name, generation) in generations {
            let file = Self::file_name(&name);
            let payload = serde_json::to_vec(&GenerationFile {
                name: name.clone(),
                generation,
            })?;
            self.write_atomic(&file, &payload).await?;
            keep.insert(file.clone());
            refs.push(GenerationRef { name, file });
        }
        refs.sort_by(|a, b| a.name.cmp(&b.name));

        let state = StateFile {
            active: active.map(str::to_string),
            saved_at: Utc::now(),
            generations: refs,
        };
        self.write_atomic(STATE_FILE, &serde_json::to_vec_pretty(&state)?)
            .await?;

        self.remove_stale(&keep).await?;
        debug!("Saved cache snapshot to {}", self.dir.display());
        Ok(())
    }

    async fn write_atomic(&self, file: &str, payload: &[u8]) -> Result<()> {
        let tmp = self.dir.join(format!("{}.tmp", file));
        tokio::fs::write(&tmp, payload).await?;
        tokio::fs::rename(&tmp, self.dir.join(file)).await?;
        Ok(())
    }

    async fn remove_stale(&self, keep: &HashSet<String>) -> Result<()> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with("gen-") && name.ends_with(".json") && !keep.contains(&name) {
                tokio::fs::remove_file(entry.path()).await?;
                debug!("Removed stale snapshot file {}", name);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RequestKey, StoredResponse};
    use url::Url;

    fn key(path: &str) -> RequestKey {
        RequestKey::get(&Url::parse("http://localhost:8080").unwrap().join(path).unwrap())
    }

    #[test]
    fn test_file_name_is_stable_and_safe() {
        let a = SnapshotStore::file_name("portfolio-v1");
        let b = SnapshotStore::file_name("portfolio-v1");
        assert_eq!(a, b);
        assert_eq!(a.len(), "gen-".len() + 16 + ".json".len());
        assert_ne!(a, SnapshotStore::file_name("../../etc"));
        assert!(!SnapshotStore::file_name("../../etc").contains('/'));
    }

    #[tokio::test]
    async fn test_load_missing_dir_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = SnapshotStore::new(dir.path().join("nothing-here"));
        assert!(snapshots.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = SnapshotStore::new(dir.path());

        let store = CacheStore::new();
        store.open("v1");
        store.put("v1", key("/index.html"), StoredResponse::new(200, vec![], "<html>"));
        snapshots.save(&store, Some("v1")).await.unwrap();

        let snapshot = snapshots.load().await.unwrap().unwrap();
        assert_eq!(snapshot.active.as_deref(), Some("v1"));
        let restored = CacheStore::from_generations(snapshot.generations);
        assert_eq!(
            restored.get("v1", &key("/index.html")).unwrap().body,
            bytes::Bytes::from_static(b"<html>")
        );
    }

    #[tokio::test]
    async fn test_save_removes_deleted_generations() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = SnapshotStore::new(dir.path());

        let store = CacheStore::new();
        store.open("v1");
        store.open("v2");
        snapshots.save(&store, Some("v1")).await.unwrap();

        store.delete("v1");
        snapshots.save(&store, Some("v2")).await.unwrap();

        let stale = dir.path().join(SnapshotStore::file_name("v1"));
        assert!(!stale.exists());

        let snapshot = snapshots.load().await.unwrap().unwrap();
        assert_eq!(snapshot.generations.len(), 1);
        assert!(snapshot.generations.contains_key("v2"));
    }

    #[tokio::test]
    async fn test_overlapping_saves_both_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = SnapshotStore::new(dir.path());

        let store = CacheStore::new();
        store.open("v1");
        store.put("v1", key("/index.html"), StoredResponse::new(200, vec![], "<html>"));

        let other = snapshots.clone();
        let (first, second) = tokio::join!(
            snapshots.save(&store, Some("v1")),
            other.save(&store, Some("v1")),
        );
        first.unwrap();
        second.unwrap();

        let snapshot = snapshots.load().await.unwrap().unwrap();
        assert_eq!(snapshot.active.as_deref(), Some("v1"));
        assert!(snapshot.generations.contains_key("v1"));
        // No temporary files left behind
        let mut entries = std::fs::read_dir(dir.path()).unwrap();
        assert!(entries.all(|e| !e.unwrap().file_name().to_string_lossy().ends_with(".tmp")));
    }
}
