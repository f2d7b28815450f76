//! Cache generation and statistics models.

// Author: kelexine (https://github.com/kelexine)

use crate::models::{RequestKey, StoredResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A named, versioned set of cached request/response pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generation {
    /// When the generation was created or committed.
    pub created_at: DateTime<Utc>,
    /// Stored responses keyed by method + URL.
    pub entries: HashMap<RequestKey, StoredResponse>,
}

impl Generation {
    pub fn new() -> Self {
        Self::with_entries(HashMap::new())
    }

    pub fn with_entries(entries: HashMap<RequestKey, StoredResponse>) -> Self {
        Self {
            created_at: Utc::now(),
            entries,
        }
    }

    /// Total body bytes held by this generation.
    pub fn bytes(&self) -> usize {
        self.entries.values().map(StoredResponse::size).sum()
    }
}

impl Default for Generation {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of one generation, as reported by `CacheStore::stats`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationStats {
    pub name: String,
    pub entries: usize,
    pub bytes: usize,
    pub created_at: DateTime<Utc>,
}

/// Statistics for cache operations.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of lookups that found an entry.
    pub hits: u64,
    /// Number of lookups that found nothing.
    pub misses: u64,
    /// Number of entries written outside of install commits.
    pub writes: u64,
    /// Per-generation summaries, sorted by name.
    pub generations: Vec<GenerationStats>,
}
