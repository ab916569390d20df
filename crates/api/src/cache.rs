use dashmap::DashMap;
use enrich::EnrichedGraph;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Enrichment results keyed by a hash of the request that produced them.
/// Snapshots never change once computed, so entries never go stale.
pub struct EnrichmentCache {
    graphs: DashMap<String, Arc<EnrichedGraph>>,
    max_entries: usize,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl EnrichmentCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            graphs: DashMap::new(),
            max_entries,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Stable key for any serializable request body.
    pub fn key_for<T: Serialize>(request: &T) -> Option<String> {
        let bytes = serde_json::to_vec(request).ok()?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Some(hex::encode(hasher.finalize()))
    }

    pub fn get(&self, key: &str) -> Option<Arc<EnrichedGraph>> {
        match self.graphs.get(key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(entry.value()))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, key: String, graph: Arc<EnrichedGraph>) {
        if self.graphs.len() >= self.max_entries {
            // Simple eviction: clear 25% when full
            let to_remove: Vec<_> = self
                .graphs
                .iter()
                .take((self.max_entries / 4).max(1))
                .map(|r| r.key().clone())
                .collect();
            for key in to_remove {
                self.graphs.remove(&key);
            }
        }
        self.graphs.insert(key, graph);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            graphs_cached: self.graphs.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub graphs_cached: usize,
    pub hits: usize,
    pub misses: usize,
}
