use dashmap::DashMap;
use merge::PartialExtraction;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Extraction results keyed by the hash of the chunk text, so re-running a
/// document skips chunks the model has already seen.
#[derive(Clone)]
pub struct Cache {
    extractions: Arc<DashMap<String, PartialExtraction>>,
    max_entries: usize,
}

impl Cache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            extractions: Arc::new(DashMap::new()),
            max_entries,
        }
    }

    /// Error-marked partials are never cached.
    pub fn set_extraction(&self, chunk_text: &str, extraction: &PartialExtraction) {
        if self.max_entries == 0 || extraction.is_error() {
            return;
        }
        if self.extractions.len() >= self.max_entries {
            // Simple eviction: clear 25% when full
            let to_remove: Vec<_> = self
                .extractions
                .iter()
                .take((self.max_entries / 4).max(1))
                .map(|r| r.key().clone())
                .collect();
            for key in to_remove {
                self.extractions.remove(&key);
            }
        }
        self.extractions
            .insert(Self::hash_text(chunk_text), extraction.clone());
    }

    pub fn get_extraction(&self, chunk_text: &str) -> Option<PartialExtraction> {
        self.extractions
            .get(&Self::hash_text(chunk_text))
            .map(|r| r.value().clone())
    }

    pub fn hash_text(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            extractions_cached: self.extractions.len(),
            max_entries: self.max_entries,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CacheStats {
    pub extractions_cached: usize,
    pub max_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use merge::RawEntity;

    fn partial(name: &str) -> PartialExtraction {
        PartialExtraction::new(vec![RawEntity::named(name)], Vec::new())
    }

    #[test]
    fn test_hit_by_text() {
        let cache = Cache::new(10);
        cache.set_extraction("Cats chase mice.", &partial("Cat"));

        assert_eq!(cache.get_extraction("Cats chase mice."), Some(partial("Cat")));
        assert!(cache.get_extraction("Dogs chase cats.").is_none());
    }

    #[test]
    fn test_failed_partials_not_cached() {
        let cache = Cache::new(10);
        cache.set_extraction("text", &PartialExtraction::failed("Invalid JSON returned: ..."));

        assert!(cache.get_extraction("text").is_none());
    }

    #[test]
    fn test_eviction_keeps_size_bounded() {
        let cache = Cache::new(4);
        for i in 0..10 {
            cache.set_extraction(&format!("chunk {}", i), &partial("Cat"));
        }

        assert!(cache.stats().extractions_cached <= 4);
        assert!(cache.get_extraction("chunk 9").is_some());
    }
}
