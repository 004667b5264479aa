//! LRU query cache for embedding results.
//!
//! Repeated chat questions against the same repositories re-embed the same
//! query text; the cache serves those from memory. Default: 1000 entries,
//! 1-hour TTL.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use ndarray::Array1;
use parking_lot::Mutex;

use crate::embedder::{EmbedderBackend, EmbeddingResult};
use reposage_core::Result;

struct CacheEntry {
    embedding: Array1<f32>,
    inserted_at: Instant,
}

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    /// Least recently used at the front.
    recency: VecDeque<String>,
    capacity: usize,
    ttl: Duration,
}

impl CacheInner {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            if let Some(k) = self.recency.remove(pos) {
                self.recency.push_back(k);
            }
        }
    }

    fn evict(&mut self, key: &str) {
        self.entries.remove(key);
        self.recency.retain(|k| k != key);
    }
}

/// Thread-safe LRU cache keyed by the exact text that was embedded.
pub struct QueryCache {
    inner: Mutex<CacheInner>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Hit/miss counters and current size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl QueryCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::with_capacity(capacity),
                recency: VecDeque::with_capacity(capacity),
                capacity,
                ttl,
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// 1000 entries, 1 hour TTL.
    pub fn default_cache() -> Self {
        Self::new(1000, Duration::from_secs(3600))
    }

    /// Look up a fresh entry, refreshing its recency on hit.
    pub fn get(&self, key: &str) -> Option<Array1<f32>> {
        let mut inner = self.inner.lock();
        let ttl = inner.ttl;

        let lookup = inner
            .entries
            .get(key)
            .map(|entry| (entry.inserted_at.elapsed() < ttl).then(|| entry.embedding.clone()));

        let found = match lookup {
            Some(Some(embedding)) => Some(embedding),
            Some(None) => {
                inner.evict(key);
                None
            }
            None => None,
        };

        match found {
            Some(embedding) => {
                inner.touch(key);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(embedding)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn put(&self, key: String, embedding: Array1<f32>) {
        let mut inner = self.inner.lock();
        if inner.capacity == 0 {
            return;
        }

        if inner.entries.contains_key(&key) {
            inner.touch(&key);
        } else {
            while inner.entries.len() >= inner.capacity {
                match inner.recency.pop_front() {
                    Some(oldest) => {
                        inner.entries.remove(&oldest);
                    }
                    None => break,
                }
            }
            inner.recency.push_back(key.clone());
        }

        inner.entries.insert(
            key,
            CacheEntry {
                embedding,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.recency.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Embedder wrapper that consults a `QueryCache` before the inner backend.
pub struct CachedEmbedder<E> {
    inner: E,
    cache: QueryCache,
}

impl<E: EmbedderBackend> CachedEmbedder<E> {
    pub fn new(inner: E, cache: QueryCache) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }
}

impl<E: EmbedderBackend> EmbedderBackend for CachedEmbedder<E> {
    fn embed(&self, text: &str) -> Result<EmbeddingResult> {
        if let Some(embedding) = self.cache.get(text) {
            return Ok(EmbeddingResult {
                embedding,
                cached: true,
            });
        }

        let result = self.inner.embed(text)?;
        self.cache.put(text.to_string(), result.embedding.clone());
        Ok(result)
    }

    // Document chunks are embedded once, so batches bypass the cache.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<EmbeddingResult>> {
        self.inner.embed_batch(texts)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}
