//! Embedding Cache for RAG Pipeline
//!
//! Wraps any [`EmbeddingProvider`] so that repeated texts (re-ingesting the
//! same corpus, repeated queries) are embedded once.
//!
//! # Cache Key Strategy
//!
//! Cache keys are SHA-256 hashes of `text | model_name`, so different models
//! never share vectors and keys are stable across restarts.
//!
//! # Example
//!
//! ```ignore
//! use selfquery::rag::cache::CachedEmbeddingProvider;
//!
//! let cached = CachedEmbeddingProvider::new(inner, 10_000);
//! let v1 = cached.embed("hello").await?; // computed
//! let v2 = cached.embed("hello").await?; // served from cache
//! assert_eq!(cached.stats().hits, 1);
//! ```

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::rag::embeddings::EmbeddingProvider;
use crate::types::{AppError, Result};

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of entries in cache
    pub entry_count: usize,
}

impl CacheStats {
    /// Calculate hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Compute a cache key for the given text and model
pub fn compute_key(text: &str, model: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(b"|");
    hasher.update(model.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// LRU-cached embedding provider.
pub struct CachedEmbeddingProvider {
    inner: Arc<dyn EmbeddingProvider>,
    cache: Mutex<LruCache<String, Vec<f32>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CachedEmbeddingProvider {
    /// Cache at most `capacity` vectors (a capacity of 0 is treated as 1).
    pub fn new(inner: Arc<dyn EmbeddingProvider>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.cache.lock().len(),
        }
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }
}

#[async_trait]
impl EmbeddingProvider for CachedEmbeddingProvider {
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = self.inner.model_name().to_string();
        let keys: Vec<String> = texts.iter().map(|t| compute_key(t, &model)).collect();

        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut missing: Vec<usize> = Vec::new();
        {
            let mut cache = self.cache.lock();
            for (i, key) in keys.iter().enumerate() {
                match cache.get(key) {
                    Some(vector) => results.push(Some(vector.clone())),
                    None => {
                        results.push(None);
                        missing.push(i);
                    }
                }
            }
        }

        self.hits
            .fetch_add((texts.len() - missing.len()) as u64, Ordering::Relaxed);
        self.misses
            .fetch_add(missing.len() as u64, Ordering::Relaxed);

        if !missing.is_empty() {
            let batch: Vec<String> = missing.iter().map(|&i| texts[i].clone()).collect();
            let computed = self.inner.embed_many(&batch).await?;
            if computed.len() != batch.len() {
                return Err(AppError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    computed.len()
                )));
            }

            let mut cache = self.cache.lock();
            for (&i, vector) in missing.iter().zip(computed) {
                cache.put(keys[i].clone(), vector.clone());
                results[i] = Some(vector);
            }
        }

        results
            .into_iter()
            .map(|v| v.ok_or_else(|| AppError::Internal("Embedding slot left empty".to_string())))
            .collect()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}
