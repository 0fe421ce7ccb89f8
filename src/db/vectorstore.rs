//! Vector Store Abstraction Layer
//!
//! This module provides the interface the retrieval pipelines use to persist
//! `(vector, document)` records and run filtered nearest-neighbour search.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                VectorStore Trait             │
//! ├──────────────────────────────────────────────┤
//! │    add    │   search   │   len   │   reset   │
//! └──────────────────────────────────────────────┘
//!                        ▲
//!                        │
//!             ┌──────────┴──────────┐
//!             │ InMemoryVectorStore │──▶ optional JSON snapshot
//!             └─────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use selfquery::db::vectorstore::{VectorStore, VectorStoreProvider};
//!
//! let store = VectorStoreProvider::InMemory.create_store()?;
//! store.add(records).await?;
//!
//! // Top 5 records with view_count > 600
//! let filter = FilterExpr::comparison("view_count", Operator::Gt, 600);
//! let results = store.search(&query_vector, 5, Some(&filter)).await?;
//! ```

use crate::selfquery::filter::FilterExpr;
use crate::types::{AppError, Document, Result, ScoredDocument};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// ============================================================================
// Vector Store Provider Configuration
// ============================================================================

/// Configuration for vector store providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum VectorStoreProvider {
    /// Ephemeral in-memory store.
    ///
    /// Data is not persisted and will be lost when the process exits.
    InMemory,

    /// In-memory store backed by a JSON snapshot file.
    ///
    /// The snapshot is loaded on creation (if present) and rewritten after
    /// every `add` and `reset`.
    Snapshot {
        /// Path to the snapshot file.
        path: PathBuf,
    },
}

impl VectorStoreProvider {
    /// Create a vector store instance from this provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing snapshot cannot be read.
    pub fn create_store(&self) -> Result<InMemoryVectorStore> {
        match self {
            VectorStoreProvider::InMemory => Ok(InMemoryVectorStore::new()),
            VectorStoreProvider::Snapshot { path } => InMemoryVectorStore::with_snapshot(path),
        }
    }
}

// ============================================================================
// Vector Store Trait
// ============================================================================

/// A vector paired with the document it was computed from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub vector: Vec<f32>,
    pub document: Document,
}

/// Abstract trait for vector database operations.
///
/// Records are append-only and are removed only by [`VectorStore::reset`].
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Get the name of this vector store provider.
    fn provider_name(&self) -> &'static str;

    /// Append records. Duplicates are permitted.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidInput`] if a vector's dimension differs from
    /// the dimension already held by the store.
    async fn add(&self, records: Vec<StoredRecord>) -> Result<usize>;

    /// Search for similar vectors.
    ///
    /// `filter` is a hard predicate: records failing it are excluded before
    /// ranking. Results are sorted by similarity (descending), ties in
    /// insertion order, and never exceed `k`.
    async fn search(
        &self,
        query_vector: &[f32],
        k: usize,
        filter: Option<&FilterExpr>,
    ) -> Result<Vec<ScoredDocument>>;

    /// Number of stored records.
    async fn len(&self) -> Result<usize>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Remove every record.
    async fn reset(&self) -> Result<()>;
}

// ============================================================================
// In-Memory Vector Store
// ============================================================================

use parking_lot::RwLock;

/// In-memory vector store with optional snapshot persistence.
///
/// Uses cosine similarity, which equals the inner product for normalised
/// embeddings.
pub struct InMemoryVectorStore {
    inner: RwLock<Snapshot>,
    snapshot_path: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    dimensions: Option<usize>,
    records: Vec<StoredRecord>,
}

impl InMemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Snapshot::default()),
            snapshot_path: None,
        }
    }

    /// Create a store that persists to `path`, loading it if it exists.
    pub fn with_snapshot<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let snapshot = if path.exists() {
            Self::read_snapshot(path)?
        } else {
            Snapshot::default()
        };
        info!(
            path = %path.display(),
            records = snapshot.records.len(),
            "Opened vector store snapshot"
        );
        Ok(Self {
            inner: RwLock::new(snapshot),
            snapshot_path: Some(path.to_path_buf()),
        })
    }

    /// Save the store to a file (JSON format)
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string(&*self.inner.read()).map_err(|e| {
            AppError::VectorStore(format!("Failed to serialize vector store: {}", e))
        })?;
        std::fs::write(path, json).map_err(|e| {
            AppError::VectorStore(format!("Failed to write vector store snapshot: {}", e))
        })?;
        Ok(())
    }

    /// Load a store from a file (JSON format). The loaded store does not
    /// write back to `path`; use [`InMemoryVectorStore::with_snapshot`] for that.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            inner: RwLock::new(Self::read_snapshot(path.as_ref())?),
            snapshot_path: None,
        })
    }

    /// Load the store from a file if it exists, otherwise return a new empty store
    pub fn load_or_new<P: AsRef<Path>>(path: P) -> Self {
        if path.as_ref().exists() {
            Self::load(path).unwrap_or_else(|_| Self::new())
        } else {
            Self::new()
        }
    }

    fn read_snapshot(path: &Path) -> Result<Snapshot> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            AppError::VectorStore(format!("Failed to read vector store snapshot: {}", e))
        })?;
        serde_json::from_str(&json).map_err(|e| {
            AppError::VectorStore(format!("Failed to deserialize vector store: {}", e))
        })
    }

    fn persist(&self) -> Result<()> {
        match &self.snapshot_path {
            Some(path) => self.save(path),
            None => Ok(()),
        }
    }

    /// Calculate cosine similarity between two vectors.
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        // Overflowing norms give NaN; rank those as unrelated
        let similarity = dot_product / (norm_a * norm_b);
        if similarity.is_finite() {
            similarity
        } else {
            0.0
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn provider_name(&self) -> &'static str {
        "in-memory"
    }

    async fn add(&self, records: Vec<StoredRecord>) -> Result<usize> {
        let count = records.len();
        {
            let mut inner = self.inner.write();
            let mut dimensions = inner.dimensions;
            for record in &records {
                if record.vector.is_empty() {
                    return Err(AppError::InvalidInput(
                        "Cannot store an empty vector".to_string(),
                    ));
                }
                if !record.vector.iter().all(|x| x.is_finite()) {
                    return Err(AppError::InvalidInput(
                        "Cannot store a vector with NaN or infinite components".to_string(),
                    ));
                }
                match dimensions {
                    Some(d) if d != record.vector.len() => {
                        return Err(AppError::InvalidInput(format!(
                            "Vector dimension mismatch: store holds {}, got {}",
                            d,
                            record.vector.len()
                        )));
                    }
                    Some(_) => {}
                    None => dimensions = Some(record.vector.len()),
                }
            }
            inner.dimensions = dimensions;
            inner.records.extend(records);
            debug!(added = count, total = inner.records.len(), "Added records");
        }
        self.persist()?;
        Ok(count)
    }

    async fn search(
        &self,
        query_vector: &[f32],
        k: usize,
        filter: Option<&FilterExpr>,
    ) -> Result<Vec<ScoredDocument>> {
        let inner = self.inner.read();
        if k == 0 || inner.records.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(d) = inner.dimensions {
            if d != query_vector.len() {
                return Err(AppError::InvalidInput(format!(
                    "Query vector dimension {} does not match store dimension {}",
                    query_vector.len(),
                    d
                )));
            }
        }
        if !query_vector.iter().all(|x| x.is_finite()) {
            return Err(AppError::InvalidInput(
                "Query vector has NaN or infinite components".to_string(),
            ));
        }

        let mut scored: Vec<(usize, f32)> = inner
            .records
            .iter()
            .enumerate()
            .filter(|(_, record)| filter.map_or(true, |f| f.matches(&record.document)))
            .map(|(i, record)| (i, Self::cosine_similarity(query_vector, &record.vector)))
            .collect();

        // Stable sort: equal scores keep insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| ScoredDocument {
                document: inner.records[i].document.clone(),
                score,
            })
            .collect())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.inner.read().records.len())
    }

    async fn reset(&self) -> Result<()> {
        {
            let mut inner = self.inner.write();
            inner.records.clear();
            inner.dimensions = None;
        }
        self.persist()
    }
}

// ============================================================================
// Tests
// ============================================================================
