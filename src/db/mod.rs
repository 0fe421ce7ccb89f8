//! Vector storage.
//!
//! - `in-memory` - Ephemeral store, lost on exit
//! - `snapshot` - The same store persisted to a JSON file
//!
//! Both are built from [`VectorStoreProvider`].

pub mod vectorstore;

pub use vectorstore::{InMemoryVectorStore, StoredRecord, VectorStore, VectorStoreProvider};
