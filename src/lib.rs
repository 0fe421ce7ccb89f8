//! # selfquery - Retrieval-augmented generation pipelines
//!
//! Two retrieval workflows over one set of building blocks:
//!
//! 1. **Document QA** - load a markdown file, split it into overlapping
//!    chunks, embed and index them, then answer questions from the most
//!    similar chunks.
//! 2. **Self-query retrieval** - index video metadata fetched from a public
//!    API, then answer natural-language queries by having an LLM translate
//!    them into a metadata filter plus an optional result limit.
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use selfquery::{
//!     db::InMemoryVectorStore,
//!     rag::index::DocumentIndex,
//!     selfquery::{FieldSchema, LlmQueryTranslator, SelfQueryRetriever},
//! };
//! use std::sync::Arc;
//!
//! let index = DocumentIndex::new(embedder, Arc::new(InMemoryVectorStore::new()));
//! index.add_documents(video_documents).await?;
//!
//! let translator = Arc::new(LlmQueryTranslator::new(llm, "Video metadata"));
//! let retriever = SelfQueryRetriever::new(translator, index, FieldSchema::video_metadata());
//!
//! let docs = retriever.retrieve("videos longer than 600 seconds", None).await?;
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `openai` | OpenAI-compatible chat and embeddings (default) |
//! | `ollama` | Ollama local inference (default) |
//! | `local-embeddings` | fastembed ONNX embedding models |
//!
//! ## Modules
//!
//! - [`db`] - Vector store
//! - [`llm`] - LLM client implementations
//! - [`rag`] - Loading, chunking, embedding, indexing and QA
//! - [`selfquery`] - Field schema, filters, query translation and retrieval
//! - [`sources`] - Video metadata source
//! - [`types`] - Common types and error handling
//! - [`utils`] - TOML configuration

#![cfg_attr(docsrs, feature(doc_cfg))]

/// Command-line interface definitions.
pub mod cli;
/// Vector storage.
pub mod db;
/// LLM provider clients and abstractions.
pub mod llm;
/// Retrieval Augmented Generation (RAG) components.
pub mod rag;
/// Self-query retrieval.
pub mod selfquery;
/// External document sources.
pub mod sources;
/// Core types (documents, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use db::{InMemoryVectorStore, VectorStore, VectorStoreProvider};
pub use llm::{LLMClient, ModelParams, Provider};
pub use rag::embeddings::EmbeddingProvider;
pub use rag::index::DocumentIndex;
pub use selfquery::{FieldSchema, FilterExpr, SelfQueryRetriever, StructuredQuery};
pub use types::{AppError, Document, MetadataValue, Result, ScoredDocument};
pub use utils::toml_config::AppConfig;
