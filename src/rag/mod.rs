//! Retrieval Augmented Generation (RAG) Pipeline
//!
//! This module provides the pipeline components shared by document QA and
//! self-query retrieval.
//!
//! # Module Structure
//!
//! - [`rag::loader`](crate::rag::loader) - Markdown/text file loading
//! - [`rag::chunker`](crate::rag::chunker) - Overlapping text chunking
//! - [`rag::embeddings`](crate::rag::embeddings) - Dense embedding providers
//! - [`rag::cache`](crate::rag::cache) - LRU embedding cache
//! - [`rag::index`](crate::rag::index) - Embedding provider + vector store
//! - [`rag::prompt`](crate::rag::prompt) - `{placeholder}` prompt templates
//! - [`rag::qa`](crate::rag::qa) - Retrieve-then-generate question answering
//!
//! # RAG Pipeline
//!
//! 1. **Ingestion** - Documents are loaded and chunked
//! 2. **Storage** - Chunks are embedded and stored in the vector store
//! 3. **Retrieval** - The question is embedded, similar chunks retrieved
//! 4. **Generation** - The LLM answers from the retrieved context
//!
//! # Example
//!
//! ```ignore
//! use selfquery::rag::{chunker::TextChunker, index::DocumentIndex, loader, qa::QaChain};
//!
//! let doc = loader::load_text_file("easy-rl-chapter1.md")?;
//! let chunks = TextChunker::new(1000, 200)?.split_documents(&[doc], true)?;
//!
//! let index = DocumentIndex::new(embedder, store);
//! index.add_documents(chunks).await?;
//!
//! let answer = QaChain::new(index, llm).answer("What is reinforcement learning?").await?;
//! ```

pub mod cache;
pub mod chunker;
pub mod embeddings;
pub mod index;
pub mod loader;
pub mod prompt;
pub mod qa;
