//! Self-query retrieval.
//!
//! A natural-language query such as "videos by Datawhale under 10 minutes" is
//! translated by an LLM into a [`StructuredQuery`]: the text to embed, a
//! metadata [`FilterExpr`] checked against a [`FieldSchema`], and an optional
//! result limit. The [`SelfQueryRetriever`] runs the filtered similarity
//! search and falls back to plain similarity search when the model's output
//! is unusable.

pub mod filter;
pub mod retriever;
pub mod schema;
pub mod translator;

pub use filter::{Comparison, FilterExpr, Operator, StructuredQuery, TranslationError};
pub use retriever::{DEFAULT_LIMIT, Retrieval, RetrievalMode, SelfQueryRetriever};
pub use schema::{AttributeInfo, FieldSchema, FieldType};
pub use translator::{LlmQueryTranslator, QueryTranslator, Translation};
