use crate::rag::index::DocumentIndex;
use crate::selfquery::filter::StructuredQuery;
use crate::selfquery::schema::FieldSchema;
use crate::selfquery::translator::QueryTranslator;
use crate::types::{AppError, Document, Result, ScoredDocument};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Number of documents returned when neither the query nor the caller sets a limit.
pub const DEFAULT_LIMIT: usize = 4;

/// How a query was ultimately executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    /// Metadata filter applied before ranking
    Filtered,
    /// The translator found no filterable intent
    Unfiltered,
    /// The translator's output was rejected; plain similarity search was used
    Fallback,
}

/// Full result of a self-query retrieval.
#[derive(Debug, Clone, Serialize)]
pub struct Retrieval {
    pub documents: Vec<ScoredDocument>,
    /// The structured query actually run
    pub applied: StructuredQuery,
    pub mode: RetrievalMode,
    pub warnings: Vec<String>,
}

/// Answers natural-language queries by translating them into a metadata
/// filter plus similarity search.
///
/// The schema is fixed at construction.
pub struct SelfQueryRetriever {
    translator: Arc<dyn QueryTranslator>,
    index: DocumentIndex,
    schema: FieldSchema,
    default_limit: usize,
}

impl SelfQueryRetriever {
    pub fn new(translator: Arc<dyn QueryTranslator>, index: DocumentIndex, schema: FieldSchema) -> Self {
        Self {
            translator,
            index,
            schema,
            default_limit: DEFAULT_LIMIT,
        }
    }

    /// Override [`DEFAULT_LIMIT`]. Zero is ignored.
    pub fn with_default_limit(mut self, limit: usize) -> Self {
        if limit > 0 {
            self.default_limit = limit;
        }
        self
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    pub fn index(&self) -> &DocumentIndex {
        &self.index
    }

    pub async fn retrieve(&self, query: &str, limit_hint: Option<usize>) -> Result<Vec<Document>> {
        Ok(self
            .retrieve_detailed(query, limit_hint)
            .await?
            .documents
            .into_iter()
            .map(|scored| scored.document)
            .collect())
    }

    pub async fn retrieve_detailed(&self, query: &str, limit_hint: Option<usize>) -> Result<Retrieval> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput("Query cannot be empty".to_string()));
        }
        let hint = limit_hint.filter(|n| *n > 0);

        let translation = self.translator.translate(query, &self.schema).await?;
        let mut warnings = Vec::new();

        let (applied, mode) = match (translation.rejected, translation.structured) {
            (Some(reason), _) => {
                warn!(query, reason = %reason, "Discarding structured query, falling back to similarity search");
                warnings.push(format!("Filter discarded: {}", reason));
                let applied = StructuredQuery {
                    limit: Some(hint.unwrap_or(self.default_limit)),
                    ..StructuredQuery::unfiltered(query)
                };
                (applied, RetrievalMode::Fallback)
            }
            (None, structured) if !structured.has_filter() => {
                let applied = StructuredQuery {
                    limit: Some(hint.unwrap_or(self.default_limit)),
                    ..StructuredQuery::unfiltered(query)
                };
                (applied, RetrievalMode::Unfiltered)
            }
            (None, structured) => {
                let search_text = if structured.query.trim().is_empty() {
                    query.to_string()
                } else {
                    structured.query
                };
                let limit = structured.limit.or(hint).unwrap_or(self.default_limit);
                let applied = StructuredQuery {
                    query: search_text,
                    filter: structured.filter,
                    limit: Some(limit),
                };
                (applied, RetrievalMode::Filtered)
            }
        };

        let k = applied.limit.unwrap_or(self.default_limit);
        let documents = self
            .index
            .similarity_search(&applied.query, k, applied.filter.as_ref())
            .await?;

        match &applied.filter {
            Some(filter) => info!(
                query,
                filter = %filter,
                attributes = ?filter.attributes(),
                k,
                hits = documents.len(),
                "Self-query retrieval"
            ),
            None => info!(query, k, hits = documents.len(), "Self-query retrieval without filter"),
        }

        Ok(Retrieval {
            documents,
            applied,
            mode,
            warnings,
        })
    }
}
