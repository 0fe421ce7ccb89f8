use crate::db::vectorstore::{StoredRecord, VectorStore};
use crate::rag::embeddings::EmbeddingProvider;
use crate::selfquery::filter::FilterExpr;
use crate::types::{AppError, Document, Result, ScoredDocument};
use std::sync::Arc;
use tracing::{debug, info};

/// Couples an embedding provider with a vector store.
///
/// Documents are embedded on `add_documents`; queries are embedded on
/// `similarity_search`. Both sides must use the same provider so vectors
/// share a space.
#[derive(Clone)]
pub struct DocumentIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl DocumentIndex {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Embed and store `documents`, preserving order. Returns the number added.
    pub async fn add_documents(&self, documents: Vec<Document>) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let vectors = self.embedder.embed_many(&texts).await?;
        if vectors.len() != documents.len() {
            return Err(AppError::Embedding(format!(
                "Expected {} embeddings, got {}",
                documents.len(),
                vectors.len()
            )));
        }

        let records = vectors
            .into_iter()
            .zip(documents)
            .map(|(vector, document)| StoredRecord { vector, document })
            .collect();

        let added = self.store.add(records).await?;
        info!(
            added,
            model = self.embedder.model_name(),
            store = self.store.provider_name(),
            "Indexed documents"
        );
        Ok(added)
    }

    /// Top `k` documents most similar to `query` that satisfy `filter`.
    pub async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&FilterExpr>,
    ) -> Result<Vec<ScoredDocument>> {
        if k == 0 || self.store.is_empty().await? {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query).await?;
        let results = self.store.search(&query_vector, k, filter).await?;
        debug!(query, k, hits = results.len(), filtered = filter.is_some(), "Similarity search");
        Ok(results)
    }

    pub async fn len(&self) -> Result<usize> {
        self.store.len().await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        self.store.is_empty().await
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::vectorstore::InMemoryVectorStore;
    use crate::selfquery::filter::Operator;
    use async_trait::async_trait;

    /// Embeds text as `[len, vowel count]`.
    struct ShapeEmbedder;

    #[async_trait]
    impl EmbeddingProvider for ShapeEmbedder {
        async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let vowels = t.chars().filter(|c| "aeiou".contains(*c)).count();
                    vec![t.len() as f32, vowels as f32 + 1.0]
                })
                .collect())
        }

        fn model_name(&self) -> &str {
            "shape"
        }
    }

    fn index() -> DocumentIndex {
        DocumentIndex::new(Arc::new(ShapeEmbedder), Arc::new(InMemoryVectorStore::new()))
    }

    #[tokio::test]
    async fn test_empty_index_returns_nothing() {
        let index = index();
        let results = index.similarity_search("anything", 4, None).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_exact_equality_round_trip() {
        let index = index();
        index
            .add_documents(vec![
                Document::new("alpha").with_metadata("author", "Datawhale"),
                Document::new("beta").with_metadata("author", "Someone"),
            ])
            .await
            .unwrap();

        let filter = FilterExpr::comparison("author", Operator::Eq, "Datawhale");
        let results = index.similarity_search("query", 10, Some(&filter)).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.content, "alpha");
    }

    #[tokio::test]
    async fn test_add_empty_batch() {
        let index = index();
        assert_eq!(index.add_documents(vec![]).await.unwrap(), 0);
        assert!(index.is_empty().await.unwrap());
    }
}
