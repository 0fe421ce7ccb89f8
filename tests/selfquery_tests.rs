//! Self-query retrieval tests
//!
//! Drive the retriever end to end with a scripted LLM and a deterministic
//! embedder over an in-memory store.

mod common;

use common::mocks::{MockEmbeddingProvider, MockLLMClient};
use selfquery::db::InMemoryVectorStore;
use selfquery::rag::index::DocumentIndex;
use selfquery::selfquery::{
    FieldSchema, FilterExpr, LlmQueryTranslator, Operator, QueryTranslator, RetrievalMode,
    SelfQueryRetriever,
};
use selfquery::types::{AppError, Document, MetadataValue};
use std::sync::Arc;

fn video(title: &str, author: &str, views: i64, length: i64) -> Document {
    Document::new(format!(
        "Title: {}\nAuthor: {}\nViews: {}\nDuration: {}s",
        title, author, views, length
    ))
    .with_metadata("title", title)
    .with_metadata("author", author)
    .with_metadata("view_count", views)
    .with_metadata("length", length)
}

fn corpus() -> Vec<Document> {
    vec![
        video("Reinforcement learning basics", "Datawhale", 100, 300),
        video("Markov decision processes", "Someone", 500, 900),
        video("Policy gradient explained", "Other", 1000, 650),
        video("Q-learning walkthrough", "Datawhale", 2500, 1200),
        video("Deep Q networks", "Someone", 40, 420),
        video("Actor critic methods", "Other", 780, 180),
    ]
}

async fn setup(llm: Arc<MockLLMClient>, documents: Vec<Document>) -> SelfQueryRetriever {
    let index = DocumentIndex::new(
        Arc::new(MockEmbeddingProvider::new()),
        Arc::new(InMemoryVectorStore::new()),
    );
    index.add_documents(documents).await.unwrap();

    let translator = LlmQueryTranslator::new(llm, "Video metadata");
    SelfQueryRetriever::new(Arc::new(translator), index, FieldSchema::video_metadata())
}

fn views(doc: &Document) -> i64 {
    match doc.get("view_count") {
        Some(MetadataValue::Integer(v)) => *v,
        other => panic!("unexpected view_count {:?}", other),
    }
}

// =============================================================================
// Filtered retrieval
// =============================================================================

#[tokio::test]
async fn test_filter_with_limit_returns_only_matches() {
    let llm = Arc::new(MockLLMClient::new(
        r#"```json
{"query": "", "filter": {"attribute": "view_count", "operator": "gt", "value": 600}, "limit": 5}
```"#,
    ));
    let retriever = setup(
        llm,
        vec![
            video("a", "x", 100, 10),
            video("b", "x", 500, 10),
            video("c", "x", 1000, 10),
        ],
    )
    .await;

    let docs = retriever
        .retrieve("videos with more than 600 views, top 5", None)
        .await
        .unwrap();

    assert_eq!(docs.len(), 1);
    assert_eq!(views(&docs[0]), 1000);
}

#[tokio::test]
async fn test_every_result_satisfies_filter() {
    let llm = Arc::new(MockLLMClient::new(
        r#"{"query": "learning", "filter": {"or": [
            {"attribute": "author", "operator": "eq", "value": "Datawhale"},
            {"attribute": "length", "operator": "lt", "value": 200}
        ]}, "limit": null}"#,
    ));
    let retriever = setup(llm, corpus()).await;

    let retrieval = retriever
        .retrieve_detailed("Datawhale videos or anything under 200 seconds", None)
        .await
        .unwrap();

    assert_eq!(retrieval.mode, RetrievalMode::Filtered);
    assert_eq!(retrieval.documents.len(), 3);
    let filter = retrieval.applied.filter.as_ref().unwrap();
    for hit in &retrieval.documents {
        assert!(filter.matches(&hit.document));
    }
    assert_eq!(retrieval.applied.query, "learning");
}

#[tokio::test]
async fn test_filter_limit_bounds_results() {
    let llm = Arc::new(MockLLMClient::new(
        r#"{"query": "", "filter": {"attribute": "view_count", "operator": "gte", "value": 100}, "limit": 2}"#,
    ));
    let retriever = setup(llm, corpus()).await;

    let retrieval = retriever.retrieve_detailed("two popular videos", Some(10)).await.unwrap();

    assert_eq!(retrieval.applied.limit, Some(2));
    assert_eq!(retrieval.documents.len(), 2);
    assert!(retrieval.documents.iter().all(|h| views(&h.document) >= 100));
}

#[tokio::test]
async fn test_filter_without_limit_uses_hint_then_default() {
    let response = r#"{"query": "", "filter": {"attribute": "view_count", "operator": "gt", "value": 0}}"#;

    let retriever = setup(Arc::new(MockLLMClient::new(response)), corpus()).await;
    let with_hint = retriever.retrieve("any video", Some(3)).await.unwrap();
    assert_eq!(with_hint.len(), 3);

    let retriever = setup(Arc::new(MockLLMClient::new(response)), corpus()).await;
    let with_default = retriever.retrieve("any video", None).await.unwrap();
    assert_eq!(with_default.len(), 4);
}

#[tokio::test]
async fn test_empty_rewrite_embeds_raw_query() {
    let llm = Arc::new(MockLLMClient::new(
        r#"{"query": "  ", "filter": {"attribute": "author", "operator": "eq", "value": "Datawhale"}}"#,
    ));
    let retriever = setup(llm, corpus()).await;

    let retrieval = retriever
        .retrieve_detailed("videos by Datawhale", None)
        .await
        .unwrap();

    assert_eq!(retrieval.applied.query, "videos by Datawhale");
    assert_eq!(retrieval.documents.len(), 2);
}

#[tokio::test]
async fn test_exact_equality_finds_added_document() {
    let llm = Arc::new(MockLLMClient::new(
        r#"{"query": "", "filter": {"attribute": "title", "operator": "eq", "value": "Deep Q networks"}}"#,
    ));
    let retriever = setup(llm, corpus()).await;

    let docs = retriever.retrieve("the Deep Q networks video", None).await.unwrap();

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].get("title"), Some(&MetadataValue::from("Deep Q networks")));
}

// =============================================================================
// Unfiltered and fallback retrieval
// =============================================================================

#[tokio::test]
async fn test_no_filter_is_pure_similarity_search() {
    let llm = Arc::new(MockLLMClient::new(
        r#"{"query": "policy gradient", "filter": null, "limit": null}"#,
    ));
    let retriever = setup(llm, corpus()).await;

    let retrieval = retriever
        .retrieve_detailed("Policy gradient explained", None)
        .await
        .unwrap();

    assert_eq!(retrieval.mode, RetrievalMode::Unfiltered);
    assert!(retrieval.warnings.is_empty());
    assert_eq!(retrieval.documents.len(), 4);
    assert_eq!(retrieval.applied.query, "Policy gradient explained");
    assert_eq!(
        retrieval.documents[0].document.get("title"),
        Some(&MetadataValue::from("Policy gradient explained"))
    );
    let scores: Vec<f32> = retrieval.documents.iter().map(|h| h.score).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_no_filter_respects_limit_hint() {
    let llm = Arc::new(MockLLMClient::new(r#"{"query": "", "filter": "NO_FILTER"}"#));
    let retriever = setup(llm, corpus()).await;

    let docs = retriever.retrieve("reinforcement learning", Some(2)).await.unwrap();
    assert_eq!(docs.len(), 2);
}

#[tokio::test]
async fn test_unknown_attribute_falls_back_with_warning() {
    let llm = Arc::new(MockLLMClient::new(
        r#"{"query": "", "filter": {"attribute": "rating", "operator": "gt", "value": 4}, "limit": 1}"#,
    ));
    let retriever = setup(llm, corpus()).await;

    let retrieval = retriever
        .retrieve_detailed("highly rated videos", None)
        .await
        .unwrap();

    assert_eq!(retrieval.mode, RetrievalMode::Fallback);
    assert!(retrieval.applied.filter.is_none());
    assert_eq!(retrieval.applied.limit, Some(4));
    assert_eq!(retrieval.documents.len(), 4);
    assert_eq!(retrieval.warnings.len(), 1);
    assert!(retrieval.warnings[0].contains("rating"));
}

#[tokio::test]
async fn test_garbage_model_output_falls_back() {
    let llm = Arc::new(MockLLMClient::new("I am not sure what you mean."));
    let retriever = setup(llm, corpus()).await;

    let retrieval = retriever.retrieve_detailed("the shortest video", None).await.unwrap();

    assert_eq!(retrieval.mode, RetrievalMode::Fallback);
    assert_eq!(retrieval.documents.len(), 4);
}

// =============================================================================
// Errors and edge cases
// =============================================================================

#[tokio::test]
async fn test_empty_query_is_invalid_input() {
    let retriever = setup(Arc::new(MockLLMClient::new("{}")), corpus()).await;

    let result = retriever.retrieve("   ", None).await;
    assert!(matches!(result, Err(AppError::InvalidInput(_))));
}

#[tokio::test]
async fn test_empty_store_returns_empty() {
    let llm = Arc::new(MockLLMClient::new(
        r#"{"query": "", "filter": {"attribute": "view_count", "operator": "gt", "value": 600}}"#,
    ));
    let retriever = setup(llm, vec![]).await;

    let docs = retriever.retrieve("popular videos", None).await.unwrap();
    assert!(docs.is_empty());
}

#[tokio::test]
async fn test_llm_failure_is_provider_unavailable() {
    let retriever = setup(Arc::new(MockLLMClient::failing()), corpus()).await;

    let result = retriever.retrieve("popular videos", None).await;
    assert!(matches!(result, Err(AppError::ProviderUnavailable(_))));
}

#[tokio::test]
async fn test_embedding_failure_is_provider_unavailable() {
    let store = Arc::new(InMemoryVectorStore::new());
    DocumentIndex::new(Arc::new(MockEmbeddingProvider::new()), store.clone())
        .add_documents(corpus())
        .await
        .unwrap();

    let index = DocumentIndex::new(Arc::new(MockEmbeddingProvider::failing()), store);
    let translator = LlmQueryTranslator::new(
        Arc::new(MockLLMClient::new(r#"{"query": "x", "filter": null}"#)),
        "Video metadata",
    );
    let retriever =
        SelfQueryRetriever::new(Arc::new(translator), index, FieldSchema::video_metadata());

    let result = retriever.retrieve("anything", None).await;
    assert!(matches!(result, Err(AppError::ProviderUnavailable(_))));
}

#[tokio::test]
async fn test_translator_prompt_carries_schema_and_query() {
    let llm = Arc::new(MockLLMClient::new(r#"{"query": "x", "filter": null}"#));
    let translator = LlmQueryTranslator::new(llm.clone(), "Bilibili video metadata");

    let translation = translator
        .translate("videos longer than 600 seconds", &FieldSchema::video_metadata())
        .await
        .unwrap();
    assert!(translation.rejected.is_none());

    let calls = llm.calls();
    assert_eq!(calls.len(), 1);
    let (system, prompt) = &calls[0];
    assert!(system.contains("Bilibili video metadata"));
    assert!(system.contains("- length (integer): Video length in seconds"));
    assert!(prompt.contains("videos longer than 600 seconds"));
}

#[tokio::test]
async fn test_default_limit_override() {
    let llm = Arc::new(MockLLMClient::new(r#"{"query": "", "filter": null}"#));
    let retriever = setup(llm, corpus()).await.with_default_limit(6);

    let docs = retriever.retrieve("videos", None).await.unwrap();
    assert_eq!(docs.len(), 6);
}

#[test]
fn test_filter_display_is_readable() {
    let filter = FilterExpr::Or {
        or: vec![
            FilterExpr::comparison("view_count", Operator::Lt, 10),
            FilterExpr::comparison("author", Operator::Eq, "Datawhale"),
        ],
    };
    assert_eq!(
        filter.to_string(),
        r#"or(lt("view_count", 10), eq("author", "Datawhale"))"#
    );
}
