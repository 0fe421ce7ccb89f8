//! Mock implementations for testing.
//!
//! This module provides mock LLM clients and embedding providers that can be
//! used across different test files without duplication.

use async_trait::async_trait;
use parking_lot::Mutex;
use selfquery::llm::LLMClient;
use selfquery::rag::embeddings::{EmbeddingProvider, l2_normalize};
use selfquery::types::{AppError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Mock LLM client with scripted responses.
///
/// Responses are returned in order; the last one repeats once the script is
/// exhausted. Every `(system, prompt)` pair is recorded.
///
/// ```ignore
/// // Always answers "Hello"
/// let client = MockLLMClient::new("Hello");
///
/// // First call gets the filter JSON, later calls get "done"
/// let client = MockLLMClient::scripted(vec![r#"{"query": "", "filter": null}"#, "done"]);
///
/// // Simulates an unreachable provider
/// let client = MockLLMClient::failing();
/// ```
pub struct MockLLMClient {
    responses: Vec<String>,
    cursor: AtomicUsize,
    should_fail: bool,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockLLMClient {
    /// Create a new mock client that returns the given response.
    pub fn new(response: &str) -> Self {
        Self::scripted(vec![response])
    }

    pub fn scripted(responses: Vec<&str>) -> Self {
        Self {
            responses: responses.into_iter().map(str::to_string).collect(),
            cursor: AtomicUsize::new(0),
            should_fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock client that always returns an error.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::scripted(vec![])
        }
    }

    /// Recorded `(system, prompt)` pairs. `generate` records an empty system.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }

    fn next_response(&self, system: &str, prompt: &str) -> Result<String> {
        self.calls.lock().push((system.to_string(), prompt.to_string()));
        if self.should_fail {
            return Err(AppError::ProviderUnavailable(
                "Mock LLM failure".to_string(),
            ));
        }
        let i = self.cursor.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .responses
            .get(i)
            .or_else(|| self.responses.last())
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.next_response("", prompt)
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.next_response(system, prompt)
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Deterministic bag-of-words embedder.
///
/// Each lowercase word is hashed into one of `DIMENSIONS` buckets, so texts
/// sharing words are close and unrelated texts are near-orthogonal.
pub struct MockEmbeddingProvider {
    should_fail: bool,
    calls: AtomicUsize,
}

impl MockEmbeddingProvider {
    pub const DIMENSIONS: usize = 64;

    pub fn new() -> Self {
        Self {
            should_fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            should_fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of texts embedded so far.
    pub fn embedded_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector_for(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; Self::DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = word
                .to_lowercase()
                .bytes()
                .fold(2166136261u32, |h, b| (h ^ u32::from(b)).wrapping_mul(16777619));
            vector[bucket as usize % Self::DIMENSIONS] += 1.0;
        }
        // Keep empty text off the zero vector
        vector[0] += 0.01;
        l2_normalize(&mut vector);
        vector
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if self.should_fail {
            return Err(AppError::ProviderUnavailable(
                "Mock embedding failure".to_string(),
            ));
        }
        self.calls.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector_for(t)).collect())
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
    }
}
