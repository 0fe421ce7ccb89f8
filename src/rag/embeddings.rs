//! Dense embedding providers.
//!
//! Every provider maps text to a fixed-length vector and is deterministic per
//! model version. `embed_many` preserves input order.

use crate::types::{AppError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Maps text to fixed-length vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts. The output has the same length and order as the input.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_many(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Embedding("Provider returned no embedding".to_string()))
    }

    /// Model identifier, used in cache keys.
    fn model_name(&self) -> &str;
}

/// Scale `vector` to unit length in place. Zero vectors are left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Embedding backend selection, built from configuration.
#[derive(Debug, Clone)]
pub enum EmbeddingBackend {
    /// OpenAI-compatible `/embeddings` endpoint
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
        normalize: bool,
        timeout_secs: Option<u64>,
    },

    /// Local ONNX model via fastembed (e.g. `BAAI/bge-small-zh-v1.5`)
    FastEmbed { model: String, normalize: bool },
}

impl EmbeddingBackend {
    /// Create a provider for this backend.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Configuration`] if the backend's feature is not
    /// enabled or the model cannot be initialised.
    pub fn create_provider(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        match self {
            #[cfg(feature = "openai")]
            EmbeddingBackend::OpenAI {
                api_key,
                api_base,
                model,
                normalize,
                timeout_secs,
            } => Ok(Arc::new(OpenAIEmbeddingProvider::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
                *normalize,
                *timeout_secs,
            )?)),

            #[cfg(feature = "local-embeddings")]
            EmbeddingBackend::FastEmbed { model, normalize } => {
                Ok(Arc::new(FastEmbedProvider::new(model, *normalize)?))
            }

            #[allow(unreachable_patterns)]
            other => Err(AppError::Configuration(format!(
                "Embedding backend '{}' not enabled. Check feature flags.",
                other.name()
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EmbeddingBackend::OpenAI { .. } => "openai",
            EmbeddingBackend::FastEmbed { .. } => "fastembed",
        }
    }
}

// ============================================================================
// OpenAI-compatible embeddings
// ============================================================================

#[cfg(feature = "openai")]
pub use self::openai_backend::OpenAIEmbeddingProvider;

#[cfg(feature = "openai")]
mod openai_backend {
    use super::{EmbeddingProvider, l2_normalize};
    use crate::types::{AppError, Result};
    use async_openai::{Client, config::OpenAIConfig, types::CreateEmbeddingRequestArgs};
    use async_trait::async_trait;

    /// Embeddings from an OpenAI-compatible `/embeddings` endpoint.
    pub struct OpenAIEmbeddingProvider {
        client: Client<OpenAIConfig>,
        model: String,
        normalize: bool,
    }

    impl OpenAIEmbeddingProvider {
        pub fn new(
            api_key: String,
            api_base: String,
            model: String,
            normalize: bool,
            timeout_secs: Option<u64>,
        ) -> Result<Self> {
            Ok(Self {
                client: crate::llm::openai::build_client(api_key, api_base, timeout_secs)?,
                model,
                normalize,
            })
        }
    }

    #[async_trait]
    impl EmbeddingProvider for OpenAIEmbeddingProvider {
        async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }

            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model)
                .input(texts.to_vec())
                .build()
                .map_err(|e| AppError::Internal(format!("Failed to build request: {}", e)))?;

            let response = self.client.embeddings().create(request).await.map_err(|e| {
                AppError::ProviderUnavailable(format!("Embedding API error: {}", e))
            })?;

            let mut data = response.data;
            if data.len() != texts.len() {
                return Err(AppError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    texts.len(),
                    data.len()
                )));
            }
            data.sort_by_key(|item| item.index);

            Ok(data
                .into_iter()
                .map(|item| {
                    let mut vector = item.embedding;
                    if self.normalize {
                        l2_normalize(&mut vector);
                    }
                    vector
                })
                .collect())
        }

        fn model_name(&self) -> &str {
            &self.model
        }
    }
}

// ============================================================================
// Local fastembed models
// ============================================================================

#[cfg(feature = "local-embeddings")]
pub use self::fastembed_backend::FastEmbedProvider;

#[cfg(feature = "local-embeddings")]
mod fastembed_backend {
    use super::{EmbeddingProvider, l2_normalize};
    use crate::types::{AppError, Result};
    use async_trait::async_trait;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn resolve_model(name: &str) -> Result<EmbeddingModel> {
        match name {
            "BAAI/bge-small-zh-v1.5" | "bge-small-zh-v1.5" => Ok(EmbeddingModel::BGESmallZHV15),
            "BAAI/bge-small-en-v1.5" | "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
            "BAAI/bge-base-en-v1.5" | "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
            "sentence-transformers/all-MiniLM-L6-v2" | "all-minilm-l6-v2" => {
                Ok(EmbeddingModel::AllMiniLML6V2)
            }
            other => Err(AppError::Configuration(format!(
                "Unsupported fastembed model: {}",
                other
            ))),
        }
    }

    /// Local ONNX embeddings. Inference runs on a blocking thread.
    pub struct FastEmbedProvider {
        model: Arc<Mutex<TextEmbedding>>,
        model_name: String,
        normalize: bool,
    }

    impl FastEmbedProvider {
        pub fn new(model_name: &str, normalize: bool) -> Result<Self> {
            let model = TextEmbedding::try_new(
                InitOptions::new(resolve_model(model_name)?).with_show_download_progress(true),
            )
            .map_err(|e| AppError::Embedding(e.to_string()))?;

            Ok(Self {
                model: Arc::new(Mutex::new(model)),
                model_name: model_name.to_string(),
                normalize,
            })
        }
    }

    #[async_trait]
    impl EmbeddingProvider for FastEmbedProvider {
        async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }

            let model = Arc::clone(&self.model);
            let texts = texts.to_vec();
            let mut vectors = tokio::task::spawn_blocking(move || model.lock().embed(texts, None))
                .await
                .map_err(|e| AppError::Internal(format!("Embedding task failed: {}", e)))?
                .map_err(|e| AppError::Embedding(e.to_string()))?;

            if self.normalize {
                vectors.iter_mut().for_each(|v| l2_normalize(v));
            }
            Ok(vectors)
        }

        fn model_name(&self) -> &str {
            &self.model_name
        }
    }
}
