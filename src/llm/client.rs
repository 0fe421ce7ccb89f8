//! LLM Client abstractions and provider management
//!
//! This module provides a unified interface for the language models used by the
//! pipelines:
//! - **OpenAI**: OpenAI API and any OpenAI-compatible endpoint (DashScope
//!   compatible mode for Qwen, DeepSeek, vLLM, ...)
//! - **Ollama**: Local LLM inference

use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Generic LLM client trait for provider abstraction
///
/// All LLM providers implement this trait, so the QA chain and the query
/// translator work with any of them. Transport failures are reported as
/// [`AppError::ProviderUnavailable`].
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion from a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate with system prompt
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Sampling and transport parameters shared by all providers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Sampling temperature (provider default when `None`)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Provider enum for runtime selection
///
/// | Provider | Feature | Notes |
/// |----------|---------|-------|
/// | OpenAI | `openai` | Any OpenAI-compatible endpoint |
/// | Ollama | `ollama` | Recommended for local |
#[derive(Debug, Clone)]
pub enum Provider {
    /// OpenAI API provider (including compatible APIs)
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::OpenAI {
    ///     api_key: std::env::var("DASHSCOPE_API_KEY")?,
    ///     api_base: "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string(),
    ///     model: "qwen3-max".to_string(),
    ///     params: ModelParams::default(),
    /// };
    /// ```
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
        params: ModelParams,
    },

    /// Ollama local LLM provider
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::Ollama {
    ///     base_url: "http://localhost:11434".to_string(),
    ///     model: "qwen3".to_string(),
    ///     params: ModelParams::default(),
    /// };
    /// ```
    Ollama {
        base_url: String,
        model: String,
        params: ModelParams,
    },
}

impl Provider {
    /// Create a client instance for this provider
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Configuration`] if the provider's cargo feature is
    /// not enabled or the client cannot be built.
    pub async fn create_client(&self) -> Result<Box<dyn LLMClient>> {
        match self {
            #[cfg(feature = "openai")]
            Provider::OpenAI {
                api_key,
                api_base,
                model,
                params,
            } => Ok(Box::new(super::openai::OpenAIClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
                params.clone(),
            )?)),

            #[cfg(feature = "ollama")]
            Provider::Ollama {
                base_url,
                model,
                params,
            } => Ok(Box::new(
                super::ollama::OllamaClient::new(base_url.clone(), model.clone(), params.clone())
                    .await?,
            )),

            #[allow(unreachable_patterns)]
            other => Err(AppError::Configuration(format!(
                "LLM provider '{}' not enabled. Rebuild with the '{}' feature.",
                other.name(),
                other.feature_name()
            ))),
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI { .. } => "OpenAI",
            Provider::Ollama { .. } => "Ollama",
        }
    }

    fn feature_name(&self) -> &'static str {
        match self {
            Provider::OpenAI { .. } => "openai",
            Provider::Ollama { .. } => "ollama",
        }
    }

    /// Model identifier requested from the provider
    pub fn model(&self) -> &str {
        match self {
            Provider::OpenAI { model, .. } | Provider::Ollama { model, .. } => model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_name_and_model() {
        let openai = Provider::OpenAI {
            api_key: "".to_string(),
            api_base: "".to_string(),
            model: "qwen3-max".to_string(),
            params: ModelParams::default(),
        };
        assert_eq!(openai.name(), "OpenAI");
        assert_eq!(openai.model(), "qwen3-max");

        let ollama = Provider::Ollama {
            base_url: "".to_string(),
            model: "qwen3".to_string(),
            params: ModelParams::default(),
        };
        assert_eq!(ollama.name(), "Ollama");
        assert_eq!(ollama.model(), "qwen3");
    }

    #[cfg(not(feature = "openai"))]
    #[tokio::test]
    async fn test_disabled_provider_returns_configuration_error() {
        let provider = Provider::OpenAI {
            api_key: "k".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            params: ModelParams::default(),
        };

        let err = match provider.create_client().await {
            Ok(_) => panic!("Expected error"),
            Err(e) => e.to_string(),
        };
        assert!(err.contains("openai"));
    }
}
