//! TOML-based configuration
//!
//! All runtime settings live in one file (`selfquery.toml` by default).
//! Secrets are never stored in the file: sections name the environment
//! variable that holds the key (`api_key_env`), and the variable is resolved
//! and checked when the configuration is validated.

use crate::db::vectorstore::VectorStoreProvider;
use crate::llm::{ModelParams, Provider};
use crate::rag::embeddings::EmbeddingBackend;
use crate::selfquery::schema::{AttributeInfo, FieldSchema};
use crate::sources::bilibili::{self, ClientOptions};
use crate::sources::pacer::RequestPacer;
use crate::types::AppError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure loaded from selfquery.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub rag: RagConfig,

    #[serde(default)]
    pub retriever: RetrieverConfig,

    #[serde(default)]
    pub source: SourceConfig,
}

// ============= Logging Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ============= LLM Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmKind {
    OpenAI,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "type", default = "default_llm_kind")]
    pub kind: LlmKind,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Endpoint; defaults to DashScope compatible mode or local Ollama
    pub api_base: Option<String>,

    /// Environment variable containing the API key (openai only)
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_kind() -> LlmKind {
    LlmKind::OpenAI
}

fn default_llm_model() -> String {
    "qwen3-max".to_string()
}

fn default_api_key_env() -> String {
    "DASHSCOPE_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_llm_timeout() -> u64 {
    60
}

pub const DEFAULT_OPENAI_BASE: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            kind: default_llm_kind(),
            model: default_llm_model(),
            api_base: None,
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

// ============= Embedding Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingKind {
    OpenAI,
    FastEmbed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(rename = "type", default = "default_embedding_kind")]
    pub kind: EmbeddingKind,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    pub api_base: Option<String>,

    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// L2-normalise every vector
    #[serde(default = "default_true")]
    pub normalize: bool,

    /// LRU cache capacity; 0 disables caching
    #[serde(default = "default_cache_entries")]
    pub cache_entries: usize,

    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

/// Local fastembed when compiled in, otherwise the DashScope embedding endpoint.
fn default_embedding_kind() -> EmbeddingKind {
    if cfg!(feature = "local-embeddings") {
        EmbeddingKind::FastEmbed
    } else {
        EmbeddingKind::OpenAI
    }
}

pub const DEFAULT_FASTEMBED_MODEL: &str = "BAAI/bge-small-zh-v1.5";
pub const DEFAULT_OPENAI_EMBEDDING_MODEL: &str = "text-embedding-v3";

fn default_embedding_model() -> String {
    match default_embedding_kind() {
        EmbeddingKind::FastEmbed => DEFAULT_FASTEMBED_MODEL.to_string(),
        EmbeddingKind::OpenAI => DEFAULT_OPENAI_EMBEDDING_MODEL.to_string(),
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_entries() -> usize {
    1024
}

fn default_embedding_timeout() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            kind: default_embedding_kind(),
            model: default_embedding_model(),
            api_base: None,
            api_key_env: default_api_key_env(),
            normalize: true,
            cache_entries: default_cache_entries(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

// ============= RAG Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Persist the vector store here; in-memory only when unset
    pub snapshot_path: Option<PathBuf>,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_top_k() -> usize {
    3
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            snapshot_path: None,
        }
    }
}

// ============= Retriever Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieverConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    #[serde(default = "default_true")]
    pub enable_limit: bool,

    /// One-line description of what the documents contain
    #[serde(default = "default_document_contents")]
    pub document_contents: String,

    /// Filterable metadata fields, in prompt order
    #[serde(default = "default_fields")]
    pub fields: Vec<AttributeInfo>,

    /// Queries run by `videos` when none are given on the command line
    #[serde(default = "default_queries")]
    pub queries: Vec<String>,
}

fn default_limit() -> usize {
    crate::selfquery::retriever::DEFAULT_LIMIT
}

fn default_document_contents() -> String {
    "Video metadata recording each video's title, author, view count and duration".to_string()
}

fn default_fields() -> Vec<AttributeInfo> {
    FieldSchema::video_metadata().fields().to_vec()
}

fn default_queries() -> Vec<String> {
    [
        "the shortest video",
        "videos longer than 600 seconds",
        "the most viewed video",
        "videos whose author is 'Datawhale'",
    ]
    .iter()
    .map(|q| q.to_string())
    .collect()
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            enable_limit: true,
            document_contents: default_document_contents(),
            fields: default_fields(),
            queries: default_queries(),
        }
    }
}

// ============= Source Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_base")]
    pub base_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_referer")]
    pub referer: String,

    #[serde(default = "default_source_timeout")]
    pub timeout_secs: u64,

    /// Minimum gap between consecutive API requests
    #[serde(default = "default_request_interval")]
    pub request_interval_ms: u64,

    #[serde(default = "default_videos")]
    pub videos: Vec<String>,
}

fn default_source_base() -> String {
    bilibili::DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    bilibili::DEFAULT_USER_AGENT.to_string()
}

fn default_referer() -> String {
    bilibili::DEFAULT_REFERER.to_string()
}

fn default_source_timeout() -> u64 {
    10
}

fn default_request_interval() -> u64 {
    1000
}

fn default_videos() -> Vec<String> {
    [
        "https://www.bilibili.com/video/BV1Bo4y1A7FU",
        "https://www.bilibili.com/video/BV1ug4y157xA",
        "https://www.bilibili.com/video/BV1yh411V7ge",
    ]
    .iter()
    .map(|u| u.to_string())
    .collect()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_source_base(),
            user_agent: default_user_agent(),
            referer: default_referer(),
            timeout_secs: default_source_timeout(),
            request_interval_ms: default_request_interval(),
            videos: default_videos(),
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),

    #[error("{0} support is not compiled in; rebuild with the '{1}' feature")]
    FeatureDisabled(String, String),
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

impl AppConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file without validating it
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load `path` if it exists, otherwise fall back to defaults. Either way
    /// the result is validated.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Validate the configuration for internal consistency and env var availability
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rag.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "rag.chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                self.rag.chunk_overlap, self.rag.chunk_size
            )));
        }
        if self.rag.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "rag.top_k must be at least 1".to_string(),
            ));
        }
        if self.retriever.default_limit == 0 {
            return Err(ConfigError::ValidationError(
                "retriever.default_limit must be at least 1".to_string(),
            ));
        }
        self.field_schema()?;

        match self.llm.kind {
            LlmKind::OpenAI => {
                Self::require_feature(cfg!(feature = "openai"), "OpenAI LLM", "openai")?;
                self.validate_env_var(&self.llm.api_key_env)?;
            }
            LlmKind::Ollama => {
                Self::require_feature(cfg!(feature = "ollama"), "Ollama LLM", "ollama")?;
            }
        }

        match self.embedding.kind {
            EmbeddingKind::OpenAI => {
                Self::require_feature(cfg!(feature = "openai"), "OpenAI embeddings", "openai")?;
                self.validate_env_var(&self.embedding.api_key_env)?;
            }
            EmbeddingKind::FastEmbed => {
                Self::require_feature(
                    cfg!(feature = "local-embeddings"),
                    "fastembed embeddings",
                    "local-embeddings",
                )?;
            }
        }

        Ok(())
    }

    fn require_feature(enabled: bool, what: &str, feature: &str) -> Result<(), ConfigError> {
        if enabled {
            Ok(())
        } else {
            Err(ConfigError::FeatureDisabled(what.to_string(), feature.to_string()))
        }
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
        Ok(())
    }

    /// Get a resolved value from an env var reference
    pub fn resolve_env(&self, env_name: &str) -> Result<String, ConfigError> {
        std::env::var(env_name).map_err(|_| ConfigError::MissingEnvVar(env_name.to_string()))
    }

    /// The configured metadata schema.
    pub fn field_schema(&self) -> Result<FieldSchema, ConfigError> {
        FieldSchema::new(self.retriever.fields.clone())
            .map_err(|e| ConfigError::ValidationError(format!("retriever.fields: {}", e)))
    }

    /// Build the LLM provider, resolving its API key.
    pub fn llm_provider(&self) -> Result<Provider, ConfigError> {
        let params = ModelParams {
            temperature: Some(self.llm.temperature),
            max_tokens: Some(self.llm.max_tokens),
            timeout_secs: Some(self.llm.timeout_secs),
        };

        Ok(match self.llm.kind {
            LlmKind::OpenAI => Provider::OpenAI {
                api_key: self.resolve_env(&self.llm.api_key_env)?,
                api_base: self
                    .llm
                    .api_base
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE.to_string()),
                model: self.llm.model.clone(),
                params,
            },
            LlmKind::Ollama => Provider::Ollama {
                base_url: self
                    .llm
                    .api_base
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
                model: self.llm.model.clone(),
                params,
            },
        })
    }

    /// Build the embedding backend, resolving its API key.
    pub fn embedding_backend(&self) -> Result<EmbeddingBackend, ConfigError> {
        Ok(match self.embedding.kind {
            EmbeddingKind::OpenAI => EmbeddingBackend::OpenAI {
                api_key: self.resolve_env(&self.embedding.api_key_env)?,
                api_base: self
                    .embedding
                    .api_base
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE.to_string()),
                model: self.embedding.model.clone(),
                normalize: self.embedding.normalize,
                timeout_secs: Some(self.embedding.timeout_secs),
            },
            EmbeddingKind::FastEmbed => EmbeddingBackend::FastEmbed {
                model: self.embedding.model.clone(),
                normalize: self.embedding.normalize,
            },
        })
    }

    pub fn vector_store_provider(&self) -> VectorStoreProvider {
        match &self.rag.snapshot_path {
            Some(path) => VectorStoreProvider::Snapshot { path: path.clone() },
            None => VectorStoreProvider::InMemory,
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            base_url: self.source.base_url.clone(),
            user_agent: self.source.user_agent.clone(),
            referer: self.source.referer.clone(),
            timeout: Duration::from_secs(self.source.timeout_secs),
        }
    }

    pub fn request_pacer(&self) -> RequestPacer {
        RequestPacer::new(Duration::from_millis(self.source.request_interval_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selfquery::schema::FieldType;

    const OLLAMA_ONLY: &str = r#"
[llm]
type = "ollama"
model = "qwen3"

[embedding]
type = "openai"
model = "text-embedding-v4"
api_key_env = "SELFQUERY_TEST_EMBED_KEY"
"#;

    #[test]
    fn test_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.llm.kind, LlmKind::OpenAI);
        assert_eq!(config.llm.model, "qwen3-max");
        assert!((config.llm.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.llm.max_tokens, 2048);
        if cfg!(feature = "local-embeddings") {
            assert_eq!(config.embedding.kind, EmbeddingKind::FastEmbed);
            assert_eq!(config.embedding.model, DEFAULT_FASTEMBED_MODEL);
        } else {
            assert_eq!(config.embedding.kind, EmbeddingKind::OpenAI);
            assert_eq!(config.embedding.model, "text-embedding-v3");
        }
        assert_eq!(config.rag.chunk_size, 1000);
        assert_eq!(config.rag.chunk_overlap, 200);
        assert_eq!(config.rag.top_k, 3);
        assert_eq!(config.retriever.default_limit, 4);
        assert_eq!(config.source.timeout_secs, 10);
        assert_eq!(config.source.request_interval_ms, 1000);
        assert_eq!(config.source.videos.len(), 3);
        assert_eq!(config.field_schema().unwrap(), FieldSchema::video_metadata());
    }

    #[test]
    fn test_parse_custom_fields() {
        let content = r#"
[retriever]
document_contents = "Short films"
enable_limit = false

[[retriever.fields]]
name = "director"
type = "string"
description = "Director name"

[[retriever.fields]]
name = "rating"
type = "float"
description = "Average rating"
"#;
        let config: AppConfig = toml::from_str(content).unwrap();
        let schema = config.field_schema().unwrap();

        assert_eq!(schema.len(), 2);
        assert_eq!(schema.get("rating").unwrap().field_type, FieldType::Float);
        assert!(!config.retriever.enable_limit);
    }

    #[test]
    fn test_validation_rejects_bad_chunking() {
        let mut config = AppConfig::default();
        config.rag.chunk_overlap = 1000;

        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validation_rejects_duplicate_fields() {
        let mut config = AppConfig::default();
        config.retriever.fields.push(config.retriever.fields[0].clone());

        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[cfg(feature = "openai")]
    #[test]
    fn test_default_config_validates_with_default_features() {
        std::env::set_var("DASHSCOPE_API_KEY", "sk-test");

        let config = AppConfig::default();
        assert!(config.validate().is_ok(), "{:?}", config.validate());

        let parsed: AppConfig = toml::from_str("").unwrap();
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_validation_missing_env_var() {
        let config: AppConfig = toml::from_str(OLLAMA_ONLY).unwrap();
        std::env::remove_var("SELFQUERY_TEST_EMBED_KEY");

        if cfg!(all(feature = "ollama", feature = "openai")) {
            assert!(matches!(
                config.validate(),
                Err(ConfigError::MissingEnvVar(name)) if name == "SELFQUERY_TEST_EMBED_KEY"
            ));
        }
    }

    #[test]
    fn test_providers_from_config() {
        std::env::set_var("SELFQUERY_TEST_LLM_KEY", "sk-test");
        let content = r#"
[llm]
type = "openai"
api_key_env = "SELFQUERY_TEST_LLM_KEY"
api_base = "http://localhost:9999/v1"
"#;
        let config: AppConfig = toml::from_str(content).unwrap();

        match config.llm_provider().unwrap() {
            Provider::OpenAI {
                api_key,
                api_base,
                model,
                params,
            } => {
                assert_eq!(api_key, "sk-test");
                assert_eq!(api_base, "http://localhost:9999/v1");
                assert_eq!(model, "qwen3-max");
                assert_eq!(params.max_tokens, Some(2048));
            }
            other => panic!("unexpected provider {:?}", other),
        }

        let ollama: AppConfig = toml::from_str("[llm]\ntype = \"ollama\"").unwrap();
        match ollama.llm_provider().unwrap() {
            Provider::Ollama { base_url, .. } => assert_eq!(base_url, DEFAULT_OLLAMA_URL),
            other => panic!("unexpected provider {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let result = AppConfig::load("/nonexistent/selfquery.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_snapshot_path_selects_provider() {
        let mut config = AppConfig::default();
        assert!(matches!(
            config.vector_store_provider(),
            VectorStoreProvider::InMemory
        ));

        config.rag.snapshot_path = Some(PathBuf::from("data/videos.snapshot.json"));
        assert!(matches!(
            config.vector_store_provider(),
            VectorStoreProvider::Snapshot { .. }
        ));
    }
}
