//! LLM Provider Clients and Abstractions
//!
//! This module provides a unified interface for the language models used for
//! answer generation and for self-query filter translation.
//!
//! # Architecture
//!
//! - [`LLMClient`] - The core trait that all providers implement
//! - [`Provider`] - Runtime provider selection, built from configuration
//!
//! # Supported Providers
//!
//! Enable providers via Cargo features:
//! - `openai` - OpenAI API and compatible endpoints (Qwen via DashScope, DeepSeek, ...)
//! - `ollama` - Local Ollama server
//!
//! # Example
//!
//! ```ignore
//! use selfquery::llm::{ModelParams, Provider};
//!
//! let client = Provider::Ollama {
//!     base_url: "http://localhost:11434".to_string(),
//!     model: "qwen3".to_string(),
//!     params: ModelParams::default(),
//! }
//! .create_client()
//! .await?;
//!
//! let answer = client.generate("What is 2+2?").await?;
//! ```

/// Core LLM client trait and provider selection.
pub mod client;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{LLMClient, ModelParams, Provider};
