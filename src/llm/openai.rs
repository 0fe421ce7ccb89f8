use crate::llm::client::{LLMClient, ModelParams};
use crate::types::{AppError, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

/// Build the async-openai client shared by the chat and embedding wrappers.
pub(crate) fn build_client(
    api_key: String,
    api_base: String,
    timeout_secs: Option<u64>,
) -> Result<Client<OpenAIConfig>> {
    let config = OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base(api_base);

    let mut http = reqwest::Client::builder();
    if let Some(secs) = timeout_secs {
        http = http.timeout(Duration::from_secs(secs));
    }
    let http = http
        .build()
        .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

    Ok(Client::with_config(config).with_http_client(http))
}

pub struct OpenAIClient {
    client: Client<OpenAIConfig>,
    model: String,
    params: ModelParams,
}

impl OpenAIClient {
    pub fn new(api_key: String, api_base: String, model: String, params: ModelParams) -> Result<Self> {
        Ok(Self {
            client: build_client(api_key, api_base, params.timeout_secs)?,
            model,
            params,
        })
    }

    async fn chat(&self, messages: Vec<ChatCompletionRequestMessage>) -> Result<String> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model).messages(messages);
        if let Some(temperature) = self.params.temperature {
            args.temperature(temperature);
        }
        if let Some(max_tokens) = self.params.max_tokens {
            #[allow(deprecated)]
            args.max_tokens(max_tokens);
        }
        let request = args
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AppError::ProviderUnavailable(format!("OpenAI API error: {}", e)))?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| AppError::ProviderUnavailable("No response from OpenAI".to_string()))?;

        // A reply without text content is still a reply
        match &choice.message.content {
            Some(content) => Ok(content.clone()),
            None => {
                warn!(model = %self.model, "Chat completion returned no content");
                Ok(String::new())
            }
        }
    }
}

fn user_message(content: &str) -> Result<ChatCompletionRequestMessage> {
    Ok(ChatCompletionRequestUserMessageArgs::default()
        .content(content)
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build message: {}", e)))?
        .into())
}

fn system_message(content: &str) -> Result<ChatCompletionRequestMessage> {
    Ok(ChatCompletionRequestSystemMessageArgs::default()
        .content(content)
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build message: {}", e)))?
        .into())
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.chat(vec![user_message(prompt)?]).await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.chat(vec![system_message(system)?, user_message(prompt)?])
            .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
