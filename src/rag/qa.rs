use crate::llm::LLMClient;
use crate::rag::index::DocumentIndex;
use crate::rag::prompt::PromptTemplate;
use crate::types::{AppError, Document, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Number of chunks retrieved per question by default.
pub const DEFAULT_TOP_K: usize = 3;

/// An answered question with the chunks it was grounded on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
    pub sources: Vec<Document>,
}

/// Retrieve-then-generate question answering over a [`DocumentIndex`].
pub struct QaChain {
    index: DocumentIndex,
    llm: Arc<dyn LLMClient>,
    template: PromptTemplate,
    top_k: usize,
}

impl QaChain {
    pub fn new(index: DocumentIndex, llm: Arc<dyn LLMClient>) -> Self {
        Self {
            index,
            llm,
            template: PromptTemplate::qa(),
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::InvalidInput("Question cannot be empty".to_string()));
        }

        let hits = self.index.similarity_search(question, self.top_k, None).await?;
        let context = hits
            .iter()
            .map(|hit| hit.document.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        debug!(chunks = hits.len(), context_chars = context.len(), "Assembled QA context");

        let vars = HashMap::from([("context", context), ("question", question.to_string())]);
        let prompt = self.template.format(&vars)?;
        let answer = self.llm.generate(&prompt).await?;

        info!(model = self.llm.model_name(), sources = hits.len(), "Answered question");
        Ok(Answer {
            question: question.to_string(),
            answer: answer.trim().to_string(),
            sources: hits.into_iter().map(|hit| hit.document).collect(),
        })
    }
}
