//! Natural-language query → [`StructuredQuery`] translation.
//!
//! The LLM is asked for a single JSON object:
//!
//! ```text
//! {"query": "<text to embed>", "filter": null | <comparison> | {"and": [..]} | {"or": [..]}, "limit": <int> | null}
//! ```
//!
//! Whatever comes back is validated against the [`FieldSchema`]. Output that
//! fails to parse or validate degrades to "no filter, no limit" and the
//! reason is reported in [`Translation::rejected`]. Transport failures are not
//! degraded; they propagate as [`crate::types::AppError::ProviderUnavailable`].

use crate::llm::LLMClient;
use crate::selfquery::filter::{FilterExpr, Operator, StructuredQuery, TranslationError};
use crate::selfquery::schema::{FieldSchema, FieldType};
use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::debug;

/// Filter value meaning "no filter".
pub const NO_FILTER: &str = "NO_FILTER";

/// Outcome of a translation.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    /// The query to run. Unfiltered when `rejected` is set.
    pub structured: StructuredQuery,
    /// Why the model's filter or limit was discarded, if it was.
    pub rejected: Option<TranslationError>,
}

impl Translation {
    fn accepted(structured: StructuredQuery) -> Self {
        Self {
            structured,
            rejected: None,
        }
    }

    fn rejected(query: String, error: TranslationError) -> Self {
        Self {
            structured: StructuredQuery {
                query,
                filter: None,
                limit: None,
            },
            rejected: Some(error),
        }
    }

    /// The structured query, or [`AppError::Translation`] if the model's
    /// output was rejected.
    pub fn into_strict(self) -> Result<StructuredQuery> {
        match self.rejected {
            Some(error) => Err(error.into()),
            None => Ok(self.structured),
        }
    }
}

impl From<TranslationError> for AppError {
    fn from(error: TranslationError) -> Self {
        AppError::Translation(error.to_string())
    }
}

/// Turns a natural-language query into a [`StructuredQuery`].
#[async_trait]
pub trait QueryTranslator: Send + Sync {
    async fn translate(&self, query: &str, schema: &FieldSchema) -> Result<Translation>;
}

/// [`QueryTranslator`] backed by an [`LLMClient`].
pub struct LlmQueryTranslator {
    llm: Arc<dyn LLMClient>,
    document_contents: String,
    enable_limit: bool,
}

impl LlmQueryTranslator {
    pub fn new(llm: Arc<dyn LLMClient>, document_contents: &str) -> Self {
        Self {
            llm,
            document_contents: document_contents.to_string(),
            enable_limit: true,
        }
    }

    /// When disabled the model is not asked for a limit and any it returns is ignored.
    pub fn with_limit(mut self, enable_limit: bool) -> Self {
        self.enable_limit = enable_limit;
        self
    }

    pub fn system_prompt(&self, schema: &FieldSchema) -> String {
        build_system_prompt(&self.document_contents, schema, self.enable_limit)
    }
}

#[async_trait]
impl QueryTranslator for LlmQueryTranslator {
    async fn translate(&self, query: &str, schema: &FieldSchema) -> Result<Translation> {
        let system = self.system_prompt(schema);
        let prompt = format!("User query: {}\nStructured request:", query);

        let raw = self.llm.generate_with_system(&system, &prompt).await?;
        debug!(model = self.llm.model_name(), raw = %raw, "Translator output");

        Ok(parse_translation(&raw, query, schema, self.enable_limit))
    }
}

// ============================================================================
// Prompt
// ============================================================================

const EXAMPLES: &str = r#"Example 1
Data source: songs. Fields: artist (string), length (integer, seconds), genre (string)
User query: songs by Taylor Swift or Katy Perry about teenage romance under 3 minutes long in the dance pop genre
Structured request:
```json
{"query": "teenager love", "filter": {"and": [{"or": [{"attribute": "artist", "operator": "eq", "value": "Taylor Swift"}, {"attribute": "artist", "operator": "eq", "value": "Katy Perry"}]}, {"attribute": "length", "operator": "lt", "value": 180}, {"attribute": "genre", "operator": "eq", "value": "pop"}]}, "limit": null}
```

Example 2
Data source: songs. Fields: artist (string), length (integer, seconds), genre (string)
User query: what are songs that were not published on Spotify
Structured request:
```json
{"query": "songs not published on Spotify", "filter": null, "limit": null}
```
"#;

const LIMIT_EXAMPLE: &str = r#"
Example 3
Data source: songs. Fields: artist (string), length (integer, seconds), genre (string)
User query: two songs by Taylor Swift
Structured request:
```json
{"query": "", "filter": {"attribute": "artist", "operator": "eq", "value": "Taylor Swift"}, "limit": 2}
```
"#;

fn operators_for(field_type: FieldType) -> String {
    Operator::ALL
        .iter()
        .filter(|op| op.allowed_for(field_type))
        .map(|op| op.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Instruction sent as the system message. Lists fields in schema order.
pub fn build_system_prompt(document_contents: &str, schema: &FieldSchema, enable_limit: bool) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "Your goal is to structure the user's query to match the request schema below.\n\n\
         Respond with a single JSON object in a ```json fenced block with these keys:\n\
         - \"query\": text string to compare to document contents, without the filter conditions (may be empty)\n\
         - \"filter\": null, one comparison, or a composite\n",
    );
    if enable_limit {
        prompt.push_str("- \"limit\": the number of documents to retrieve, or null when the user does not ask for a number\n");
    } else {
        prompt.push_str("- \"limit\": always null\n");
    }
    prompt.push_str(
        "\nA comparison is {\"attribute\": <field>, \"operator\": <operator>, \"value\": <literal>}.\n\
         A composite is {\"and\": [<filter>, ...]} or {\"or\": [<filter>, ...]} with at least one item.\n\
         Use only the fields listed below and only the operators allowed for each field's type.\n\
         String literals are JSON strings; integer fields take JSON integers.\n\
         If there are no filter conditions, set \"filter\" to null.\n\n",
    );

    let _ = writeln!(prompt, "Data source: {}", document_contents);
    prompt.push_str("Fields:\n");
    for field in schema.fields() {
        let _ = writeln!(
            prompt,
            "- {} ({}): {}. Operators: {}",
            field.name,
            field.field_type,
            field.description,
            operators_for(field.field_type)
        );
    }

    prompt.push('\n');
    prompt.push_str(EXAMPLES);
    if enable_limit {
        prompt.push_str(LIMIT_EXAMPLE);
    }
    prompt
}

// ============================================================================
// Output parsing
// ============================================================================

/// Strip `<think>...</think>` reasoning blocks some models emit.
fn strip_reasoning(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find("<think>") {
        out.push_str(&rest[..start]);
        match rest[start..].find("</think>") {
            Some(end) => rest = &rest[start + end + "</think>".len()..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

/// The JSON payload of a model response: a fenced json block if present,
/// else the outermost `{...}` span.
pub fn extract_json(raw: &str) -> Option<&str> {
    if let Some(start) = raw.find("```json") {
        let body = &raw[start + "```json".len()..];
        if let Some(end) = body.find("```") {
            return Some(body[..end].trim());
        }
    }

    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

fn parse_filter(value: Option<&Value>, schema: &FieldSchema) -> std::result::Result<Option<FilterExpr>, TranslationError> {
    let value = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() || s.trim() == NO_FILTER => return Ok(None),
        Some(Value::String(s)) => {
            return Err(TranslationError::Unparseable(format!(
                "filter must be an object, got string '{}'",
                s
            )))
        }
        Some(v) => v,
    };

    let filter: FilterExpr = serde_json::from_value(value.clone())
        .map_err(|e| TranslationError::Unparseable(format!("invalid filter: {}", e)))?;
    filter.validate(schema)?;
    Ok(Some(filter))
}

fn parse_limit(value: Option<&Value>) -> std::result::Result<Option<usize>, TranslationError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => match v.as_i64() {
            Some(n) if n >= 1 => Ok(Some(n as usize)),
            Some(n) => Err(TranslationError::InvalidLimit(n)),
            None => Err(TranslationError::Unparseable(format!(
                "limit must be an integer, got {}",
                v
            ))),
        },
    }
}

/// Parse and validate raw model output for `original_query`.
///
/// Never fails: anything unusable yields an unfiltered query with
/// [`Translation::rejected`] set.
pub fn parse_translation(
    raw: &str,
    original_query: &str,
    schema: &FieldSchema,
    enable_limit: bool,
) -> Translation {
    let cleaned = strip_reasoning(raw);
    let fallback_query = original_query.trim().to_string();

    let json = match extract_json(&cleaned) {
        Some(json) => json,
        None => {
            return Translation::rejected(
                fallback_query,
                TranslationError::Unparseable("no JSON object in model output".to_string()),
            )
        }
    };

    let object = match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            return Translation::rejected(
                fallback_query,
                TranslationError::Unparseable(format!("expected a JSON object, got {}", other)),
            )
        }
        Err(e) => {
            return Translation::rejected(fallback_query, TranslationError::Unparseable(e.to_string()))
        }
    };

    let query = match object.get("query") {
        Some(Value::String(q)) if !q.trim().is_empty() => q.trim().to_string(),
        _ => fallback_query.clone(),
    };

    let filter = match parse_filter(object.get("filter"), schema) {
        Ok(filter) => filter,
        Err(e) => return Translation::rejected(fallback_query, e),
    };

    let limit = if enable_limit {
        match parse_limit(object.get("limit")) {
            Ok(limit) => limit,
            Err(e) => return Translation::rejected(fallback_query, e),
        }
    } else {
        None
    };

    Translation::accepted(StructuredQuery { query, filter, limit })
}
