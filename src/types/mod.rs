use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============= Document Types =============

/// A single metadata value attached to a [`Document`].
///
/// Serialized untagged, so `{"view_count": 1000, "author": "x"}` round-trips
/// through JSON without type annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Integer(i64),
    Float(f64),
    String(String),
}

impl MetadataValue {
    /// Numeric view of the value, if it is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Integer(i) => Some(*i as f64),
            MetadataValue::Float(f) => Some(*f),
            MetadataValue::String(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Short type label used in error messages and prompts.
    pub fn type_name(&self) -> &'static str {
        match self {
            MetadataValue::Integer(_) => "integer",
            MetadataValue::Float(_) => "float",
            MetadataValue::String(_) => "string",
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Integer(i) => write!(f, "{}", i),
            MetadataValue::Float(v) => write!(f, "{}", v),
            MetadataValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::String(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Integer(value)
    }
}

impl From<i32> for MetadataValue {
    fn from(value: i32) -> Self {
        MetadataValue::Integer(i64::from(value))
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

/// A piece of text with structured metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, MetadataValue>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Builder-style metadata insertion.
    pub fn with_metadata(mut self, key: &str, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.metadata.get(key)
    }
}

/// A document returned from a similarity search, with its score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document: Document,
    /// Similarity to the query vector (higher is more similar)
    pub score: f32,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// External document or metadata fetch failed, or the API returned an error code
    #[error("Source fetch error: {0}")]
    SourceFetch(String),

    /// The language model produced unparseable or schema-invalid structured output
    #[error("Translation error: {0}")]
    Translation(String),

    /// An embedding or language-model network call failed
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_value_untagged_json() {
        let doc = Document::new("hello")
            .with_metadata("author", "Datawhale")
            .with_metadata("view_count", 1000_i64)
            .with_metadata("rating", 4.5);

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["metadata"]["author"], "Datawhale");
        assert_eq!(json["metadata"]["view_count"], 1000);

        let back: Document = serde_json::from_value(json).unwrap();
        assert_eq!(back.get("view_count"), Some(&MetadataValue::Integer(1000)));
        assert_eq!(back.get("rating"), Some(&MetadataValue::Float(4.5)));
        assert_eq!(back, doc);
    }

    #[test]
    fn test_metadata_value_accessors() {
        assert_eq!(MetadataValue::Integer(3).as_f64(), Some(3.0));
        assert_eq!(MetadataValue::from("x").as_f64(), None);
        assert_eq!(MetadataValue::from("x").as_str(), Some("x"));
        assert_eq!(MetadataValue::Float(1.5).type_name(), "float");
    }

    #[test]
    fn test_error_display() {
        let err = AppError::SourceFetch("code -404".to_string());
        assert_eq!(err.to_string(), "Source fetch error: code -404");
    }
}
