use crate::types::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a metadata field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    #[serde(alias = "number")]
    Float,
}

impl FieldType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Integer | FieldType::Float)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
        };
        write!(f, "{}", name)
    }
}

/// Description of one filterable metadata field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub description: String,
}

impl AttributeInfo {
    pub fn new(name: &str, field_type: FieldType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            description: description.to_string(),
        }
    }
}

/// Ordered, immutable set of filterable fields.
///
/// Names are unique and the set is non-empty. Order is preserved so the
/// translator prompt lists fields exactly as declared.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    fields: Vec<AttributeInfo>,
}

impl FieldSchema {
    pub fn new(fields: Vec<AttributeInfo>) -> Result<Self> {
        if fields.is_empty() {
            return Err(AppError::InvalidInput(
                "Field schema must declare at least one field".to_string(),
            ));
        }
        for (i, field) in fields.iter().enumerate() {
            if field.name.trim().is_empty() {
                return Err(AppError::InvalidInput(
                    "Field schema contains an empty field name".to_string(),
                ));
            }
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(AppError::InvalidInput(format!(
                    "Duplicate field '{}' in schema",
                    field.name
                )));
            }
        }
        Ok(Self { fields })
    }

    /// Schema of the video metadata documents.
    pub fn video_metadata() -> Self {
        Self {
            fields: vec![
                AttributeInfo::new("title", FieldType::String, "Video title"),
                AttributeInfo::new("author", FieldType::String, "Video author (uploader name)"),
                AttributeInfo::new("view_count", FieldType::Integer, "Number of views"),
                AttributeInfo::new("length", FieldType::Integer, "Video length in seconds"),
            ],
        }
    }

    pub fn get(&self, name: &str) -> Option<&AttributeInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn fields(&self) -> &[AttributeInfo] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
