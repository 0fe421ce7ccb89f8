//! Structured metadata filters.
//!
//! A [`FilterExpr`] is either a single [`Comparison`] or an `and`/`or` of
//! sub-expressions. Filters are validated against a [`FieldSchema`] before
//! they are allowed anywhere near a vector store, and evaluated as hard
//! predicates over [`Document`] metadata.

use crate::selfquery::schema::{FieldSchema, FieldType};
use crate::types::{Document, MetadataValue};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    #[serde(alias = "contains", alias = "like")]
    Contain,
}

impl Operator {
    pub const ALL: [Operator; 7] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::Contain,
    ];

    /// Whether this operator may be applied to a field of `field_type`.
    pub fn allowed_for(&self, field_type: FieldType) -> bool {
        match self {
            Operator::Eq | Operator::Ne => true,
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => field_type.is_numeric(),
            Operator::Contain => field_type == FieldType::String,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Contain => "contain",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `attribute <operator> value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub attribute: String,
    pub operator: Operator,
    pub value: MetadataValue,
}

impl Comparison {
    pub fn new(attribute: &str, operator: Operator, value: impl Into<MetadataValue>) -> Self {
        Self {
            attribute: attribute.to_string(),
            operator,
            value: value.into(),
        }
    }

    fn validate(&self, schema: &FieldSchema) -> Result<(), TranslationError> {
        let field = schema
            .get(&self.attribute)
            .ok_or_else(|| TranslationError::UnknownAttribute(self.attribute.clone()))?;

        if !self.operator.allowed_for(field.field_type) {
            return Err(TranslationError::OperatorNotAllowed {
                attribute: self.attribute.clone(),
                operator: self.operator,
                field_type: field.field_type,
            });
        }

        let value_ok = match (field.field_type, &self.value) {
            (FieldType::String, MetadataValue::String(_)) => true,
            (FieldType::Integer, MetadataValue::Integer(_)) => true,
            (FieldType::Float, MetadataValue::Integer(_) | MetadataValue::Float(_)) => true,
            _ => false,
        };
        if !value_ok {
            return Err(TranslationError::ValueTypeMismatch {
                attribute: self.attribute.clone(),
                expected: field.field_type,
                found: self.value.type_name(),
            });
        }

        Ok(())
    }

    /// Evaluate against a document. A missing attribute never matches.
    pub fn matches(&self, document: &Document) -> bool {
        let Some(actual) = document.get(&self.attribute) else {
            return false;
        };

        match self.operator {
            Operator::Eq => values_equal(actual, &self.value),
            Operator::Ne => !values_equal(actual, &self.value),
            Operator::Gt => compare_numeric(actual, &self.value) == Some(Ordering::Greater),
            Operator::Gte => matches!(
                compare_numeric(actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::Lt => compare_numeric(actual, &self.value) == Some(Ordering::Less),
            Operator::Lte => matches!(
                compare_numeric(actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Operator::Contain => match (actual.as_str(), self.value.as_str()) {
                (Some(haystack), Some(needle)) => haystack.contains(needle),
                _ => false,
            },
        }
    }
}

fn values_equal(a: &MetadataValue, b: &MetadataValue) -> bool {
    match (a, b) {
        (MetadataValue::String(x), MetadataValue::String(y)) => x == y,
        _ => compare_numeric(a, b) == Some(Ordering::Equal),
    }
}

/// Integers compare exactly; mixed integer/float pairs compare as f64.
fn compare_numeric(a: &MetadataValue, b: &MetadataValue) -> Option<Ordering> {
    match (a, b) {
        (MetadataValue::Integer(x), MetadataValue::Integer(y)) => Some(x.cmp(y)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

/// A filter expression tree.
///
/// JSON form: a comparison object, `{"and": [...]}` or `{"or": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterExpr {
    Comparison(Comparison),
    And { and: Vec<FilterExpr> },
    Or { or: Vec<FilterExpr> },
}

impl FilterExpr {
    pub fn comparison(attribute: &str, operator: Operator, value: impl Into<MetadataValue>) -> Self {
        FilterExpr::Comparison(Comparison::new(attribute, operator, value))
    }

    /// Check every attribute, operator and literal against the schema.
    pub fn validate(&self, schema: &FieldSchema) -> Result<(), TranslationError> {
        match self {
            FilterExpr::Comparison(c) => c.validate(schema),
            FilterExpr::And { and: items } | FilterExpr::Or { or: items } => {
                if items.is_empty() {
                    return Err(TranslationError::EmptyComposite);
                }
                items.iter().try_for_each(|item| item.validate(schema))
            }
        }
    }

    pub fn matches(&self, document: &Document) -> bool {
        match self {
            FilterExpr::Comparison(c) => c.matches(document),
            FilterExpr::And { and } => and.iter().all(|f| f.matches(document)),
            FilterExpr::Or { or } => or.iter().any(|f| f.matches(document)),
        }
    }

    /// Attribute names referenced anywhere in the expression.
    pub fn attributes(&self) -> Vec<&str> {
        match self {
            FilterExpr::Comparison(c) => vec![c.attribute.as_str()],
            FilterExpr::And { and: items } | FilterExpr::Or { or: items } => {
                items.iter().flat_map(|f| f.attributes()).collect()
            }
        }
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, items) = match self {
            FilterExpr::Comparison(c) => {
                return match &c.value {
                    MetadataValue::String(s) => {
                        write!(f, "{}(\"{}\", \"{}\")", c.operator, c.attribute, s)
                    }
                    other => write!(f, "{}(\"{}\", {})", c.operator, c.attribute, other),
                };
            }
            FilterExpr::And { and } => ("and", and),
            FilterExpr::Or { or } => ("or", or),
        };
        write!(f, "{}(", name)?;
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item)?;
        }
        write!(f, ")")
    }
}

/// Result of translating a natural-language query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredQuery {
    /// Text to embed for the similarity part of the search
    pub query: String,
    pub filter: Option<FilterExpr>,
    pub limit: Option<usize>,
}

impl StructuredQuery {
    /// A query with no filter and no limit.
    pub fn unfiltered(query: &str) -> Self {
        Self {
            query: query.to_string(),
            filter: None,
            limit: None,
        }
    }

    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }
}

/// Why a model's structured output was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TranslationError {
    #[error("model output could not be parsed: {0}")]
    Unparseable(String),

    #[error("filter references unknown attribute '{0}'")]
    UnknownAttribute(String),

    #[error("operator '{operator}' is not allowed on {field_type} attribute '{attribute}'")]
    OperatorNotAllowed {
        attribute: String,
        operator: Operator,
        field_type: FieldType,
    },

    #[error("attribute '{attribute}' expects a {expected} value, got {found}")]
    ValueTypeMismatch {
        attribute: String,
        expected: FieldType,
        found: &'static str,
    },

    #[error("composite filter has no conditions")]
    EmptyComposite,

    #[error("limit must be a positive integer, got {0}")]
    InvalidLimit(i64),
}
