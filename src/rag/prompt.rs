use crate::types::{AppError, Result};
use std::collections::HashMap;

/// Answer template used by the document QA chain.
pub const DEFAULT_QA_TEMPLATE: &str = "\
Answer the question using only the context below.
If the context does not contain the answer, reply exactly with:
\"Sorry, I could not find an answer to that in the provided material.\"

Context:
{context}

Question: {question}

Answer:";

/// Text with `{name}` placeholders.
///
/// `{{` and `}}` render as literal braces.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
    variables: Vec<String>,
}

impl PromptTemplate {
    /// Parse a template, recording its placeholder names.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidInput`] on an unclosed `{` or an empty `{}`.
    pub fn new(template: &str) -> Result<Self> {
        let mut variables: Vec<String> = Vec::new();
        render(template, |name, _| {
            if !variables.iter().any(|v| v == name) {
                variables.push(name.to_string());
            }
            Ok(())
        })?;

        Ok(Self {
            template: template.to_string(),
            variables,
        })
    }

    pub fn qa() -> Self {
        Self {
            template: DEFAULT_QA_TEMPLATE.to_string(),
            variables: vec!["context".to_string(), "question".to_string()],
        }
    }

    /// Placeholder names in order of first appearance.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Substitute every placeholder.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidInput`] if a placeholder has no value.
    pub fn format(&self, vars: &HashMap<&str, String>) -> Result<String> {
        render(&self.template, |name, out| {
            let value = vars.get(name).ok_or_else(|| {
                AppError::InvalidInput(format!("Missing template variable '{}'", name))
            })?;
            out.push_str(value);
            Ok(())
        })
    }
}

/// Copy `template` to a new string, letting `on_var` write each `{name}`.
fn render(
    template: &str,
    mut on_var: impl FnMut(&str, &mut String) -> Result<()>,
) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if tail.starts_with("{{") || tail.starts_with("}}") {
            out.push_str(&tail[..1]);
            rest = &tail[2..];
        } else if tail.starts_with('}') {
            out.push('}');
            rest = &tail[1..];
        } else {
            let end = tail.find('}').ok_or_else(|| {
                AppError::InvalidInput("Unclosed '{' in prompt template".to_string())
            })?;
            let name = tail[1..end].trim();
            if name.is_empty() {
                return Err(AppError::InvalidInput(
                    "Empty placeholder in prompt template".to_string(),
                ));
            }
            on_var(name, &mut out)?;
            rest = &tail[end + 1..];
        }
    }
    out.push_str(rest);
    Ok(out)
}
