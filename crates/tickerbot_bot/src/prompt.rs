//! Prompt rendering.

use minijinja::{Environment, context};
use std::path::Path;
use tickerbot_error::TemplateError;
use tracing::{debug, instrument};

/// Template used when no prompt file is configured.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "\
You are a financial analyst writing the daily market briefing for {{ date }}.
{%- if language %} Write the briefing in {{ language }}.{% endif %}

Latest closing prices and daily changes:
{{ data }}

Write a concise report with three sections:
1. Overall market trend.
2. Commentary on each symbol above, citing its price move.
3. Risks and opportunities to watch in the coming sessions.

Keep it under 600 words. Do not invent figures that are not in the data.";

/// A minijinja prompt template with `date`, `data` and `language` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            source: DEFAULT_PROMPT_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplate {
    /// Compile-check and wrap a template source.
    ///
    /// # Errors
    ///
    /// Returns an error if the source has a syntax error.
    pub fn new(source: impl Into<String>) -> Result<Self, TemplateError> {
        let source = source.into();
        Environment::new()
            .template_from_str(&source)
            .map_err(|e| TemplateError::new(format!("invalid prompt template: {e}")))?;
        Ok(Self { source })
    }

    /// Load a template from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not compile.
    #[instrument]
    pub fn from_file(path: &Path) -> Result<Self, TemplateError> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            TemplateError::new(format!(
                "failed to read prompt template {}: {e}",
                path.display()
            ))
        })?;
        debug!(chars = source.len(), "Loaded prompt template");
        Self::new(source)
    }

    /// The built-in template, or the one at `path` when given.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured file cannot be loaded.
    pub fn from_optional_file(path: Option<&Path>) -> Result<Self, TemplateError> {
        path.map_or_else(|| Ok(Self::default()), Self::from_file)
    }

    /// Template source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render the prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails, e.g. on a bad filter call.
    pub fn render(
        &self,
        date: &str,
        data: &str,
        language: Option<&str>,
    ) -> Result<String, TemplateError> {
        Environment::new()
            .render_str(&self.source, context! { date, data, language })
            .map_err(|e| TemplateError::new(format!("failed to render prompt: {e}")))
    }
}
