//! Prompt catalog
//!
//! Loads the prompt templates and reason-code tables used by the reflection
//! stages from a YAML document rooted at `respond_score`. The catalog is
//! loaded once at startup and shared read-only afterwards.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::reflection::{Dimension, LetterGrade};
use crate::types::ConfigError;

const ROOT_KEY: &str = "respond_score";
const QUERY_PLACEHOLDER: &str = "{query}";
const ANSWER_PLACEHOLDER: &str = "{answer}";

#[derive(Debug, Deserialize)]
struct PromptFile {
    respond_score: Option<RespondScoreSection>,
}

#[derive(Debug, Deserialize)]
struct RespondScoreSection {
    system_prompt: Option<String>,
    concise_addition: Option<String>,
    user_message_template: Option<String>,
    reason_codes: Option<HashMap<String, HashMap<String, String>>>,
}

/// Named prompt templates and reason codes.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptCatalog {
    system_prompt: String,
    concise_addition: String,
    user_message_template: String,
    reason_codes: HashMap<String, HashMap<String, String>>,
}

impl PromptCatalog {
    /// Load a catalog from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let catalog = Self::from_yaml_str(&content)?;
        tracing::info!(path = %path.display(), "Loaded prompt catalog");
        Ok(catalog)
    }

    /// Parse a catalog from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let file: PromptFile =
            serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError {
                message: format!("prompt catalog: {}", e),
            })?;

        let section = file.respond_score.ok_or_else(|| missing(ROOT_KEY))?;

        let system_prompt = section
            .system_prompt
            .ok_or_else(|| missing("respond_score.system_prompt"))?;
        let concise_addition = section
            .concise_addition
            .ok_or_else(|| missing("respond_score.concise_addition"))?;
        let user_message_template = section
            .user_message_template
            .ok_or_else(|| missing("respond_score.user_message_template"))?;
        let reason_codes = section
            .reason_codes
            .ok_or_else(|| missing("respond_score.reason_codes"))?;

        for placeholder in [QUERY_PLACEHOLDER, ANSWER_PLACEHOLDER] {
            if !user_message_template.contains(placeholder) {
                return Err(ConfigError::InvalidValue {
                    key: "respond_score.user_message_template".to_string(),
                    reason: format!("missing {} placeholder", placeholder),
                });
            }
        }

        Ok(Self {
            system_prompt,
            concise_addition,
            user_message_template,
            reason_codes,
        })
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn concise_addition(&self) -> &str {
        &self.concise_addition
    }

    pub fn user_message_template(&self) -> &str {
        &self.user_message_template
    }

    /// System prompt for the concise grading stage.
    pub fn concise_system_prompt(&self) -> String {
        format!("{}{}", self.system_prompt, self.concise_addition)
    }

    /// Fill the user message template in a single pass, so placeholder-like
    /// text inside the query or answer is never expanded.
    pub fn render_user_message(&self, query: &str, answer: &str) -> String {
        let template = self.user_message_template.as_str();
        let mut out = String::with_capacity(template.len() + query.len() + answer.len());
        let mut rest = template;

        while let Some(pos) = rest.find('{') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            if let Some(after) = tail.strip_prefix(QUERY_PLACEHOLDER) {
                out.push_str(query);
                rest = after;
            } else if let Some(after) = tail.strip_prefix(ANSWER_PLACEHOLDER) {
                out.push_str(answer);
                rest = after;
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }

    /// Static explanation for a grade on one dimension.
    pub fn reason_code(&self, dimension: Dimension, grade: LetterGrade) -> Result<&str, ConfigError> {
        self.reason_codes
            .get(dimension.as_str())
            .and_then(|grades| grades.get(grade.as_str()))
            .map(String::as_str)
            .filter(|reason| !reason.is_empty())
            .ok_or_else(|| ConfigError::MissingReasonCode {
                dimension: dimension.to_string(),
                grade: grade.to_string(),
            })
    }
}

fn missing(key: &str) -> ConfigError {
    ConfigError::MissingRequired {
        key: key.to_string(),
    }
}
