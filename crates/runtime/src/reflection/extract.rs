//! Structured reflection extraction
//!
//! The reasoning path asks the backend for a `ReflectionExtract` directly,
//! constrained by a JSON schema, and validates what comes back before it is
//! scored.

use std::sync::Arc;

use async_trait::async_trait;

use super::scoring::ReflectionExtract;
use crate::reasoning::conversation::Conversation;
use crate::reasoning::inference::{InferenceError, InferenceOptions, InferenceProvider};
use crate::reasoning::schema_validation::ValidationPipeline;
use crate::types::ConfigError;

/// Schema name sent to the backend.
pub const REFLECTION_EXTRACT_SCHEMA_NAME: &str = "ReflectionExtract";

fn reflection_schema(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "description": description,
        "properties": {
            "rating": {
                "type": "string",
                "enum": ["A", "B", "C"],
                "description": "A is the most confident, B the least confident, C in between."
            },
            "reason": {
                "type": "string",
                "description": "Detailed reasoning for the rating. Surface the underlying assumptions and the process that led to it."
            }
        },
        "required": ["rating", "reason"],
        "additionalProperties": false
    })
}

/// JSON schema for a `ReflectionExtract`, in the strict structured-output
/// subset accepted by OpenAI-compatible backends.
pub fn reflection_extract_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "completeness": reflection_schema(
                "How confident are you that your answer addresses the user's question completely?"
            ),
            "accuracy": reflection_schema(
                "How certain are you that the factual claims in your answer are accurate?"
            ),
            "reasoning": reflection_schema(
                "How confident are you in the logical reasoning of your answer?"
            ),
        },
        "required": ["completeness", "accuracy", "reasoning"],
        "additionalProperties": false
    })
}

/// Produces a schema-conforming reflection from a reflection conversation.
///
/// `Ok(None)` means the backend answered without a usable object (null
/// content or a refusal). Callers treat it as transient.
#[async_trait]
pub trait ReflectionExtractor: Send + Sync {
    async fn extract(
        &self,
        conversation: &Conversation,
        options: &InferenceOptions,
    ) -> Result<Option<ReflectionExtract>, InferenceError>;
}

/// Extractor backed by an `InferenceProvider` with JSON-schema output.
pub struct StructuredExtractor {
    provider: Arc<dyn InferenceProvider>,
    schema: serde_json::Value,
    validator: jsonschema::Validator,
}

impl StructuredExtractor {
    pub fn new(provider: Arc<dyn InferenceProvider>) -> Result<Self, ConfigError> {
        let schema = reflection_extract_schema();
        let validator =
            ValidationPipeline::compile_schema(&schema).map_err(|e| ConfigError::InvalidValue {
                key: REFLECTION_EXTRACT_SCHEMA_NAME.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            provider,
            schema,
            validator,
        })
    }
}

#[async_trait]
impl ReflectionExtractor for StructuredExtractor {
    async fn extract(
        &self,
        conversation: &Conversation,
        options: &InferenceOptions,
    ) -> Result<Option<ReflectionExtract>, InferenceError> {
        let options = options
            .clone()
            .with_json_schema(REFLECTION_EXTRACT_SCHEMA_NAME, self.schema.clone());
        let response = self.provider.complete(conversation, &options).await?;

        let raw = match response.content.as_deref() {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => {
                tracing::warn!(model = %response.model, "Structured extraction returned no content");
                return Ok(None);
            }
        };

        let extract: ReflectionExtract =
            ValidationPipeline::validate_and_parse(raw, Some(&self.validator))
                .map_err(|e| InferenceError::ParseError(e.to_string()))?;

        if let Some(dimension) = extract.blank_reason() {
            return Err(InferenceError::ParseError(format!(
                "empty reason for {}",
                dimension
            )));
        }

        Ok(Some(extract))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::inference::{FinishReason, InferenceResponse, ResponseFormat, Usage};
    use crate::reflection::LetterGrade;
    use std::sync::Mutex;

    struct CannedProvider {
        content: Option<String>,
        seen_format: Mutex<Option<ResponseFormat>>,
    }

    impl CannedProvider {
        fn new(content: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                content: content.map(str::to_string),
                seen_format: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl InferenceProvider for CannedProvider {
        async fn complete(
            &self,
            _conversation: &Conversation,
            options: &InferenceOptions,
        ) -> Result<InferenceResponse, InferenceError> {
            *self.seen_format.lock().unwrap() = Some(options.response_format.clone());
            Ok(InferenceResponse {
                content: self.content.clone(),
                finish_reason: FinishReason::Stop,
                usage: Usage::default(),
                model: "mock".into(),
            })
        }

        fn provider_name(&self) -> &str {
            "canned"
        }

        fn default_model(&self) -> &str {
            "mock"
        }
    }

    const VALID: &str = r#"{
        "completeness": {"rating": "A", "reason": "Covers the question"},
        "accuracy": {"rating": "C", "reason": "One figure is from memory"},
        "reasoning": {"rating": "A", "reason": "Straightforward arithmetic"}
    }"#;

    async fn run(content: Option<&str>) -> Result<Option<ReflectionExtract>, InferenceError> {
        let provider = CannedProvider::new(content);
        let extractor = StructuredExtractor::new(provider).unwrap();
        extractor
            .extract(&Conversation::single_user("q"), &InferenceOptions::default())
            .await
    }

    #[test]
    fn test_schema_compiles() {
        assert!(ValidationPipeline::compile_schema(&reflection_extract_schema()).is_ok());
    }

    #[tokio::test]
    async fn test_valid_extract() {
        let extract = run(Some(VALID)).await.unwrap().unwrap();
        assert_eq!(
            extract.ratings(),
            [LetterGrade::A, LetterGrade::C, LetterGrade::A]
        );
    }

    #[tokio::test]
    async fn test_requests_json_schema_format() {
        let provider = CannedProvider::new(Some(VALID));
        let extractor = StructuredExtractor::new(provider.clone()).unwrap();
        extractor
            .extract(&Conversation::single_user("q"), &InferenceOptions::default())
            .await
            .unwrap();

        let seen = provider.seen_format.lock().unwrap().clone();
        match seen {
            Some(ResponseFormat::JsonSchema { name, .. }) => {
                assert_eq!(name, REFLECTION_EXTRACT_SCHEMA_NAME)
            }
            other => panic!("expected json schema format, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_null_content_is_none() {
        assert!(run(None).await.unwrap().is_none());
        assert!(run(Some("")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_schema_violation_is_parse_error() {
        let bad = VALID.replace("\"C\"", "\"D\"");
        let err = run(Some(&bad)).await.unwrap_err();
        assert!(matches!(err, InferenceError::ParseError(_)));
        assert!(err.fatal_kind().is_none());
    }

    #[tokio::test]
    async fn test_missing_dimension_is_parse_error() {
        let partial = r#"{"completeness": {"rating": "A", "reason": "ok"}}"#;
        assert!(matches!(
            run(Some(partial)).await,
            Err(InferenceError::ParseError(_))
        ));
    }

    #[tokio::test]
    async fn test_blank_reason_is_parse_error() {
        let blank = VALID.replace("Straightforward arithmetic", " ");
        assert!(matches!(
            run(Some(&blank)).await,
            Err(InferenceError::ParseError(_))
        ));
    }
}
