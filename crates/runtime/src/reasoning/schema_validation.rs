//! Schema-first validation of structured model output
//!
//! Layered pipeline for JSON returned by the backend:
//! 1. Strip markdown fences
//! 2. Parse as JSON
//! 3. Validate against a pre-compiled JSON Schema
//! 4. Deserialize into the target Rust type

use serde::de::DeserializeOwned;

/// Errors from the validation pipeline, ordered by layer.
#[derive(Debug, thiserror::Error)]
pub enum SchemaValidationError {
    /// The raw text couldn't be parsed as JSON.
    #[error("JSON parse error at line {line}, column {column}: {message}. Raw text starts with: {raw_prefix:?}")]
    JsonParseError {
        message: String,
        line: usize,
        column: usize,
        raw_prefix: String,
    },

    /// The JSON is valid but doesn't conform to the expected schema.
    #[error("Schema validation failed: {errors:?}")]
    SchemaViolation { errors: Vec<String> },

    /// The JSON conforms to the schema but couldn't be deserialized into
    /// the target Rust type.
    #[error("Deserialization error: {message}")]
    DeserializationError { message: String },
}

/// Strip a surrounding ```json ... ``` fence, if any.
pub fn strip_markdown_fences(text: &str) -> String {
    let trimmed = text.trim();

    if let Some(rest) = trimmed.strip_prefix("```") {
        // Skip the language tag on the first line
        let content = match rest.find('\n') {
            Some(idx) => &rest[idx + 1..],
            None => rest,
        };
        if let Some(stripped) = content.strip_suffix("```") {
            return stripped.trim().to_string();
        }
        return content.trim().to_string();
    }

    trimmed.to_string()
}

/// The validation pipeline: parses, validates, and deserializes model output.
pub struct ValidationPipeline;

impl ValidationPipeline {
    /// strip fences → parse JSON → validate → deserialize into `T`.
    pub fn validate_and_parse<T: DeserializeOwned>(
        raw_text: &str,
        schema: Option<&jsonschema::Validator>,
    ) -> Result<T, SchemaValidationError> {
        let json_value = Self::parse_json(raw_text)?;

        if let Some(validator) = schema {
            Self::validate_schema(&json_value, validator)?;
        }

        serde_json::from_value(json_value).map_err(|e| {
            SchemaValidationError::DeserializationError {
                message: e.to_string(),
            }
        })
    }

    /// Parse raw text as JSON without schema validation.
    pub fn parse_json(raw_text: &str) -> Result<serde_json::Value, SchemaValidationError> {
        let cleaned = strip_markdown_fences(raw_text);
        serde_json::from_str(&cleaned).map_err(|e| {
            let prefix = if cleaned.chars().count() > 100 {
                format!("{}...", cleaned.chars().take(100).collect::<String>())
            } else {
                cleaned.clone()
            };
            SchemaValidationError::JsonParseError {
                message: e.to_string(),
                line: e.line(),
                column: e.column(),
                raw_prefix: prefix,
            }
        })
    }

    /// Validate a JSON value against a pre-compiled schema and collect errors.
    pub fn validate_schema(
        value: &serde_json::Value,
        validator: &jsonschema::Validator,
    ) -> Result<(), SchemaValidationError> {
        let errors: Vec<String> = validator
            .iter_errors(value)
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("at '{}': {}", path, e)
                }
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaValidationError::SchemaViolation { errors })
        }
    }

    /// Create a validator from a raw JSON Schema value.
    pub fn compile_schema(
        schema: &serde_json::Value,
    ) -> Result<jsonschema::Validator, SchemaValidationError> {
        jsonschema::validator_for(schema).map_err(|e| SchemaValidationError::SchemaViolation {
            errors: vec![format!("Invalid schema: {}", e)],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Graded {
        rating: String,
        reason: String,
    }

    fn graded_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "rating": {"type": "string", "enum": ["A", "B", "C"]},
                "reason": {"type": "string", "minLength": 1}
            },
            "required": ["rating", "reason"]
        })
    }

    fn make_validator(schema: &serde_json::Value) -> jsonschema::Validator {
        jsonschema::validator_for(schema).expect("valid schema")
    }

    #[test]
    fn test_strip_markdown_fences() {
        assert_eq!(strip_markdown_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_markdown_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_markdown_fences("  {}  "), "{}");
    }

    #[test]
    fn test_validate_and_parse_valid() {
        let validator = make_validator(&graded_schema());
        let raw = r#"{"rating": "A", "reason": "Covers every part"}"#;
        let result: Graded = ValidationPipeline::validate_and_parse(raw, Some(&validator)).unwrap();
        assert_eq!(result.rating, "A");
    }

    #[test]
    fn test_validate_and_parse_markdown_fenced() {
        let validator = make_validator(&graded_schema());
        let raw = "```json\n{\"rating\": \"C\", \"reason\": \"Partly\"}\n```";
        let result: Graded = ValidationPipeline::validate_and_parse(raw, Some(&validator)).unwrap();
        assert_eq!(result.reason, "Partly");
    }

    #[test]
    fn test_validate_and_parse_invalid_json() {
        let result = ValidationPipeline::validate_and_parse::<Graded>("not JSON at all", None);
        assert!(matches!(
            result.unwrap_err(),
            SchemaValidationError::JsonParseError { .. }
        ));
    }

    #[test]
    fn test_validate_and_parse_schema_violation() {
        let validator = make_validator(&graded_schema());
        let raw = r#"{"rating": "D", "reason": "Out of range"}"#;
        let result = ValidationPipeline::validate_and_parse::<Graded>(raw, Some(&validator));
        assert!(matches!(
            result.unwrap_err(),
            SchemaValidationError::SchemaViolation { .. }
        ));
    }

    #[test]
    fn test_parse_error_prefix_is_truncated_on_char_boundary() {
        let raw = "é".repeat(150);
        match ValidationPipeline::parse_json(&raw) {
            Err(SchemaValidationError::JsonParseError { raw_prefix, .. }) => {
                assert!(raw_prefix.ends_with("..."));
                assert_eq!(raw_prefix.chars().count(), 103);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_compile_schema_invalid() {
        let schema = serde_json::json!({"type": "not_a_type"});
        assert!(ValidationPipeline::compile_schema(&schema).is_err());
    }
}
