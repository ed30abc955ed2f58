//! Inference provider trait
//!
//! Defines the `InferenceProvider` trait that abstracts over the outbound
//! chat-completion backend, plus the request options, response and error
//! types shared by every provider.

use crate::reasoning::conversation::Conversation;
use crate::types::FatalKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The reason the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Model produced a complete response.
    Stop,
    /// Generation was truncated due to max_tokens.
    #[serde(rename = "length")]
    MaxTokens,
    /// Generation was truncated due to content filter.
    ContentFilter,
}

/// Desired response format from the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResponseFormat {
    /// Free-form text response.
    #[serde(rename = "text")]
    Text,
    /// JSON response conforming to a specific schema.
    #[serde(rename = "json_schema")]
    JsonSchema {
        /// The JSON schema the response must conform to.
        schema: serde_json::Value,
        /// Name for the schema (used in API calls).
        name: String,
    },
}

/// Token usage information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt/input.
    pub prompt_tokens: u32,
    /// Tokens in the completion/output.
    pub completion_tokens: u32,
    /// Total tokens used.
    pub total_tokens: u32,
}

/// Options for an inference call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceOptions {
    /// Maximum tokens to generate (backend default when absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature (backend default when absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Desired response format.
    #[serde(default = "default_response_format")]
    pub response_format: ResponseFormat,
    /// Optional model override (provider decides default otherwise).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

fn default_response_format() -> ResponseFormat {
    ResponseFormat::Text
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            max_tokens: None,
            temperature: None,
            response_format: default_response_format(),
            model: None,
        }
    }
}

impl InferenceOptions {
    /// Options pinned to a model.
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            ..Self::default()
        }
    }

    /// Same options with a structured response format.
    pub fn with_json_schema(mut self, name: impl Into<String>, schema: serde_json::Value) -> Self {
        self.response_format = ResponseFormat::JsonSchema {
            schema,
            name: name.into(),
        };
        self
    }
}

/// Response from an inference call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResponse {
    /// Text content of the response (`None` when the backend sent null).
    pub content: Option<String>,
    /// Why the model stopped generating.
    pub finish_reason: FinishReason,
    /// Token usage statistics.
    pub usage: Usage,
    /// The model ID that actually served the request.
    pub model: String,
}

/// Errors that can occur during inference.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Authentication rejected: {0}")]
    Authentication(String),

    #[error("Rate limited, retry after {retry_after_ms}ms: {message}")]
    RateLimited { retry_after_ms: u64, message: String },

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Model or endpoint not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Backend error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Response parse error: {0}")]
    ParseError(String),
}

impl InferenceError {
    /// The fatal kind of this failure, or `None` when it is worth retrying.
    ///
    /// Fatal kinds are matched explicitly; every other failure is transient.
    pub fn fatal_kind(&self) -> Option<FatalKind> {
        match self {
            InferenceError::Connection(_) | InferenceError::Timeout(_) => {
                Some(FatalKind::Connection)
            }
            InferenceError::Authentication(_) => Some(FatalKind::Authentication),
            InferenceError::RateLimited { .. } => Some(FatalKind::RateLimited),
            InferenceError::BadRequest(_) => Some(FatalKind::BadRequest),
            InferenceError::NotFound(_) => Some(FatalKind::NotFound),
            InferenceError::PermissionDenied(_) => Some(FatalKind::PermissionDenied),
            _ => None,
        }
    }

    /// Classify a non-success HTTP status from the backend.
    pub fn from_status(status: u16, message: String, retry_after_ms: Option<u64>) -> Self {
        match status {
            400 => InferenceError::BadRequest(message),
            401 => InferenceError::Authentication(message),
            403 => InferenceError::PermissionDenied(message),
            404 => InferenceError::NotFound(message),
            429 => InferenceError::RateLimited {
                retry_after_ms: retry_after_ms.unwrap_or(1000),
                message,
            },
            500..=599 => InferenceError::ServerError { status, message },
            _ => InferenceError::Provider(format!("API error ({}): {}", status, message)),
        }
    }
}

/// Trait for outbound chat-completion backends.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Run inference on a conversation with the given options.
    async fn complete(
        &self,
        conversation: &Conversation,
        options: &InferenceOptions,
    ) -> Result<InferenceResponse, InferenceError>;

    /// Get the provider's name for logging.
    fn provider_name(&self) -> &str;

    /// Get the default model ID for this provider.
    fn default_model(&self) -> &str;
}
