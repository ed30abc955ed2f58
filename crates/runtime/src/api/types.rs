//! API request and response types

use serde::{Deserialize, Serialize};

use crate::types::ReflectionError;

/// Liveness probe response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            message: "Server is running".to_string(),
        }
    }
}

/// Root greeting, used by clients as a reachability check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Optional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }
}

impl From<&ReflectionError> for ErrorResponse {
    fn from(err: &ReflectionError) -> Self {
        let details = match err {
            ReflectionError::Backend { kind, source } => Some(serde_json::json!({
                "kind": kind.to_string(),
                "source": source.to_string(),
            })),
            ReflectionError::RetriesExhausted {
                stage,
                attempts,
                last,
            } => Some(serde_json::json!({
                "stage": stage.to_string(),
                "attempts": attempts,
                "last_error": last.to_string(),
            })),
            ReflectionError::InvalidQuery(_) | ReflectionError::Config(_) => None,
        };

        Self {
            error: err.to_string(),
            code: err.code().to_string(),
            details,
        }
    }
}
