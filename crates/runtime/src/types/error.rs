//! Error types and failure classification for the answer-and-reflect workflow

use std::fmt;
use thiserror::Error;

use crate::reasoning::inference::InferenceError;

/// Configuration-related errors.
///
/// Never retried: a broken catalog or config is a deployment problem and
/// must surface on first use.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}")]
    MissingRequired { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("IO error reading {path}: {message}")]
    IoError { path: String, message: String },

    #[error("Configuration parsing error: {message}")]
    ParseError { message: String },

    #[error("No reason code for dimension '{dimension}' and grade '{grade}'")]
    MissingReasonCode { dimension: String, grade: String },
}

/// Ways raw model output can break the three-letter-grade contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GradeValidationError {
    #[error("No letter grades found in model output")]
    NoLetterGradesFound,

    #[error("Letter grades must be exactly three characters long, got {length}")]
    LetterGradesNotThreeCharactersLong { length: usize },

    #[error("Invalid letter grade '{found}', expected one of A, B, C")]
    InvalidLetterGrade { found: char },
}

/// Outbound failures that are never retried.
///
/// Each kind maps to its own externally visible status and error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FatalKind {
    Connection,
    Authentication,
    RateLimited,
    BadRequest,
    NotFound,
    PermissionDenied,
}

impl FatalKind {
    /// HTTP status reported to the caller.
    pub fn status_code(&self) -> u16 {
        match self {
            FatalKind::Connection => 500,
            FatalKind::Authentication => 401,
            FatalKind::RateLimited => 429,
            FatalKind::BadRequest => 400,
            FatalKind::NotFound => 404,
            FatalKind::PermissionDenied => 403,
        }
    }

    /// Stable machine-readable code reported to the caller.
    pub fn code(&self) -> &'static str {
        match self {
            FatalKind::Connection => "BACKEND_CONNECTION_FAILED",
            FatalKind::Authentication => "BACKEND_AUTHENTICATION_FAILED",
            FatalKind::RateLimited => "BACKEND_RATE_LIMITED",
            FatalKind::BadRequest => "BACKEND_BAD_REQUEST",
            FatalKind::NotFound => "BACKEND_NOT_FOUND",
            FatalKind::PermissionDenied => "BACKEND_PERMISSION_DENIED",
        }
    }
}

impl fmt::Display for FatalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FatalKind::Connection => "API connection error",
            FatalKind::Authentication => "Authentication error",
            FatalKind::RateLimited => "Rate limit exceeded",
            FatalKind::BadRequest => "Bad request",
            FatalKind::NotFound => "Not found",
            FatalKind::PermissionDenied => "Permission denied",
        };
        f.write_str(label)
    }
}

/// Failures absorbed by the retry loop until the attempt budget runs out.
#[derive(Error, Debug)]
pub enum TransientFailure {
    #[error("backend failure: {0}")]
    Backend(InferenceError),

    #[error("invalid letter grades: {0}")]
    Grades(#[from] GradeValidationError),

    #[error("structured extraction returned no reflection")]
    EmptyExtraction,
}

/// Workflow stage a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Answer,
    ConciseReflection,
    ReasoningReflection,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Answer => f.write_str("answer"),
            Stage::ConciseReflection => f.write_str("concise reflection"),
            Stage::ReasoningReflection => f.write_str("reasoning reflection"),
        }
    }
}

/// Terminal error of one workflow invocation.
#[derive(Error, Debug)]
pub enum ReflectionError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{kind}: {source}")]
    Backend {
        kind: FatalKind,
        #[source]
        source: InferenceError,
    },

    #[error("{stage} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        stage: Stage,
        attempts: u32,
        last: TransientFailure,
    },
}

impl ReflectionError {
    /// HTTP status reported to the caller.
    pub fn status_code(&self) -> u16 {
        match self {
            ReflectionError::InvalidQuery(_) => 400,
            ReflectionError::Config(_) => 500,
            ReflectionError::Backend { kind, .. } => kind.status_code(),
            ReflectionError::RetriesExhausted { .. } => 502,
        }
    }

    /// Stable machine-readable code reported to the caller.
    pub fn code(&self) -> &'static str {
        match self {
            ReflectionError::InvalidQuery(_) => "INVALID_QUERY",
            ReflectionError::Config(_) => "CONFIGURATION_ERROR",
            ReflectionError::Backend { kind, .. } => kind.code(),
            ReflectionError::RetriesExhausted { .. } => "RETRIES_EXHAUSTED",
        }
    }
}

/// Outcome of a single attempt inside the retry loop.
#[derive(Debug)]
pub enum AttemptFailure {
    /// Stop immediately and surface this error.
    Fatal(ReflectionError),
    /// Spend another attempt if the budget allows.
    Retry(TransientFailure),
}

impl From<InferenceError> for AttemptFailure {
    fn from(err: InferenceError) -> Self {
        match err.fatal_kind() {
            Some(kind) => AttemptFailure::Fatal(ReflectionError::Backend { kind, source: err }),
            None => AttemptFailure::Retry(TransientFailure::Backend(err)),
        }
    }
}

impl From<GradeValidationError> for AttemptFailure {
    fn from(err: GradeValidationError) -> Self {
        AttemptFailure::Retry(TransientFailure::Grades(err))
    }
}

impl From<ConfigError> for AttemptFailure {
    fn from(err: ConfigError) -> Self {
        AttemptFailure::Fatal(ReflectionError::Config(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const ALL_FATAL: [FatalKind; 6] = [
        FatalKind::Connection,
        FatalKind::Authentication,
        FatalKind::RateLimited,
        FatalKind::BadRequest,
        FatalKind::NotFound,
        FatalKind::PermissionDenied,
    ];

    #[test]
    fn test_fatal_kinds_have_distinct_codes() {
        let codes: HashSet<_> = ALL_FATAL.iter().map(|k| k.code()).collect();
        assert_eq!(codes.len(), ALL_FATAL.len());
    }

    #[test]
    fn test_fatal_kind_statuses() {
        assert_eq!(FatalKind::Connection.status_code(), 500);
        assert_eq!(FatalKind::Authentication.status_code(), 401);
        assert_eq!(FatalKind::RateLimited.status_code(), 429);
        assert_eq!(FatalKind::BadRequest.status_code(), 400);
        assert_eq!(FatalKind::NotFound.status_code(), 404);
        assert_eq!(FatalKind::PermissionDenied.status_code(), 403);
    }

    #[test]
    fn test_inference_error_classification() {
        let fatal = AttemptFailure::from(InferenceError::Authentication("bad key".into()));
        assert!(matches!(
            fatal,
            AttemptFailure::Fatal(ReflectionError::Backend {
                kind: FatalKind::Authentication,
                ..
            })
        ));

        let transient = AttemptFailure::from(InferenceError::ServerError {
            status: 503,
            message: "overloaded".into(),
        });
        assert!(matches!(
            transient,
            AttemptFailure::Retry(TransientFailure::Backend(_))
        ));
    }

    #[test]
    fn test_grade_errors_are_retryable_and_config_errors_are_not() {
        let grades = AttemptFailure::from(GradeValidationError::NoLetterGradesFound);
        assert!(matches!(grades, AttemptFailure::Retry(_)));

        let config = AttemptFailure::from(ConfigError::MissingReasonCode {
            dimension: "accuracy".into(),
            grade: "C".into(),
        });
        assert!(matches!(
            config,
            AttemptFailure::Fatal(ReflectionError::Config(_))
        ));
    }

    #[test]
    fn test_exhaustion_is_distinguishable_from_cause() {
        let err = ReflectionError::RetriesExhausted {
            stage: Stage::ConciseReflection,
            attempts: 3,
            last: TransientFailure::Grades(GradeValidationError::InvalidLetterGrade {
                found: 'X',
            }),
        };
        assert_eq!(err.code(), "RETRIES_EXHAUSTED");
        assert_eq!(err.status_code(), 502);
        let message = err.to_string();
        assert!(message.contains("concise reflection failed after 3 attempts"));
        assert!(message.contains("'X'"));
    }
}
