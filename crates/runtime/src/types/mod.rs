//! Core data types shared across the runtime

pub mod answer;
pub mod error;
pub mod query;

pub use answer::{Answer, AnswerChoice, AnswerMessage};
pub use error::{
    AttemptFailure, ConfigError, FatalKind, GradeValidationError, ReflectionError, Stage,
    TransientFailure,
};
pub use query::{Query, QueryBody};
