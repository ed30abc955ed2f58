//! selfgrade runtime
//!
//! Answers a question with a chat-completion backend, then has the backend
//! grade its own answer on completeness, accuracy and reasoning. The grades
//! become a confidence score in `[0, 1]`.
//!
//! The core is [`workflow::ReflectionWorkflow`]; everything else (prompt
//! catalog, retrying completion, grade validation, structured extraction,
//! HTTP service) is a collaborator it is built from.

pub mod config;
pub mod prompts;
pub mod reasoning;
pub mod reflection;
pub mod types;
pub mod workflow;

#[cfg(feature = "http-api")]
pub mod api;

pub use config::Config;
pub use prompts::PromptCatalog;
pub use reasoning::{
    InferenceError, InferenceOptions, InferenceProvider, InferenceResponse, RetryPolicy,
    RetryingCompletion,
};
pub use reflection::{
    Dimension, GradeValidator, LetterGrade, Reflection, ReflectionExtract, ReflectionExtractor,
    ScoredReflection, StructuredExtractor,
};
pub use types::*;
pub use workflow::{ReflectedAnswer, ReflectionMode, ReflectionWorkflow};
