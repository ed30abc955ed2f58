//! Outbound completion plumbing
//!
//! Conversation building, the unified `InferenceProvider` trait, the
//! OpenAI-compatible provider, schema-validated structured output and the
//! bounded retry wrapper used by every workflow stage.

pub mod conversation;
pub mod inference;
pub mod providers;
pub mod retry;
pub mod schema_validation;

pub use conversation::{Conversation, ConversationMessage, MessageRole};
pub use inference::{
    FinishReason, InferenceError, InferenceOptions, InferenceProvider, InferenceResponse,
    ResponseFormat, Usage,
};
pub use retry::{RetryPolicy, RetryingCompletion, DEFAULT_MAX_ATTEMPTS};
pub use schema_validation::{SchemaValidationError, ValidationPipeline};
