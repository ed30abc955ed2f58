//! Answer-and-reflect workflow
//!
//! One run answers a query, then reflects on the answer with exactly one of
//! two strategies and returns both the raw answer and the scored reflection:
//!
//! ```text
//! START ──answer──▶ ANSWERED ──concise | reasoning──▶ REFLECTED ──▶ DONE
//!   └────────────────────┴──────────────────────────────┴──▶ FAILED
//! ```
//!
//! Each stage runs under its own retry budget. The reflect call starts only
//! after the answer call finished, so a run has at most one outbound call in
//! flight. Dropping the returned future abandons the in-flight call.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::Config;
use crate::prompts::PromptCatalog;
use crate::reasoning::conversation::{Conversation, ConversationMessage};
use crate::reasoning::inference::{InferenceOptions, InferenceProvider};
use crate::reasoning::providers::CloudInferenceProvider;
use crate::reasoning::retry::{RetryPolicy, RetryingCompletion};
use crate::reflection::{
    GradeValidator, ReflectionExtract, ReflectionExtractor, ScoredReflection, StructuredExtractor,
};
use crate::types::{
    Answer, AttemptFailure, ConfigError, Query, ReflectionError, Stage, TransientFailure,
};

/// Which reflection strategy a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReflectionMode {
    /// Three letter grades, reasons from the prompt catalog.
    Concise,
    /// Schema-constrained extraction with model-written reasons.
    Reasoning,
}

impl fmt::Display for ReflectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReflectionMode::Concise => f.write_str("concise"),
            ReflectionMode::Reasoning => f.write_str("reasoning"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkflowState {
    Start,
    Answered,
    Reflected,
    Done,
    Failed,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowState::Start => "START",
            WorkflowState::Answered => "ANSWERED",
            WorkflowState::Reflected => "REFLECTED",
            WorkflowState::Done => "DONE",
            WorkflowState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

fn transition(from: WorkflowState, to: WorkflowState) {
    tracing::info!(%from, %to, "Workflow transition");
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReflectedAnswer {
    pub base_response: Answer,
    pub reflection_response: ScoredReflection,
}

/// Orchestrates the answer and reflection stages.
pub struct ReflectionWorkflow {
    completion: RetryingCompletion,
    extractor: Arc<dyn ReflectionExtractor>,
    catalog: Arc<PromptCatalog>,
    model: Option<String>,
}

impl ReflectionWorkflow {
    pub fn new(
        provider: Arc<dyn InferenceProvider>,
        extractor: Arc<dyn ReflectionExtractor>,
        catalog: Arc<PromptCatalog>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            completion: RetryingCompletion::new(provider, policy),
            extractor,
            catalog,
            model: None,
        }
    }

    /// Pin every call to a model instead of the provider default.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Build the production workflow: HTTP provider, structured extractor
    /// and the catalog at `prompts.path`.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let catalog = Arc::new(PromptCatalog::load(&config.prompts.path)?);
        let provider: Arc<dyn InferenceProvider> =
            Arc::new(CloudInferenceProvider::from_config(&config.llm)?);
        let extractor = Arc::new(StructuredExtractor::new(provider.clone())?);
        let policy = RetryPolicy::new(config.workflow.max_attempts)?;

        Ok(Self::new(provider, extractor, catalog, policy).with_model(config.llm.model.clone()))
    }

    pub fn catalog(&self) -> &PromptCatalog {
        &self.catalog
    }

    pub fn policy(&self) -> RetryPolicy {
        self.completion.policy()
    }

    fn options(&self) -> InferenceOptions {
        match &self.model {
            Some(model) => InferenceOptions::for_model(model.clone()),
            None => InferenceOptions::default(),
        }
    }

    fn reflection_conversation(&self, system_prompt: String, query: &Query, answer: &Answer) -> Conversation {
        let mut conversation = Conversation::with_system(system_prompt);
        conversation.push(ConversationMessage::user(
            self.catalog
                .render_user_message(query.as_str(), answer.content().unwrap_or_default()),
        ));
        conversation
    }

    /// Answer stage: the query is the only message.
    pub async fn answer(&self, query: &Query) -> Result<Answer, ReflectionError> {
        let conversation = Conversation::single_user(query.as_str());
        let response = self
            .completion
            .complete(Stage::Answer, &conversation, &self.options())
            .await?;
        Ok(Answer::from(response))
    }

    /// Concise reflection: the backend must reply with exactly three grade
    /// letters. Completion and validation are retried together.
    pub async fn reflect_concisely(
        &self,
        query: &Query,
        answer: &Answer,
    ) -> Result<ScoredReflection, ReflectionError> {
        let conversation =
            self.reflection_conversation(self.catalog.concise_system_prompt(), query, answer);

        let grades = self
            .completion
            .complete_validated(
                Stage::ConciseReflection,
                &conversation,
                &self.options(),
                |response| {
                    GradeValidator::validate(response.content.as_deref())
                        .map_err(AttemptFailure::from)
                },
            )
            .await?;

        tracing::debug!(?grades, "Concise reflection graded");
        Ok(ScoredReflection::from_letter_grades(grades, &self.catalog)?)
    }

    /// Reasoning reflection: the backend produces a full extract, reasons
    /// included. An empty or invalid extract costs an attempt.
    pub async fn reflect_with_reasoning(
        &self,
        query: &Query,
        answer: &Answer,
    ) -> Result<ScoredReflection, ReflectionError> {
        let conversation =
            self.reflection_conversation(self.catalog.system_prompt().to_string(), query, answer);
        let options = self.options();
        let extractor = &self.extractor;
        let conversation = &conversation;
        let options = &options;

        let extract: ReflectionExtract = self
            .completion
            .policy()
            .run(Stage::ReasoningReflection, |_attempt| async move {
                match extractor.extract(conversation, options).await {
                    Ok(Some(extract)) => Ok(extract),
                    Ok(None) => Err(AttemptFailure::Retry(TransientFailure::EmptyExtraction)),
                    Err(err) => Err(AttemptFailure::from(err)),
                }
            })
            .await?;

        Ok(ScoredReflection::from_extract(extract))
    }

    /// Run the whole workflow for one query.
    pub async fn run(
        &self,
        query: &Query,
        mode: ReflectionMode,
    ) -> Result<ReflectedAnswer, ReflectionError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("reflection_workflow", %request_id, %mode);

        async move {
            let mut state = WorkflowState::Start;
            let result = self.run_stages(query, mode, &mut state).await;
            match &result {
                Ok(reflected) => {
                    transition(state, WorkflowState::Done);
                    tracing::info!(
                        numerical_score = reflected.reflection_response.numerical_score(),
                        total_tokens = reflected.base_response.usage.total_tokens,
                        "Workflow complete"
                    );
                }
                Err(err) => {
                    transition(state, WorkflowState::Failed);
                    tracing::error!(code = err.code(), error = %err, "Workflow failed");
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_stages(
        &self,
        query: &Query,
        mode: ReflectionMode,
        state: &mut WorkflowState,
    ) -> Result<ReflectedAnswer, ReflectionError> {
        let base_response = self.answer(query).await?;
        transition(*state, WorkflowState::Answered);
        *state = WorkflowState::Answered;

        let reflection_response = match mode {
            ReflectionMode::Concise => self.reflect_concisely(query, &base_response).await?,
            ReflectionMode::Reasoning => self.reflect_with_reasoning(query, &base_response).await?,
        };
        transition(*state, WorkflowState::Reflected);
        *state = WorkflowState::Reflected;

        Ok(ReflectedAnswer {
            base_response,
            reflection_response,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_serde() {
        assert_eq!(
            serde_json::to_string(&ReflectionMode::Reasoning).unwrap(),
            "\"reasoning\""
        );
        assert_eq!(ReflectionMode::Concise.to_string(), "concise");
    }

    #[test]
    fn test_state_names() {
        assert_eq!(WorkflowState::Start.to_string(), "START");
        assert_eq!(WorkflowState::Failed.to_string(), "FAILED");
    }
}
