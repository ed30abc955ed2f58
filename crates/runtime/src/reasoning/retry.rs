//! Bounded retry around outbound completion calls
//!
//! `RetryPolicy` runs an attempt closure up to `max_attempts` times. Each
//! attempt reports either success, a fatal failure (returned at once) or a
//! transient failure (retried immediately while budget remains).
//! `RetryingCompletion` applies the policy to an `InferenceProvider`, either
//! around the bare call or around a call plus output validation.

use std::future::Future;
use std::sync::Arc;

use crate::reasoning::conversation::Conversation;
use crate::reasoning::inference::{InferenceOptions, InferenceProvider, InferenceResponse};
use crate::types::{AttemptFailure, ConfigError, ReflectionError, Stage, TransientFailure};

/// Default number of attempts per stage.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Attempt budget for one stage of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// Create a policy; `max_attempts` must be at least 1.
    pub fn new(max_attempts: u32) -> Result<Self, ConfigError> {
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "workflow.max_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(Self { max_attempts })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `attempt` until it succeeds, fails fatally, or the budget is spent.
    ///
    /// The closure receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, stage: Stage, mut attempt: F) -> Result<T, ReflectionError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AttemptFailure>>,
    {
        let mut last_failure: Option<TransientFailure> = None;

        for n in 1..=self.max_attempts {
            match attempt(n).await {
                Ok(value) => {
                    if n > 1 {
                        tracing::info!(%stage, attempt = n, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(AttemptFailure::Fatal(err)) => {
                    tracing::error!(%stage, attempt = n, error = %err, "Fatal failure, not retrying");
                    return Err(err);
                }
                Err(AttemptFailure::Retry(failure)) => {
                    tracing::warn!(
                        %stage,
                        attempt = n,
                        max_attempts = self.max_attempts,
                        error = %failure,
                        "Transient failure"
                    );
                    last_failure = Some(failure);
                }
            }
        }

        match last_failure {
            Some(last) => {
                tracing::error!(%stage, attempts = self.max_attempts, "Retry budget exhausted");
                Err(ReflectionError::RetriesExhausted {
                    stage,
                    attempts: self.max_attempts,
                    last,
                })
            }
            None => Err(ReflectionError::Config(ConfigError::InvalidValue {
                key: "workflow.max_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            })),
        }
    }
}

/// An `InferenceProvider` call wrapped in a `RetryPolicy`.
#[derive(Clone)]
pub struct RetryingCompletion {
    provider: Arc<dyn InferenceProvider>,
    policy: RetryPolicy,
}

impl RetryingCompletion {
    pub fn new(provider: Arc<dyn InferenceProvider>, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn provider(&self) -> &Arc<dyn InferenceProvider> {
        &self.provider
    }

    /// Complete a conversation, retrying transient backend failures.
    pub async fn complete(
        &self,
        stage: Stage,
        conversation: &Conversation,
        options: &InferenceOptions,
    ) -> Result<InferenceResponse, ReflectionError> {
        self.complete_validated(stage, conversation, options, |response| Ok(response))
            .await
    }

    /// Complete a conversation and validate the response as one retried round.
    ///
    /// A response rejected by `validate` with a transient failure costs an
    /// attempt exactly like a backend failure does.
    pub async fn complete_validated<T, V>(
        &self,
        stage: Stage,
        conversation: &Conversation,
        options: &InferenceOptions,
        validate: V,
    ) -> Result<T, ReflectionError>
    where
        V: Fn(InferenceResponse) -> Result<T, AttemptFailure>,
    {
        let provider = &self.provider;
        let validate = &validate;
        self.policy
            .run(stage, |attempt| async move {
                tracing::debug!(
                    %stage,
                    attempt,
                    provider = provider.provider_name(),
                    "Issuing completion"
                );
                let response = provider.complete(conversation, options).await?;
                validate(response)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::inference::{FinishReason, InferenceError, Usage};
    use crate::types::{FatalKind, GradeValidationError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct ScriptedProvider {
        script: Mutex<Vec<Result<InferenceResponse, InferenceError>>>,
        calls: AtomicU32,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<InferenceResponse, InferenceError>>) -> Self {
            Self {
                script: Mutex::new(script),
                calls: AtomicU32::new(0),
            }
        }
    }

    fn text(content: &str) -> InferenceResponse {
        InferenceResponse {
            content: Some(content.to_string()),
            finish_reason: FinishReason::Stop,
            usage: Usage::default(),
            model: "mock".into(),
        }
    }

    fn server_error() -> InferenceError {
        InferenceError::ServerError {
            status: 500,
            message: "Internal server error".into(),
        }
    }

    #[async_trait]
    impl InferenceProvider for ScriptedProvider {
        async fn complete(
            &self,
            _conversation: &Conversation,
            _options: &InferenceOptions,
        ) -> Result<InferenceResponse, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                Err(server_error())
            } else {
                script.remove(0)
            }
        }

        fn provider_name(&self) -> &str {
            "scripted"
        }

        fn default_model(&self) -> &str {
            "mock"
        }
    }

    #[test]
    fn test_zero_attempts_rejected() {
        assert!(RetryPolicy::new(0).is_err());
        assert_eq!(RetryPolicy::new(5).unwrap().max_attempts(), 5);
        assert_eq!(RetryPolicy::default().max_attempts(), DEFAULT_MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_retries_server_error_then_succeeds() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(server_error()), Ok(text("42"))]));
        let completion = RetryingCompletion::new(provider.clone(), RetryPolicy::default());

        let response = completion
            .complete(
                Stage::Answer,
                &Conversation::single_user("q"),
                &InferenceOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(response.content.as_deref(), Some("42"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unclassified_failure_is_retried() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(InferenceError::Provider("Generic error".into())),
            Ok(text("ok")),
        ]));
        let completion = RetryingCompletion::new(provider.clone(), RetryPolicy::default());

        let result = completion
            .complete(
                Stage::Answer,
                &Conversation::single_user("q"),
                &InferenceOptions::default(),
            )
            .await;

        assert!(result.is_ok());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_exhaustion_after_exact_budget() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let completion = RetryingCompletion::new(provider.clone(), RetryPolicy::new(4).unwrap());

        let err = completion
            .complete(
                Stage::Answer,
                &Conversation::single_user("q"),
                &InferenceOptions::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReflectionError::RetriesExhausted {
                stage: Stage::Answer,
                attempts: 4,
                ..
            }
        ));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_fatal_failure_short_circuits() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(InferenceError::RateLimited {
                retry_after_ms: 1000,
                message: "slow down".into(),
            }),
            Ok(text("never reached")),
        ]));
        let completion = RetryingCompletion::new(provider.clone(), RetryPolicy::default());

        let err = completion
            .complete(
                Stage::Answer,
                &Conversation::single_user("q"),
                &InferenceOptions::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReflectionError::Backend {
                kind: FatalKind::RateLimited,
                ..
            }
        ));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_validation_failure_consumes_attempt() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(text("bad")), Ok(text("good"))]));
        let completion = RetryingCompletion::new(provider.clone(), RetryPolicy::default());

        let value = completion
            .complete_validated(
                Stage::ConciseReflection,
                &Conversation::single_user("q"),
                &InferenceOptions::default(),
                |response| match response.content.as_deref() {
                    Some("good") => Ok(1),
                    _ => Err(GradeValidationError::NoLetterGradesFound.into()),
                },
            )
            .await
            .unwrap();

        assert_eq!(value, 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }
}
