//! OpenAI-compatible chat-completions provider
//!
//! Implements `InferenceProvider` over HTTP with `reqwest`, including
//! JSON-schema constrained output for structured extraction.

use std::time::{Duration, Instant};

use crate::config::LlmConfig;
use crate::reasoning::conversation::Conversation;
use crate::reasoning::inference::*;
use crate::types::ConfigError;
use async_trait::async_trait;

/// Cloud inference provider for OpenAI-compatible backends.
pub struct CloudInferenceProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl std::fmt::Debug for CloudInferenceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudInferenceProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl CloudInferenceProvider {
    /// Build a provider from the `[llm]` configuration section.
    pub fn from_config(config: &LlmConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingRequired {
                key: "OPENAI_API_KEY".to_string(),
            })?;

        let timeout = Duration::from_secs(config.timeout_seconds);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                key: "llm".to_string(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        tracing::info!(
            "Using OpenAI-compatible backend at {} (model: {})",
            config.base_url,
            config.model
        );

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            timeout,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Build the request body for the chat-completions endpoint.
    fn build_openai_body(
        &self,
        conversation: &Conversation,
        options: &InferenceOptions,
    ) -> serde_json::Value {
        let model = options.model.as_deref().unwrap_or(&self.model);

        let mut body = serde_json::json!({
            "model": model,
            "messages": conversation.to_openai_messages(),
        });

        if let Some(max_tokens) = options.max_tokens.or(self.max_tokens) {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if let Some(temperature) = options.temperature.or(self.temperature) {
            body["temperature"] = serde_json::json!(temperature);
        }

        if let ResponseFormat::JsonSchema { schema, name } = &options.response_format {
            body["response_format"] = serde_json::json!({
                "type": "json_schema",
                "json_schema": {
                    "name": name,
                    "schema": schema,
                    "strict": true,
                }
            });
        }

        body
    }

    /// Parse a chat-completions response body.
    fn parse_openai_response(
        resp: &serde_json::Value,
        requested_model: &str,
    ) -> Result<InferenceResponse, InferenceError> {
        let choice = resp
            .get("choices")
            .and_then(|c| c.get(0))
            .ok_or_else(|| InferenceError::ParseError("No choices in response".into()))?;

        let message = choice
            .get("message")
            .ok_or_else(|| InferenceError::ParseError("No message in choice".into()))?;

        let content = message
            .get("content")
            .and_then(|c| c.as_str())
            .map(str::to_string);

        let finish_reason = match choice
            .get("finish_reason")
            .and_then(|f| f.as_str())
            .unwrap_or("stop")
        {
            "length" => FinishReason::MaxTokens,
            "content_filter" => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        };

        let usage = resp
            .get("usage")
            .map(|u| {
                let field = |name: &str| u.get(name).and_then(|v| v.as_u64()).unwrap_or(0) as u32;
                Usage {
                    prompt_tokens: field("prompt_tokens"),
                    completion_tokens: field("completion_tokens"),
                    total_tokens: field("total_tokens"),
                }
            })
            .unwrap_or_default();

        let model = resp
            .get("model")
            .and_then(|m| m.as_str())
            .unwrap_or(requested_model)
            .to_string();

        Ok(InferenceResponse {
            content,
            finish_reason,
            usage,
            model,
        })
    }

    /// Seconds from a `retry-after` header, converted to milliseconds.
    fn retry_after_ms(headers: &reqwest::header::HeaderMap) -> Option<u64> {
        headers
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(|secs| secs.saturating_mul(1000))
    }

    fn classify_send_error(&self, err: reqwest::Error) -> InferenceError {
        if err.is_timeout() {
            InferenceError::Timeout(self.timeout)
        } else if err.is_connect() {
            InferenceError::Connection(err.to_string())
        } else {
            InferenceError::Provider(format!("Request failed: {}", err))
        }
    }
}

#[async_trait]
impl InferenceProvider for CloudInferenceProvider {
    async fn complete(
        &self,
        conversation: &Conversation,
        options: &InferenceOptions,
    ) -> Result<InferenceResponse, InferenceError> {
        let model = options.model.as_deref().unwrap_or(&self.model);
        let body = self.build_openai_body(conversation, options);
        let url = self.endpoint();

        tracing::debug!(
            "Cloud inference: provider={} model={} url={}",
            self.provider_name(),
            model,
            url
        );

        let start = Instant::now();
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = Self::retry_after_ms(response.headers());
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            return Err(InferenceError::from_status(
                status.as_u16(),
                error_text,
                retry_after,
            ));
        }

        let resp_json: serde_json::Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                InferenceError::Timeout(self.timeout)
            } else {
                InferenceError::ParseError(format!("JSON parse error: {}", e))
            }
        })?;

        let parsed = Self::parse_openai_response(&resp_json, model)?;
        tracing::debug!(
            latency_ms = start.elapsed().as_millis() as u64,
            total_tokens = parsed.usage.total_tokens,
            "Cloud inference completed"
        );
        Ok(parsed)
    }

    fn provider_name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}
