use serde::{Deserialize, Serialize};

use crate::reasoning::inference::{FinishReason, InferenceResponse, Usage};

/// The raw completion of the answer stage, in chat-completion shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub model: String,
    pub choices: Vec<AnswerChoice>,
    pub usage: Usage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerChoice {
    pub index: u32,
    pub message: AnswerMessage,
    pub finish_reason: FinishReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerMessage {
    pub role: String,
    pub content: Option<String>,
}

impl Answer {
    /// Text of the first choice, if the backend returned any.
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }
}

impl From<InferenceResponse> for Answer {
    fn from(response: InferenceResponse) -> Self {
        Self {
            model: response.model,
            choices: vec![AnswerChoice {
                index: 0,
                message: AnswerMessage {
                    role: "assistant".to_string(),
                    content: response.content,
                },
                finish_reason: response.finish_reason,
            }],
            usage: response.usage,
        }
    }
}
