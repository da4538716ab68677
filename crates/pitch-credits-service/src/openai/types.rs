//! Chat-completions wire types.

use serde::{Deserialize, Serialize};

/// Request body for `POST /chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    /// Model name.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Conversation so far.
    pub messages: Vec<ChatMessage>,
}

/// One message of a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `system`, `user` or `assistant`.
    pub role: String,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// A system instruction.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    /// A user turn.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Response body of a chat completion.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    /// Generated choices; the first one is used.
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

/// One generated choice.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    /// The assistant message.
    pub message: ChoiceMessage,
}

/// Assistant message inside a choice. `content` is null for refusals and
/// tool calls.
#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    /// Generated text.
    #[serde(default)]
    pub content: Option<String>,
}

/// Error envelope returned by OpenAI-compatible APIs.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorDetail,
}

/// Error details.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    /// Human-readable message.
    pub message: String,
    /// Error type, e.g. `insufficient_quota`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}
