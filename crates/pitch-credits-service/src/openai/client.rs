//! OpenAI-compatible chat-completions client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use pitch_credits_core::ProposalBrief;

use super::prompt;
use super::types::{ApiErrorResponse, ChatCompletionRequest, ChatCompletionResponse};
use super::ProposalGenerator;

/// Sampling temperature for proposal drafts.
pub const TEMPERATURE: f32 = 0.7;

/// Error type for generation calls.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned an error.
    #[error("generation API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// The API answered without any generated text.
    #[error("generation API returned no choices")]
    NoChoices,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Generates proposal text through an OpenAI-compatible API.
#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiGenerator {
    /// Create a new generator.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API base URL including the version prefix (e.g. `"https://api.openai.com/v1"`)
    /// * `api_key` - Bearer token
    /// * `model` - Chat model name
    /// * `timeout` - Per-request HTTP timeout
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// The configured model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one chat completion and return the first choice's text.
    ///
    /// The text may be empty; callers decide whether that is a failure.
    pub async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await?;

        let body: ChatCompletionResponse = self.handle_response(response).await?;
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or(GenerationError::NoChoices)?;

        Ok(choice.message.content.unwrap_or_default())
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, GenerationError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = match response.json::<ApiErrorResponse>().await {
            Ok(body) => body.error.message,
            Err(_) => format!("HTTP {status}"),
        };

        tracing::warn!(status = status.as_u16(), error = %message, "Generation API error");

        Err(GenerationError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ProposalGenerator for OpenAiGenerator {
    async fn generate(&self, brief: &ProposalBrief) -> Result<String, GenerationError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            temperature: TEMPERATURE,
            messages: prompt::messages(brief),
        };

        tracing::debug!(
            model = %self.model,
            platform = brief.platform.label(),
            "Requesting proposal draft"
        );

        self.complete(&request).await
    }
}
