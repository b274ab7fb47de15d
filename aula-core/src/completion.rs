//! Completion API client.
//!
//! Sends prompts to a Perplexity-compatible `/chat/completions` endpoint.
//! [`CompletionClient::complete`] reports typed errors; [`CompletionClient::answer`]
//! folds them into a [`Reply`] so callers can show the outcome directly.

use crate::config::CompletionConfig;
use crate::model::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Reply};
use crate::prompt::DEFAULT_SYSTEM_PROMPT;
use thiserror::Error;
use tracing::{debug, error, instrument};

/// Prefix that marks a failed completion in chat output
pub const ERROR_PREFIX: &str = "❌ ";

/// Shown when the provider answers without any content
pub const EMPTY_ANSWER: &str = "Sin respuesta generada.";

/// Errors that can occur when calling the completion endpoint
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Completion API key is not configured (set PERPLEXITY_API_KEY)")]
    MissingApiKey,

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Completion endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
}

impl CompletionError {
    /// Wording shown in the chat for this failure
    pub fn user_message(&self) -> String {
        match self {
            CompletionError::Status { body, .. } => {
                format!("{}Error Perplexity: {}", ERROR_PREFIX, body)
            }
            CompletionError::MissingApiKey => format!(
                "{}Falta configurar la clave de Perplexity (PERPLEXITY_API_KEY).",
                ERROR_PREFIX
            ),
            CompletionError::Transport(_) => {
                format!("{}Error inesperado al consultar Perplexity.", ERROR_PREFIX)
            }
        }
    }
}

/// Client for the completion endpoint
#[derive(Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    config: CompletionConfig,
}

impl CompletionClient {
    pub fn new(config: CompletionConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Build the request body for `prompt`
    pub fn build_request(&self, prompt: &str, web_search: bool) -> ChatCompletionRequest {
        let system = self
            .config
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);

        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(prompt)],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            search_mode: web_search.then(|| "web".to_string()),
        }
    }

    /// Send `prompt` and return the generated text
    #[instrument(skip(self, prompt), fields(model = %self.config.model, prompt_len = prompt.len()))]
    pub async fn complete(&self, prompt: &str, web_search: bool) -> Result<String, CompletionError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(CompletionError::MissingApiKey)?;

        let body = self.build_request(prompt, web_search);
        debug!(web_search, "Calling completion endpoint");

        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        Ok(parsed
            .first_content()
            .unwrap_or(EMPTY_ANSWER)
            .to_string())
    }

    /// Like [`complete`](Self::complete) but never fails
    pub async fn answer(&self, prompt: &str, web_search: bool) -> Reply {
        match self.complete(prompt, web_search).await {
            Ok(text) => Reply::Answer(text),
            Err(e) => {
                error!("Completion failed: {}", e);
                Reply::Failure(e.user_message())
            }
        }
    }
}
