//! Chat completion client for OpenAI-compatible endpoints.
//!
//! The analyzer talks to the model through the [`ChatClient`] trait so a
//! different transport (or a fake in tests) can be plugged in.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors produced while asking the model for an analysis.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// No API key was configured. Checked before any network call.
    #[error("OPENAI_API_KEY environment variable not set.")]
    MissingCredential,

    /// The request never got an HTTP response (connect, timeout, ...).
    #[error("{0}")]
    Transport(String),

    /// The endpoint answered with a non-success status.
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// The endpoint answered 2xx but the body was not a usable completion.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The project structure could not be rendered as JSON.
    #[error("Failed to serialize project structure: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AnalysisError {
    /// Failures of the remote call itself, as opposed to local preconditions.
    pub fn is_remote_failure(&self) -> bool {
        matches!(
            self,
            AnalysisError::Transport(_)
                | AnalysisError::Api { .. }
                | AnalysisError::MalformedResponse(_)
        )
    }
}

/// Message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A conversation to submit to a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// Anything that can turn a conversation into the model's reply text.
pub trait ChatClient {
    /// Submit the conversation and return the first choice's content verbatim.
    fn complete(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<String, AnalysisError>> + Send;
}

/// Settings for [`OpenAiClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Base URL, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Bearer token. Missing or empty means every call fails fast.
    pub api_key: Option<String>,
    /// Request timeout; the HTTP client default (none) when unset.
    pub timeout_seconds: Option<u64>,
    /// Sent as `"store": true` when set.
    pub store: bool,
}

impl From<&crate::config::ModelConfig> for ClientSettings {
    fn from(config: &crate::config::ModelConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_key: None,
            timeout_seconds: config.timeout_seconds,
            store: config.store,
        }
    }
}

/// Chat completions request body.
#[derive(Debug, Serialize)]
struct CompletionPayload<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    store: Option<bool>,
}

/// Chat completions response body (only the parts we read).
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for `POST {base_url}/chat/completions`.
pub struct OpenAiClient {
    settings: ClientSettings,
    http_client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client. A missing API key is accepted here and reported on use.
    pub fn new(settings: ClientSettings) -> Result<Self, AnalysisError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = settings.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let http_client = builder
            .build()
            .map_err(|e| AnalysisError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            settings,
            http_client,
        })
    }

    fn api_key(&self) -> Result<&str, AnalysisError> {
        self.settings
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(AnalysisError::MissingCredential)
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }
}

impl ChatClient for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, AnalysisError> {
        let api_key = self.api_key()?;
        let url = self.endpoint();

        let payload = CompletionPayload {
            model: &request.model,
            messages: &request.messages,
            store: self.settings.store.then_some(true),
        };

        debug!(
            "Sending chat request to {} with {} messages",
            url,
            request.messages.len()
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalysisError::Transport(format!(
                        "Request timed out after {}s",
                        self.settings.timeout_seconds.unwrap_or_default()
                    ))
                } else if e.is_connect() {
                    AnalysisError::Transport(format!(
                        "Cannot connect to {}: {}",
                        self.settings.base_url, e
                    ))
                } else {
                    AnalysisError::Transport(format!("Failed to send request: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                AnalysisError::MalformedResponse("response contained no message content".to_string())
            })
    }
}
