use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::models::{Language, Request};
use crate::prompts::{self, Prompt};

pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
const MAX_TOKENS: u32 = 150;
const TEMPERATURE: f32 = 0.3;
const CONNECTION_TEST_TIMEOUT_SECS: u64 = 10;

pub const MISSING_KEY_MESSAGE: &str =
    "Please set your OpenAI API key in the settings (hoverdef config set-key <KEY>)";

/// Classified failure of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("{0}")]
    Configuration(String),
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("invalid api key")]
    Unauthorized,
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),
    #[error("{0}")]
    Unclassified(String),
}

impl DispatchError {
    pub fn missing_api_key() -> Self {
        DispatchError::Configuration(MISSING_KEY_MESSAGE.to_string())
    }

    /// Failures worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, DispatchError::RateLimited | DispatchError::NetworkUnreachable(_))
    }

    /// Text shown in place of a result.
    pub fn user_message(&self) -> String {
        match self {
            DispatchError::RateLimited => {
                "Error: Rate limit exceeded. Please try again in a moment.".to_string()
            }
            DispatchError::Unauthorized => {
                "Error: Invalid API key. Please check your settings.".to_string()
            }
            DispatchError::NetworkUnreachable(_) => {
                "Error: Network connection issue. Please check your internet connection.".to_string()
            }
            DispatchError::Configuration(message) | DispatchError::Unclassified(message) => {
                format!("Error: {message}")
            }
        }
    }

    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            429 => DispatchError::RateLimited,
            401 => DispatchError::Unauthorized,
            _ => match serde_json::from_str::<OpenAiErrorResponse>(body) {
                Ok(parsed) => DispatchError::Unclassified(parsed.error.message),
                Err(_) => DispatchError::Unclassified(format!("API error ({status})")),
            },
        }
    }

    fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            DispatchError::NetworkUnreachable(err.to_string())
        } else {
            DispatchError::Unclassified(format!("Request failed: {err}"))
        }
    }
}

/// Something that turns a prompt into reply text.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &Prompt) -> Result<String, DispatchError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiError,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    message: String,
}

/// Chat-completions client.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DispatchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatchError::Unclassified(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_key: api_key.into().trim().to_string(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, DispatchError> {
        Self::new(
            settings.openai_api_key.clone(),
            settings.api_base_url.clone(),
            settings.model.clone(),
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Cheap authenticated call used by `config check`.
    pub async fn test_connection(&self) -> Result<(), DispatchError> {
        if !self.has_api_key() {
            return Err(DispatchError::missing_api_key());
        }
        tracing::info!(base_url = %self.base_url, "testing api connection");

        let response = self
            .http
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(CONNECTION_TEST_TIMEOUT_SECS))
            .send()
            .await
            .map_err(DispatchError::from_transport)?;

        let status = response.status();
        if status.is_success() {
            tracing::info!("api connection test successful");
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        tracing::error!(%status, %body, "api connection test failed");
        Err(DispatchError::from_status(status.as_u16(), &body))
    }
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    async fn complete(&self, prompt: &Prompt) -> Result<String, DispatchError> {
        if !self.has_api_key() {
            return Err(DispatchError::missing_api_key());
        }

        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(DispatchError::from_transport)?;

        let status = response.status();
        let text = response.text().await.map_err(DispatchError::from_transport)?;
        tracing::debug!(%status, bytes = text.len(), "chat completion response");

        if !status.is_success() {
            tracing::error!(%status, body = %text, "chat completion failed");
            return Err(DispatchError::from_status(status.as_u16(), &text));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| DispatchError::Unclassified(format!("Failed to parse response: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| DispatchError::Unclassified("Unexpected response format".to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Pause before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Builds prompts for each request kind and runs them with retries.
pub struct Dispatcher<B> {
    backend: B,
    policy: RetryPolicy,
    system_prompt: String,
    default_language: Language,
}

impl Dispatcher<OpenAiClient> {
    pub fn from_settings(settings: &Settings) -> Result<Self, DispatchError> {
        Ok(Self::new(
            OpenAiClient::from_settings(settings)?,
            settings.retry_policy(),
            settings.system_prompt.clone(),
            settings.default_language,
        ))
    }
}

impl<B: CompletionBackend> Dispatcher<B> {
    pub fn new(backend: B, policy: RetryPolicy, system_prompt: String, default_language: Language) -> Self {
        Self {
            backend,
            policy,
            system_prompt,
            default_language,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn execute(&self, request: &Request) -> Result<String, DispatchError> {
        match request {
            Request::Definition {
                text,
                context,
                target_lang,
            } => self.get_definition(text, context, *target_lang).await,
            Request::Translation { text, target } => self.translate(text, *target).await,
            Request::CustomPrompt { prompt, text, context } => {
                self.custom_prompt(prompt, text, context).await
            }
        }
    }

    pub async fn get_definition(
        &self,
        text: &str,
        context: &str,
        target_lang: Option<Language>,
    ) -> Result<String, DispatchError> {
        let language = target_lang.unwrap_or(self.default_language);
        let prompt = prompts::definition_prompt(&self.system_prompt, text, context, language);
        self.with_retry(&prompt).await
    }

    pub async fn translate(&self, text: &str, target: Language) -> Result<String, DispatchError> {
        let prompt = prompts::translation_prompt(text, target);
        self.with_retry(&prompt).await
    }

    pub async fn custom_prompt(
        &self,
        prompt: &str,
        text: &str,
        context: &str,
    ) -> Result<String, DispatchError> {
        let prompt = prompts::custom_prompt(&self.system_prompt, prompt, text, context);
        self.with_retry(&prompt).await
    }

    async fn with_retry(&self, prompt: &Prompt) -> Result<String, DispatchError> {
        let mut attempt = 0;
        loop {
            match self.backend.complete(prompt).await {
                Err(err) if err.is_transient() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    let delay = self.policy.delay_for(attempt);
                    tracing::warn!(attempt, ?delay, error = %err, "transient dispatch failure, retrying");
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}
