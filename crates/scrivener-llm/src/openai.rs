//! OpenAI Chat Completions Provider
//!
//! Talks to `POST {base_url}/chat/completions`. Any endpoint speaking the same
//! protocol (Azure OpenAI proxies, vLLM, LiteLLM) works by changing the base URL.
//!
//! # Features
//!
//! - Blocking HTTP, intended to run inside a blocking task
//! - Retry with exponential backoff on transport errors, 429 and 5xx
//! - Per-request timeout
//!
//! # Examples
//!
//! ```no_run
//! use scrivener_domain::traits::LlmProvider;
//! use scrivener_domain::ChatMessage;
//! use scrivener_llm::OpenAiProvider;
//!
//! let provider = OpenAiProvider::new("sk-...").with_model("gpt-4o");
//! let reply = provider.chat(&[ChatMessage::user("Say hello")], 0.0).unwrap();
//! ```

use crate::LlmError;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use scrivener_domain::traits::LlmProvider;
use scrivener_domain::{CancelFlag, ChatMessage};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default chat model
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default timeout for a single HTTP request (120 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default number of attempts per call
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Upper bound on the delay between two attempts
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Granularity at which a backoff sleep notices cancellation
const CANCEL_POLL: Duration = Duration::from_millis(50);

/// Chat-completions provider
///
/// The HTTP client is built on first use, so constructing a provider inside an async
/// context is fine as long as [`LlmProvider::chat`] runs on a blocking thread.
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
    max_retries: u32,
    initial_backoff: Duration,
    client: Mutex<Option<Client>>,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Outcome of a single HTTP attempt
enum Attempt {
    Done(String),
    Retry(LlmError),
}

impl OpenAiProvider {
    /// Create a provider for the default endpoint and model
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: Duration::from_secs(1),
            client: Mutex::new(None),
        }
    }

    /// Use a different API base URL (without the trailing `/chat/completions`)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use a different model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum number of attempts per call (at least one is always made)
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the delay before the first retry; later retries double it
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// API base URL in use
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Delay before attempt `attempt + 1`: doubling from the initial backoff, capped
    fn backoff(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt.saturating_sub(1))
            .and_then(|factor| self.initial_backoff.checked_mul(factor))
            .map_or(MAX_BACKOFF, |delay| delay.min(MAX_BACKOFF))
    }

    fn client(&self) -> Result<Client, LlmError> {
        let mut slot = self
            .client
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| LlmError::Communication(format!("Failed to build HTTP client: {}", e)))?;
        *slot = Some(client.clone());
        Ok(client)
    }

    fn attempt(&self, client: &Client, request: &CompletionRequest<'_>) -> Result<Attempt, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = match client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
        {
            Ok(response) => response,
            Err(e) => {
                return Ok(Attempt::Retry(LlmError::Communication(format!(
                    "Request failed: {}",
                    e
                ))));
            }
        };

        let status = response.status();
        if status.is_success() {
            let body = response
                .text()
                .map_err(|e| LlmError::InvalidResponse(format!("Failed to read body: {}", e)))?;
            return parse_completion(&body).map(Attempt::Done);
        }

        let error_text = response
            .text()
            .unwrap_or_else(|_| "Unknown error".to_string());
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(LlmError::Authentication(format!("HTTP {}: {}", status, error_text)))
            }
            StatusCode::NOT_FOUND => Err(LlmError::ModelNotAvailable(self.model.clone())),
            StatusCode::TOO_MANY_REQUESTS => Ok(Attempt::Retry(LlmError::RateLimitExceeded)),
            s if s.is_server_error() => Ok(Attempt::Retry(LlmError::Communication(format!(
                "HTTP {}: {}",
                status, error_text
            )))),
            _ => Err(LlmError::Communication(format!(
                "HTTP {}: {}",
                status, error_text
            ))),
        }
    }
}

impl LlmProvider for OpenAiProvider {
    type Error = LlmError;

    fn chat(&self, messages: &[ChatMessage], temperature: f32) -> Result<String, LlmError> {
        self.chat_cancellable(messages, temperature, &CancelFlag::new())
    }

    fn chat_cancellable(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        cancel: &CancelFlag,
    ) -> Result<String, LlmError> {
        let client = self.client()?;
        let request = CompletionRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature,
        };

        let attempts = self.max_retries.max(1);
        let mut last_error = None;
        for attempt in 1..=attempts {
            if cancel.is_cancelled() {
                debug!("LLM call cancelled before attempt {}", attempt);
                return Err(LlmError::Cancelled);
            }

            match self.attempt(&client, &request)? {
                Attempt::Done(content) => {
                    debug!("{} answered on attempt {}", self.model, attempt);
                    return Ok(content);
                }
                Attempt::Retry(e) => {
                    warn!("LLM attempt {}/{} failed: {}", attempt, attempts, e);
                    last_error = Some(e);
                }
            }

            if attempt < attempts && !sleep_unless_cancelled(self.backoff(attempt), cancel) {
                return Err(LlmError::Cancelled);
            }
        }

        Err(last_error.unwrap_or_else(|| {
            LlmError::Communication("Max retries exceeded".to_string())
        }))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Sleep for `duration`; false if `cancel` was set first
fn sleep_unless_cancelled(duration: Duration, cancel: &CancelFlag) -> bool {
    let mut remaining = duration;
    while !remaining.is_zero() {
        if cancel.is_cancelled() {
            return false;
        }
        let step = remaining.min(CANCEL_POLL);
        std::thread::sleep(step);
        remaining -= step;
    }
    !cancel.is_cancelled()
}

/// Pull the first choice's text out of a chat-completions body
fn parse_completion(body: &str) -> Result<String, LlmError> {
    let response: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| LlmError::InvalidResponse("Response has no message content".to_string()))
}
