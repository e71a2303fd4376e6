//! Scrivener LLM Provider Layer
//!
//! Implementations of the `LlmProvider` trait from `scrivener-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: Scripted responses for testing, no network
//! - `OpenAiProvider`: Chat-completions API (OpenAI or any compatible endpoint)
//!
//! Both are synchronous. The extraction pipeline calls them from a blocking task
//! under a timeout.
//!
//! # Examples
//!
//! ```
//! use scrivener_domain::traits::LlmProvider;
//! use scrivener_domain::ChatMessage;
//! use scrivener_llm::MockProvider;
//!
//! let provider = MockProvider::new(r#"{"parties": []}"#);
//! let reply = provider.chat(&[ChatMessage::user("extract")], 0.0).unwrap();
//! assert_eq!(reply, r#"{"parties": []}"#);
//! assert_eq!(provider.call_count(), 1);
//! ```

#![warn(missing_docs)]

pub mod openai;

use scrivener_domain::traits::LlmProvider;
use scrivener_domain::ChatMessage;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

pub use openai::OpenAiProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Credentials rejected by the provider
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The call was abandoned by its caller
    #[error("Cancelled")]
    Cancelled,

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

/// One recorded call to a [`MockProvider`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Messages sent
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature requested
    pub temperature: f32,
}

enum Scripted {
    Reply(String),
    Fail(String),
}

#[derive(Default)]
struct MockState {
    script: VecDeque<Scripted>,
    calls: Vec<RecordedCall>,
}

/// Mock LLM provider for deterministic testing
///
/// Replies are taken from a script in order; once the script is exhausted every
/// call returns the default response. Clones share the script and the call log.
///
/// # Examples
///
/// ```
/// use scrivener_domain::traits::LlmProvider;
/// use scrivener_domain::ChatMessage;
/// use scrivener_llm::MockProvider;
///
/// let provider = MockProvider::new("fallback");
/// provider.push_response("first");
/// provider.push_error("provider unavailable");
///
/// let prompt = [ChatMessage::user("q")];
/// assert_eq!(provider.chat(&prompt, 0.0).unwrap(), "first");
/// assert!(provider.chat(&prompt, 0.0).is_err());
/// assert_eq!(provider.chat(&prompt, 0.0).unwrap(), "fallback");
/// ```
#[derive(Clone)]
pub struct MockProvider {
    default_response: String,
    model: String,
    delay: Option<Duration>,
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    /// Create a provider that answers every call with `response`
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            model: "mock".to_string(),
            delay: None,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Report a different model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sleep before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a reply for the next unscripted call
    pub fn push_response(&self, response: impl Into<String>) {
        self.state().script.push_back(Scripted::Reply(response.into()));
    }

    /// Queue a failure for the next unscripted call
    pub fn push_error(&self, message: impl Into<String>) {
        self.state().script.push_back(Scripted::Fail(message.into()));
    }

    /// Number of calls made so far
    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    /// Every call made so far, oldest first
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    /// The most recent call
    pub fn last_call(&self) -> Option<RecordedCall> {
        self.state().calls.last().cloned()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("{}")
    }
}

impl LlmProvider for MockProvider {
    type Error = LlmError;

    fn chat(&self, messages: &[ChatMessage], temperature: f32) -> Result<String, LlmError> {
        let next = {
            let mut state = self.state();
            state.calls.push(RecordedCall {
                messages: messages.to_vec(),
                temperature,
            });
            state.script.pop_front()
        };

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        match next {
            Some(Scripted::Reply(reply)) => Ok(reply),
            Some(Scripted::Fail(message)) => Err(LlmError::Communication(message)),
            None => Ok(self.default_response.clone()),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_provider_default() {
        let provider = MockProvider::new("Test response");
        let result = provider.chat(&[ChatMessage::user("any prompt")], 0.0);
        assert_eq!(result.unwrap(), "Test response");
        assert_eq!(provider.model_name(), "mock");
    }

    #[test]
    fn test_mock_provider_script_order() {
        let provider = MockProvider::default();
        provider.push_response("one");
        provider.push_response("two");

        let prompt = [ChatMessage::user("q")];
        assert_eq!(provider.chat(&prompt, 0.0).unwrap(), "one");
        assert_eq!(provider.chat(&prompt, 0.0).unwrap(), "two");
        assert_eq!(provider.chat(&prompt, 0.0).unwrap(), "{}");
    }

    #[test]
    fn test_mock_provider_records_calls() {
        let provider = MockProvider::new("ok").with_model("gpt-test");
        let messages = vec![ChatMessage::system("rules"), ChatMessage::user("document")];

        provider.chat(&messages, 0.0).unwrap();
        provider.chat(&messages[1..], 0.7).unwrap();

        assert_eq!(provider.call_count(), 2);
        let calls = provider.calls();
        assert_eq!(calls[0].messages, messages);
        assert_eq!(provider.last_call().unwrap().temperature, 0.7);
        assert_eq!(provider.model_name(), "gpt-test");
    }

    #[test]
    fn test_mock_provider_error() {
        let provider = MockProvider::new("ok");
        provider.push_error("boom");

        match provider.chat(&[ChatMessage::user("q")], 0.0) {
            Err(LlmError::Communication(message)) => assert_eq!(message, "boom"),
            other => panic!("Expected Communication error, got {:?}", other),
        }
    }

    #[test]
    fn test_clones_share_state() {
        let provider = MockProvider::new("ok");
        let clone = provider.clone();
        clone.chat(&[ChatMessage::user("q")], 0.0).unwrap();
        assert_eq!(provider.call_count(), 1);
    }
}
