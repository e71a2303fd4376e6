//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the extraction pipeline and
//! infrastructure. Infrastructure implementations live in other crates.

use crate::{CancelFlag, ChatMessage, Fingerprint};
use std::path::Path;

/// Trait for LLM provider operations
///
/// Implemented by the infrastructure layer (scrivener-llm)
pub trait LlmProvider {
    /// Error type for LLM operations
    type Error;

    /// Send a role-tagged prompt and return the model's single textual reply
    fn chat(&self, messages: &[ChatMessage], temperature: f32) -> Result<String, Self::Error>;

    /// Like [`chat`](Self::chat), but stops at the next checkpoint once `cancel` is set
    ///
    /// Providers that make several requests per call (retries) should check the flag
    /// before each one. The default makes a single uninterruptible call.
    fn chat_cancellable(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        cancel: &CancelFlag,
    ) -> Result<String, Self::Error> {
        let _ = cancel;
        self.chat(messages, temperature)
    }

    /// Name of the model answering requests, for result metadata
    fn model_name(&self) -> &str;
}

/// Trait for converting a document file into plain text
///
/// Implemented by the infrastructure layer (scrivener-ocr)
pub trait TextExtractor {
    /// Error type for text extraction
    type Error;

    /// Extract the text of the document at `path`
    fn extract_text(&self, path: &Path) -> Result<String, Self::Error>;
}

/// Trait for the fingerprint-keyed store of previously extracted text
///
/// Implemented by the infrastructure layer (scrivener-store)
pub trait TextCache {
    /// Error type for cache operations
    type Error;

    /// Return the cached text for `fingerprint`, if present
    fn get(&self, fingerprint: &Fingerprint) -> Result<Option<String>, Self::Error>;

    /// Store `text` under `fingerprint` unless an entry already exists
    fn put(&self, fingerprint: &Fingerprint, text: &str) -> Result<(), Self::Error>;
}
