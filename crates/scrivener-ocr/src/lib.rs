//! Scrivener Text Extraction Layer
//!
//! Turns scanned documents into plain text through an external OCR service.
//! Implementations of the `TextExtractor` trait from `scrivener-domain`:
//!
//! - `WhispererClient`: the LLMWhisperer HTTP API
//! - `MockExtractor`: canned text for testing, counts its calls
//!
//! Extraction is the expensive step of the pipeline; callers are expected to put a
//! content cache in front of it.

#![warn(missing_docs)]

mod whisperer;

pub use whisperer::{
    OutputMode, ProcessingMode, WhispererClient, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS,
};

use scrivener_domain::traits::TextExtractor;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during text extraction
#[derive(Error, Debug)]
pub enum OcrError {
    /// The document could not be read from disk
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Document path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// The service rejected the request
    #[error("Service error (HTTP {status}): {message}")]
    Service {
        /// HTTP status code
        status: u16,
        /// Message reported by the service
        message: String,
    },

    /// The service deferred processing instead of answering synchronously
    #[error("Extraction was deferred by the service (hash {0}); asynchronous retrieval is not supported")]
    Deferred(String),

    /// Credentials rejected by the service
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Generic error
    #[error("OCR error: {0}")]
    Other(String),
}

/// Mock extractor for deterministic testing
///
/// Returns queued texts in order, then the default text. Clones share the queue and
/// the call log.
///
/// # Examples
///
/// ```
/// use scrivener_domain::traits::TextExtractor;
/// use scrivener_ocr::MockExtractor;
/// use std::path::Path;
///
/// let ocr = MockExtractor::new("NON-DISCLOSURE AGREEMENT");
/// assert_eq!(ocr.extract_text(Path::new("a.pdf")).unwrap(), "NON-DISCLOSURE AGREEMENT");
/// assert_eq!(ocr.call_count(), 1);
/// ```
#[derive(Clone)]
pub struct MockExtractor {
    default_text: String,
    delay: Option<Duration>,
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    script: VecDeque<Result<String, String>>,
    calls: Vec<PathBuf>,
}

impl MockExtractor {
    /// Create an extractor that returns `text` for every document
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            default_text: text.into(),
            delay: None,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Sleep before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue text for the next call
    pub fn push_text(&self, text: impl Into<String>) {
        self.state().script.push_back(Ok(text.into()));
    }

    /// Queue a failure for the next call
    pub fn push_error(&self, message: impl Into<String>) {
        self.state().script.push_back(Err(message.into()));
    }

    /// Number of extractions performed
    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    /// Paths passed to every call, oldest first
    pub fn calls(&self) -> Vec<PathBuf> {
        self.state().calls.clone()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TextExtractor for MockExtractor {
    type Error = OcrError;

    fn extract_text(&self, path: &Path) -> Result<String, OcrError> {
        let next = {
            let mut state = self.state();
            state.calls.push(path.to_path_buf());
            state.script.pop_front()
        };

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(OcrError::Communication(message)),
            None => Ok(self.default_text.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_extractor_script_then_default() {
        let ocr = MockExtractor::new("default");
        ocr.push_text("first");
        ocr.push_error("service down");

        assert_eq!(ocr.extract_text(Path::new("a.pdf")).unwrap(), "first");
        assert!(matches!(
            ocr.extract_text(Path::new("b.pdf")),
            Err(OcrError::Communication(_))
        ));
        assert_eq!(ocr.extract_text(Path::new("c.pdf")).unwrap(), "default");
        assert_eq!(
            ocr.calls(),
            vec![
                PathBuf::from("a.pdf"),
                PathBuf::from("b.pdf"),
                PathBuf::from("c.pdf")
            ]
        );
    }

    #[test]
    fn test_clones_share_call_count() {
        let ocr = MockExtractor::new("text");
        let clone = ocr.clone();
        clone.extract_text(Path::new("a.pdf")).unwrap();
        assert_eq!(ocr.call_count(), 1);
    }
}
