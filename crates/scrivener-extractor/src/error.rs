//! Error types for the Extractor

use scrivener_schema::SchemaError;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during extraction
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Schema document failed to compile
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Invalid configuration (extractor settings, prompt document, catalog)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The document could not be read for fingerprinting
    #[error("Failed to read document {path}: {message}")]
    DocumentRead {
        /// Document path
        path: PathBuf,
        /// Underlying error
        message: String,
    },

    /// The text-extraction collaborator failed
    #[error("Text extraction failed: {0}")]
    TextExtraction(String),

    /// The LLM collaborator failed
    #[error("LLM call failed: {0}")]
    LlmCall(String),

    /// A collaborator call did not finish in time
    #[error("{stage} timed out after {secs}s")]
    Timeout {
        /// Which call timed out
        stage: &'static str,
        /// Configured limit
        secs: u64,
    },

    /// The LLM response did not conform to the schema
    #[error("Response did not match schema: {message}")]
    ResponseParse {
        /// What was wrong with the response
        message: String,
        /// The response exactly as received
        raw_response: String,
    },

    /// The output artifact could not be written
    #[error("Failed to write {path}: {message}")]
    Persist {
        /// Artifact path
        path: PathBuf,
        /// Underlying error
        message: String,
    },

    /// The document was cancelled before it finished
    #[error("Cancelled")]
    Cancelled,

    /// A worker task failed unexpectedly
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of an [`ExtractorError`], for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Schema compile error
    Schema,
    /// Configuration error
    Config,
    /// Document unreadable
    DocumentRead,
    /// OCR failed
    TextExtraction,
    /// LLM failed
    LlmCall,
    /// A call exceeded its timeout
    Timeout,
    /// Response rejected by validation
    ResponseParse,
    /// Artifact write failed
    Persist,
    /// Cancelled by the user
    Cancelled,
    /// Worker failure
    Internal,
}

impl FailureKind {
    /// Short label used in summaries
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Schema => "schema",
            FailureKind::Config => "config",
            FailureKind::DocumentRead => "document-read",
            FailureKind::TextExtraction => "text-extraction",
            FailureKind::LlmCall => "llm-call",
            FailureKind::Timeout => "timeout",
            FailureKind::ResponseParse => "response-parse",
            FailureKind::Persist => "persist",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Internal => "internal",
        }
    }

    /// Whether this kind aborts the whole run rather than one document
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(self, FailureKind::Schema | FailureKind::Config)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ExtractorError {
    /// Classify this error
    pub fn kind(&self) -> FailureKind {
        match self {
            ExtractorError::Schema(_) => FailureKind::Schema,
            ExtractorError::Config(_) => FailureKind::Config,
            ExtractorError::DocumentRead { .. } => FailureKind::DocumentRead,
            ExtractorError::TextExtraction(_) => FailureKind::TextExtraction,
            ExtractorError::LlmCall(_) => FailureKind::LlmCall,
            ExtractorError::Timeout { .. } => FailureKind::Timeout,
            ExtractorError::ResponseParse { .. } => FailureKind::ResponseParse,
            ExtractorError::Persist { .. } => FailureKind::Persist,
            ExtractorError::Cancelled => FailureKind::Cancelled,
            ExtractorError::Internal(_) => FailureKind::Internal,
        }
    }
}
