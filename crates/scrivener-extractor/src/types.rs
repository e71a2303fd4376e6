//! Result types for extraction

use chrono::{DateTime, Utc};
use scrivener_domain::Fingerprint;
use scrivener_schema::Record;
use std::path::PathBuf;

/// Result of extracting one document
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Validated instance of the root record type
    pub record: Record,

    /// Where the instance was persisted
    pub output_path: PathBuf,

    /// Metadata about the extraction
    pub metadata: ExtractionMetadata,
}

/// Metadata about an extraction operation
#[derive(Debug, Clone)]
pub struct ExtractionMetadata {
    /// Source document
    pub document: PathBuf,

    /// Content fingerprint of the document
    pub fingerprint: Fingerprint,

    /// Whether the text came from the cache
    pub cache_hit: bool,

    /// Length of the document text in characters
    pub text_chars: usize,

    /// LLM queries made, including re-queries after rejected responses
    pub llm_attempts: u32,

    /// Model that produced the response
    pub model_name: String,

    /// Completion time
    pub extracted_at: DateTime<Utc>,

    /// Wall-clock processing time in milliseconds
    pub processing_time_ms: u64,
}
