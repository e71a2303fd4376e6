//! Configuration for the Extractor

use scrivener_schema::UnknownFieldPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the Extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Maximum time for a single LLM call (seconds)
    pub llm_timeout_secs: u64,

    /// Maximum time for converting one document to text (seconds)
    pub text_extraction_timeout_secs: u64,

    /// Extra LLM queries allowed when a response fails validation
    pub max_parse_retries: u32,

    /// Delay before the first re-query (milliseconds); doubles on each further retry
    pub retry_backoff_ms: u64,

    /// Treatment of response fields the schema does not declare
    pub unknown_fields: UnknownFieldPolicy,

    /// Suffix appended to a document's path to name its output artifact
    pub output_suffix: String,

    /// Keep the raw text of a rejected LLM response next to the document
    pub preserve_rejected_responses: bool,

    /// Suffix appended to a document's path for a preserved rejected response
    pub rejected_suffix: String,

    /// Maximum documents processed at once
    pub concurrency: usize,
}

impl ExtractorConfig {
    /// Get the LLM timeout as a Duration
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    /// Get the text-extraction timeout as a Duration
    pub fn text_extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.text_extraction_timeout_secs)
    }

    /// Delay before retry number `retry` (1-based)
    pub fn retry_backoff(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry.saturating_sub(1)).unwrap_or(u64::MAX);
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(factor))
    }

    /// Total LLM queries allowed per document
    pub fn max_llm_attempts(&self) -> u32 {
        self.max_parse_retries.saturating_add(1)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.llm_timeout_secs == 0 {
            return Err("llm_timeout_secs must be greater than 0".to_string());
        }
        if self.text_extraction_timeout_secs == 0 {
            return Err("text_extraction_timeout_secs must be greater than 0".to_string());
        }
        if self.max_parse_retries > 10 {
            return Err("max_parse_retries cannot exceed 10".to_string());
        }
        if self.concurrency == 0 {
            return Err("concurrency must be at least 1".to_string());
        }
        check_suffix("output_suffix", &self.output_suffix)?;
        check_suffix("rejected_suffix", &self.rejected_suffix)?;
        if self.output_suffix == self.rejected_suffix {
            return Err("rejected_suffix must differ from output_suffix".to_string());
        }
        Ok(())
    }
}

fn check_suffix(name: &str, suffix: &str) -> Result<(), String> {
    if suffix.is_empty() {
        return Err(format!("{} must not be empty", name));
    }
    if suffix.contains('/') || suffix.contains('\\') {
        return Err(format!("{} must not contain a path separator", name));
    }
    Ok(())
}

impl Default for ExtractorConfig {
    /// Default configuration: sequential, strict, no re-queries
    fn default() -> Self {
        Self {
            llm_timeout_secs: 120,
            text_extraction_timeout_secs: 300,
            max_parse_retries: 0,
            retry_backoff_ms: 1_000,
            unknown_fields: UnknownFieldPolicy::Reject,
            output_suffix: ".json".to_string(),
            preserve_rejected_responses: true,
            rejected_suffix: ".rejected.txt".to_string(),
            concurrency: 1,
        }
    }
}

impl ExtractorConfig {
    /// Lenient preset: longer timeouts, two re-queries, extra fields dropped
    pub fn lenient() -> Self {
        Self {
            llm_timeout_secs: 300,
            text_extraction_timeout_secs: 600,
            max_parse_retries: 2,
            unknown_fields: UnknownFieldPolicy::Ignore,
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}
