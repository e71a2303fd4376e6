//! LLMWhisperer client
//!
//! Uploads the raw document bytes to `POST {base_url}/whisper` and returns the
//! extracted text from a synchronous (HTTP 200) answer. An HTTP 202 means the service
//! switched to asynchronous processing, which this client reports as an error.

use crate::OcrError;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use scrivener_domain::traits::TextExtractor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://llmwhisperer-api.unstract.com/v1";

/// Header carrying the API key
const API_KEY_HEADER: &str = "unstract-key";

/// Default request timeout (300 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// How the service reads the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    /// Optical character recognition over rendered pages
    #[default]
    Ocr,
    /// Use the embedded text layer only
    Text,
}

impl ProcessingMode {
    /// Query-string value
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingMode::Ocr => "ocr",
            ProcessingMode::Text => "text",
        }
    }
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Layout of the returned text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    /// Preserve the page layout with spacing
    #[default]
    LinePrinter,
    /// Plain running text
    Text,
}

impl OutputMode {
    /// Query-string value
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputMode::LinePrinter => "line-printer",
            OutputMode::Text => "text",
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Deserialize)]
struct ServiceMessage {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "whisper-hash")]
    whisper_hash: Option<String>,
}

/// LLMWhisperer API client
pub struct WhispererClient {
    base_url: String,
    api_key: String,
    processing_mode: ProcessingMode,
    output_mode: OutputMode,
    timeout: Duration,
    client: Mutex<Option<Client>>,
}

impl WhispererClient {
    /// Create a client for the default endpoint in OCR / line-printer mode
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            processing_mode: ProcessingMode::default(),
            output_mode: OutputMode::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            client: Mutex::new(None),
        }
    }

    /// Use a different API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the processing mode
    pub fn with_processing_mode(mut self, mode: ProcessingMode) -> Self {
        self.processing_mode = mode;
        self
    }

    /// Set the output mode
    pub fn with_output_mode(mut self, mode: OutputMode) -> Self {
        self.output_mode = mode;
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full request URL including query parameters
    pub fn request_url(&self) -> String {
        format!(
            "{}/whisper?processing_mode={}&output_mode={}&timeout={}",
            self.base_url,
            self.processing_mode,
            self.output_mode,
            self.timeout.as_secs()
        )
    }

    fn client(&self) -> Result<Client, OcrError> {
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
            .map_err(|e| OcrError::Communication(format!("Failed to build HTTP client: {}", e)))?;
        *slot = Some(client.clone());
        Ok(client)
    }
}

impl TextExtractor for WhispererClient {
    type Error = OcrError;

    fn extract_text(&self, path: &Path) -> Result<String, OcrError> {
        let bytes = std::fs::read(path).map_err(|source| OcrError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Sending {} ({} bytes) for text extraction", path.display(), bytes.len());
        let response = self
            .client()?
            .post(self.request_url())
            .header(API_KEY_HEADER, &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .map_err(|e| OcrError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| OcrError::Communication(format!("Failed to read body: {}", e)))?;

        match status {
            StatusCode::OK => {
                debug!("Extracted {} characters from {}", body.len(), path.display());
                Ok(body)
            }
            StatusCode::ACCEPTED => {
                let hash = parse_message(&body)
                    .and_then(|m| m.whisper_hash)
                    .unwrap_or_default();
                Err(OcrError::Deferred(hash))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(OcrError::Authentication(
                parse_message(&body).map(|m| m.message).unwrap_or(body),
            )),
            _ => Err(OcrError::Service {
                status: status.as_u16(),
                message: parse_message(&body)
                    .map(|m| m.message)
                    .filter(|m| !m.is_empty())
                    .unwrap_or(body),
            }),
        }
    }
}

fn parse_message(body: &str) -> Option<ServiceMessage> {
    serde_json::from_str(body).ok()
}
