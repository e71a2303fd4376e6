//! Core Extractor implementation

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::parser::parse_response;
use crate::prompt::{PromptBuilder, PromptConfig};
use crate::types::{ExtractionMetadata, ExtractionResult};
use chrono::Utc;
use scrivener_domain::traits::{LlmProvider, TextCache, TextExtractor};
use scrivener_domain::{CancelFlag, ChatMessage, Fingerprint, TypeModel};
use scrivener_schema::Record;
use scrivener_store::{fingerprint_file, write_atomic};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::sync::OwnedMutexGuard;
use tokio::time::timeout;
use tracing::{debug, info, info_span, warn, Instrument};

/// Per-fingerprint async locks
///
/// Holding the lock for a fingerprint makes the cache lookup, text extraction and
/// cache population for that content a single step, so two identical documents in
/// flight at once cause one extraction, not two. An entry lives only while some task
/// holds or waits for it.
#[derive(Default)]
struct FingerprintLocks {
    locks: Mutex<HashMap<Fingerprint, Arc<tokio::sync::Mutex<()>>>>,
}

impl FingerprintLocks {
    fn map(&self) -> MutexGuard<'_, HashMap<Fingerprint, Arc<tokio::sync::Mutex<()>>>> {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Wait for exclusive use of `fingerprint`
    async fn acquire(&self, fingerprint: &Fingerprint) -> FingerprintGuard<'_> {
        let lock = Arc::clone(self.map().entry(fingerprint.clone()).or_default());
        let guard = lock.lock_owned().await;
        FingerprintGuard {
            locks: self,
            fingerprint: fingerprint.clone(),
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.map().len()
    }
}

/// Exclusive use of one fingerprint; the map entry goes with the last user
struct FingerprintGuard<'a> {
    locks: &'a FingerprintLocks,
    fingerprint: Fingerprint,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for FingerprintGuard<'_> {
    fn drop(&mut self) {
        // Release first so the count below only sees the map and any waiters.
        drop(self.guard.take());
        let mut locks = self.locks.map();
        if locks
            .get(&self.fingerprint)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.fingerprint);
        }
    }
}

/// Text obtained for a document
struct DocumentText {
    fingerprint: Fingerprint,
    text: String,
    cache_hit: bool,
}

/// The Extractor turns documents into validated records
///
/// One extractor serves one schema and one prompt for its whole lifetime; the format
/// instructions are rendered once at construction. It is safe to share across tasks
/// behind an `Arc`.
pub struct Extractor<L, T, C> {
    llm: Arc<L>,
    text_extractor: Arc<T>,
    cache: Arc<C>,
    model: Arc<TypeModel>,
    prompt: PromptBuilder,
    instructions: Arc<str>,
    config: ExtractorConfig,
    locks: FingerprintLocks,
}

impl<L, T, C> Extractor<L, T, C>
where
    L: LlmProvider + Send + Sync + 'static,
    T: TextExtractor + Send + Sync + 'static,
    C: TextCache + Send + Sync + 'static,
    L::Error: Display + Send + 'static,
    T::Error: Display + Send + 'static,
    C::Error: Display + Send + 'static,
{
    /// Create a new Extractor
    ///
    /// Fails with [`ExtractorError::Config`] if the configuration or the prompt
    /// templates are invalid.
    pub fn new(
        llm: L,
        text_extractor: T,
        cache: C,
        model: TypeModel,
        prompt: &PromptConfig,
        config: ExtractorConfig,
    ) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;
        prompt.validate().map_err(ExtractorError::Config)?;
        let builder = PromptBuilder::new(prompt).map_err(ExtractorError::Config)?;
        let instructions: Arc<str> = scrivener_schema::render(&model).into();

        Ok(Self {
            llm: Arc::new(llm),
            text_extractor: Arc::new(text_extractor),
            cache: Arc::new(cache),
            model: Arc::new(model),
            prompt: builder,
            instructions,
            config,
            locks: FingerprintLocks::default(),
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Compiled type model in use
    pub fn model(&self) -> &TypeModel {
        &self.model
    }

    /// Rendered format instructions
    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// Path of the output artifact for `document`
    pub fn output_path(&self, document: &Path) -> PathBuf {
        with_suffix(document, &self.config.output_suffix)
    }

    /// Path where a rejected response for `document` is preserved
    pub fn rejected_path(&self, document: &Path) -> PathBuf {
        with_suffix(document, &self.config.rejected_suffix)
    }

    /// Extract one document and persist the result next to it
    pub async fn extract(&self, document: &Path) -> Result<ExtractionResult, ExtractorError> {
        let span = info_span!("document", path = %document.display());
        self.extract_inner(document).instrument(span).await
    }

    async fn extract_inner(&self, document: &Path) -> Result<ExtractionResult, ExtractorError> {
        let start_time = Instant::now();

        // 1. Text, through the cache
        let DocumentText {
            fingerprint,
            text,
            cache_hit,
        } = self.document_text(document).await?;

        // 2-3. Prompt
        debug!("Format instructions:\n{}", self.instructions);
        let messages = Arc::new(self.prompt.build(&self.instructions, &text));

        // 4-5. Query and validate, with bounded re-queries
        let (record, llm_attempts) = self.query(document, messages).await?;

        // 6. Persist
        let output_path = self.output_path(document);
        self.persist(&output_path, &record).await?;
        self.discard_rejected(document).await;

        let processing_time_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Wrote {} ({} ms, {} LLM attempt(s), cache {})",
            output_path.display(),
            processing_time_ms,
            llm_attempts,
            if cache_hit { "hit" } else { "miss" }
        );

        Ok(ExtractionResult {
            record,
            output_path,
            metadata: ExtractionMetadata {
                document: document.to_path_buf(),
                fingerprint,
                cache_hit,
                text_chars: text.chars().count(),
                llm_attempts,
                model_name: self.llm.model_name().to_string(),
                extracted_at: Utc::now(),
                processing_time_ms,
            },
        })
    }

    /// Fingerprint the document and return its text, extracting it on a cache miss
    async fn document_text(&self, document: &Path) -> Result<DocumentText, ExtractorError> {
        let path = document.to_path_buf();
        let fingerprint = run_blocking(move || fingerprint_file(&path))
            .await?
            .map_err(|e| ExtractorError::DocumentRead {
                path: document.to_path_buf(),
                message: e.to_string(),
            })?;
        debug!("Fingerprint {}", fingerprint);

        let _guard = self.locks.acquire(&fingerprint).await;

        let cache = Arc::clone(&self.cache);
        let key = fingerprint.clone();
        match run_blocking(move || cache.get(&key)).await? {
            Ok(Some(text)) => {
                info!("Text for {} found in cache ({})", document.display(), fingerprint.short());
                return Ok(DocumentText {
                    fingerprint,
                    text,
                    cache_hit: true,
                });
            }
            Ok(None) => {
                info!("Text for {} not cached ({})", document.display(), fingerprint.short());
            }
            Err(e) => {
                warn!("Cache lookup failed, treating as a miss: {}", e);
            }
        }

        let extractor = Arc::clone(&self.text_extractor);
        let path = document.to_path_buf();
        let limit = self.config.text_extraction_timeout();
        let text = timeout(limit, run_blocking(move || extractor.extract_text(&path)))
            .await
            .map_err(|_| ExtractorError::Timeout {
                stage: "Text extraction",
                secs: limit.as_secs(),
            })??
            .map_err(|e| ExtractorError::TextExtraction(e.to_string()))?;

        let cache = Arc::clone(&self.cache);
        let key = fingerprint.clone();
        let cached = text.clone();
        if let Err(e) = run_blocking(move || cache.put(&key, &cached)).await? {
            warn!("Failed to populate cache: {}", e);
        }

        Ok(DocumentText {
            fingerprint,
            text,
            cache_hit: false,
        })
    }

    /// Query the LLM until a response validates or the attempts run out
    async fn query(
        &self,
        document: &Path,
        messages: Arc<Vec<ChatMessage>>,
    ) -> Result<(Record, u32), ExtractorError> {
        let max_attempts = self.config.max_llm_attempts();
        let limit = self.config.llm_timeout();
        let temperature = self.prompt.temperature();

        let mut attempt = 1;
        loop {
            // Dropping the guard, on timeout or abort, tells the provider to stop retrying.
            let cancel = CancelFlag::new();
            let _cancel_on_exit = cancel.guard();

            let llm = Arc::clone(&self.llm);
            let prompt = Arc::clone(&messages);
            let call = run_blocking(move || llm.chat_cancellable(&prompt, temperature, &cancel));
            let response = timeout(limit, call)
                .await
                .map_err(|_| ExtractorError::Timeout {
                    stage: "LLM call",
                    secs: limit.as_secs(),
                })??
                .map_err(|e| ExtractorError::LlmCall(e.to_string()))?;
            debug!("Raw LLM response:\n{}", response);

            match parse_response(&response, &self.model, self.config.unknown_fields) {
                Ok(record) => return Ok((record, attempt)),
                Err(message) => {
                    warn!(
                        "Response rejected (attempt {}/{}): {}\n{}",
                        attempt, max_attempts, message, response
                    );
                    if attempt >= max_attempts {
                        self.preserve_rejected(document, &response).await;
                        return Err(ExtractorError::ResponseParse {
                            message,
                            raw_response: response,
                        });
                    }
                }
            }

            tokio::time::sleep(self.config.retry_backoff(attempt)).await;
            attempt += 1;
        }
    }

    async fn persist(&self, output_path: &Path, record: &Record) -> Result<(), ExtractorError> {
        let persist_error = |message: String| ExtractorError::Persist {
            path: output_path.to_path_buf(),
            message,
        };

        let mut json = record.to_json_pretty().map_err(|e| persist_error(e.to_string()))?;
        json.push('\n');

        let path = output_path.to_path_buf();
        run_blocking(move || write_atomic(&path, json.as_bytes()))
            .await?
            .map_err(|e| persist_error(e.to_string()))
    }

    /// Remove a rejected response left by an earlier failed run
    async fn discard_rejected(&self, document: &Path) {
        let path = self.rejected_path(document);
        let target = path.clone();
        match run_blocking(move || std::fs::remove_file(&target)).await {
            Ok(Ok(())) => debug!("Removed stale rejected response {}", path.display()),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
            Ok(Err(e)) => warn!("Failed to remove {}: {}", path.display(), e),
            Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
        }
    }

    async fn preserve_rejected(&self, document: &Path, response: &str) {
        if !self.config.preserve_rejected_responses {
            return;
        }
        let path = self.rejected_path(document);
        let target = path.clone();
        let bytes = response.as_bytes().to_vec();
        match run_blocking(move || write_atomic(&target, &bytes)).await {
            Ok(Ok(())) => info!("Preserved rejected response at {}", path.display()),
            Ok(Err(e)) => warn!("Failed to preserve rejected response: {}", e),
            Err(e) => warn!("Failed to preserve rejected response: {}", e),
        }
    }
}

/// Append `suffix` to the full file name of `path`
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Run blocking work on the blocking pool
async fn run_blocking<F, R>(f: F) -> Result<R, ExtractorError>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        if e.is_cancelled() {
            ExtractorError::Cancelled
        } else {
            ExtractorError::Internal(format!("Worker task failed: {}", e))
        }
    })
}
