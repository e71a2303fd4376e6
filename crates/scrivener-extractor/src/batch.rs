//! Batch processing with bounded concurrency and cooperative cancellation

use crate::error::{ExtractorError, FailureKind};
use crate::extractor::Extractor;
use crate::types::ExtractionResult;
use scrivener_domain::traits::{LlmProvider, TextCache, TextExtractor};
use scrivener_domain::RunId;
use std::fmt::Display;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, info_span, warn, Instrument};

/// Why a document failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFailure {
    /// Failure classification
    pub kind: FailureKind,
    /// Human-readable message
    pub message: String,
}

impl From<&ExtractorError> for DocumentFailure {
    fn from(e: &ExtractorError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

/// Outcome of one document in a batch
#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    /// Source document
    pub document: PathBuf,
    /// Result, or why it failed
    pub result: Result<ExtractionResult, DocumentFailure>,
}

/// Summary of a batch run
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Identifier of this run
    pub run_id: RunId,
    /// One outcome per input document, in input order
    pub outcomes: Vec<DocumentOutcome>,
    /// Whether the run was cancelled before finishing
    pub cancelled: bool,
    /// Wall-clock time of the run in milliseconds
    pub elapsed_ms: u64,
}

impl BatchReport {
    /// Successful extractions
    pub fn succeeded(&self) -> impl Iterator<Item = &ExtractionResult> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    /// Failed documents with their failures
    pub fn failed(&self) -> impl Iterator<Item = (&PathBuf, &DocumentFailure)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|f| (&o.document, f)))
    }

    /// Number of successful documents
    pub fn success_count(&self) -> usize {
        self.succeeded().count()
    }

    /// Number of failed documents (cancelled ones included)
    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }

    /// Whether any document failed
    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }
}

/// Runs an [`Extractor`] over many documents
///
/// At most `concurrency` documents are in flight, so a concurrency of 1 processes them
/// one at a time. Start order across documents is not guaranteed; the report always
/// lists outcomes in input order. A failing document never stops the rest of the batch.
pub struct BatchRunner<L, T, C> {
    extractor: Arc<Extractor<L, T, C>>,
    concurrency: usize,
}

impl<L, T, C> BatchRunner<L, T, C>
where
    L: LlmProvider + Send + Sync + 'static,
    T: TextExtractor + Send + Sync + 'static,
    C: TextCache + Send + Sync + 'static,
    L::Error: Display + Send + 'static,
    T::Error: Display + Send + 'static,
    C::Error: Display + Send + 'static,
{
    /// Create a runner using the extractor's configured concurrency
    pub fn new(extractor: Extractor<L, T, C>) -> Self {
        let concurrency = extractor.config().concurrency.max(1);
        Self {
            extractor: Arc::new(extractor),
            concurrency,
        }
    }

    /// Override the concurrency
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// The extractor being run
    pub fn extractor(&self) -> &Extractor<L, T, C> {
        &self.extractor
    }

    /// Process `documents`, stopping early on Ctrl+C
    pub async fn run(&self, documents: Vec<PathBuf>) -> BatchReport {
        self.run_until(documents, async {
            if tokio::signal::ctrl_c().await.is_err() {
                warn!("Cannot listen for Ctrl+C; cancellation disabled");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Process `documents`, stopping early when `shutdown` completes
    ///
    /// On shutdown no further documents start and in-flight documents are aborted;
    /// both are reported as [`FailureKind::Cancelled`].
    pub async fn run_until<F>(&self, documents: Vec<PathBuf>, shutdown: F) -> BatchReport
    where
        F: Future<Output = ()>,
    {
        let run_id = RunId::new();
        let span = info_span!("batch", run_id = %run_id);
        self.run_inner(run_id, documents, shutdown).instrument(span).await
    }

    async fn run_inner<F>(&self, run_id: RunId, documents: Vec<PathBuf>, shutdown: F) -> BatchReport
    where
        F: Future<Output = ()>,
    {
        let start = Instant::now();
        info!(
            "Processing {} document(s), concurrency {}",
            documents.len(),
            self.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        for (index, document) in documents.iter().cloned().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let extractor = Arc::clone(&self.extractor);
            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => extractor.extract(&document).await,
                    Err(_) => Err(ExtractorError::Cancelled),
                };
                (index, result)
            });
        }

        let mut results: Vec<Option<Result<ExtractionResult, DocumentFailure>>> =
            (0..documents.len()).map(|_| None).collect();
        let mut cancelled = false;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok((index, result))) => {
                        let document = &documents[index];
                        match &result {
                            Ok(r) => info!("Extracted {} -> {}", document.display(), r.output_path.display()),
                            Err(e) => error!("Failed {} [{}]: {}", document.display(), e.kind(), e),
                        }
                        results[index] = Some(result.map_err(|e| DocumentFailure::from(&e)));
                    }
                    Some(Err(e)) if e.is_cancelled() => {}
                    Some(Err(e)) => error!("Document task failed: {}", e),
                },
                _ = &mut shutdown, if !cancelled => {
                    warn!("Cancellation requested; aborting {} pending document(s)", tasks.len());
                    cancelled = true;
                    semaphore.close();
                    tasks.abort_all();
                }
            }
        }

        let outcomes = documents
            .into_iter()
            .zip(results)
            .map(|(document, result)| {
                let result = result.unwrap_or_else(|| {
                    let error = if cancelled {
                        ExtractorError::Cancelled
                    } else {
                        ExtractorError::Internal("document task did not complete".to_string())
                    };
                    Err(DocumentFailure::from(&error))
                });
                DocumentOutcome { document, result }
            })
            .collect();

        let report = BatchReport {
            run_id,
            outcomes,
            cancelled,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            "Batch finished: {} succeeded, {} failed{}",
            report.success_count(),
            report.failure_count(),
            if cancelled { " (cancelled)" } else { "" }
        );
        report
    }
}
