//! Scrivener Extractor
//!
//! Turns scanned documents into validated structured records using an LLM
//! constrained by a compiled schema.
//!
//! # Overview
//!
//! Each document goes through the same pipeline:
//!
//! ```text
//! document → fingerprint → cache ─(miss)→ OCR → cache
//!                            │
//!                          text → prompt (format instructions + text) → LLM
//!                                                                        │
//!                         <document>.json ← validate against TypeModel ←─┘
//! ```
//!
//! # Key Features
//!
//! - **Content cache**: OCR runs at most once per distinct document content
//! - **Strict validation**: the LLM is an untrusted producer; nothing is defaulted
//! - **Atomic artifacts**: a failed document never leaves a partial output file
//! - **Batch processing**: bounded concurrency, per-document isolation, Ctrl+C
//!   cancellation
//!
//! # Example Usage
//!
//! ```no_run
//! use scrivener_extractor::{BatchRunner, Extractor, ExtractorConfig, SchemaCatalog};
//! use scrivener_llm::MockProvider;
//! use scrivener_ocr::MockExtractor;
//! use scrivener_store::FileCache;
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let profile = SchemaCatalog::new("schemas").load("nda")?;
//! let extractor = Extractor::new(
//!     MockProvider::new(r#"{"parties": []}"#),
//!     MockExtractor::new("MUTUAL NON-DISCLOSURE AGREEMENT ..."),
//!     FileCache::open_or_disabled("/tmp/scrivener-cache"),
//!     profile.model,
//!     &profile.prompt,
//!     ExtractorConfig::default(),
//! )?;
//!
//! let report = BatchRunner::new(extractor)
//!     .run(vec![PathBuf::from("acme-nda.pdf")])
//!     .await;
//! println!("{} succeeded, {} failed", report.success_count(), report.failure_count());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod batch;
mod catalog;
mod config;
mod error;
mod extractor;
mod parser;
mod prompt;
mod types;


pub use batch::{BatchReport, BatchRunner, DocumentFailure, DocumentOutcome};
pub use catalog::{ExtractionProfile, SchemaCatalog, PROMPT_SUFFIX, SCHEMA_SUFFIX};
pub use config::ExtractorConfig;
pub use error::{ExtractorError, FailureKind};
pub use extractor::Extractor;
pub use parser::{extract_json_object, parse_response};
pub use prompt::{PromptBuilder, PromptConfig, DOCUMENT_TEXT, FORMAT_INSTRUCTIONS};
pub use types::{ExtractionMetadata, ExtractionResult};
