//! Scrivener Domain Layer
//!
//! This crate contains the core vocabulary shared by every other Scrivener crate.
//! It keeps its dependency list to a single primitive (UUIDv7 run identifiers) and
//! defines the value objects and trait interfaces that the infrastructure crates
//! implement.
//!
//! ## Key Concepts
//!
//! - **Type model**: the closed, resolved set of record types a schema document compiles to
//! - **Fingerprint**: collision-resistant digest of a document's full byte content
//! - **Chat messages**: role-tagged prompt parts handed to an LLM provider
//! - **Collaborators**: LLM inference, document-to-text conversion and the text cache
//!
//! ## Architecture
//!
//! - Pure data and trait definitions only
//! - Infrastructure implementations live in other crates
//!   (`scrivener-llm`, `scrivener-ocr`, `scrivener-store`)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod fingerprint;
pub mod message;
pub mod model;
pub mod run;
pub mod traits;

// Re-exports for convenience
pub use cancel::{CancelFlag, CancelGuard};
pub use fingerprint::Fingerprint;
pub use message::{ChatMessage, Role};
pub use model::{FieldSchema, PrimitiveKind, RecordTypeDef, TypeModel, TypeRef};
pub use run::RunId;
