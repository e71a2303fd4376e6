//! Scrivener Schema
//!
//! Compiles declarative field schemas into an executable type model, renders that
//! model as format instructions for an LLM, and validates structured output against
//! it.
//!
//! # Overview
//!
//! ```text
//! schema JSON → compile → TypeModel ─┬→ render → format instructions (prompt)
//!                                    └→ Validator → Record (validated instance)
//! ```
//!
//! Both the instructions and the validator read the same [`TypeModel`], so the shape
//! the LLM is asked for and the shape that is accepted cannot drift apart.
//!
//! # Example Usage
//!
//! ```
//! use scrivener_schema::{compile_str, render, Validator};
//!
//! let model = compile_str(r#"{
//!     "Party": {"name": {"type": "string", "description": "Name of the party"}},
//!     "NDA": {"parties": {"type": "List[Party]", "description": "All parties"}}
//! }"#).unwrap();
//!
//! let instructions = render(&model);
//! assert!(instructions.contains("zero or more occurrences of a `Party` object"));
//!
//! let response: serde_json::Value =
//!     serde_json::from_str(r#"{"parties": [{"name": "Acme Corp"}]}"#).unwrap();
//! let record = Validator::new(&model).validate(&response).unwrap();
//! assert_eq!(record.type_name(), "NDA");
//! ```
//!
//! [`TypeModel`]: scrivener_domain::TypeModel

#![warn(missing_docs)]

mod compiler;
mod document;
mod error;
mod instance;
mod instructions;
mod validate;

pub use compiler::{compile, compile_str};
pub use document::{RawField, RawRecord, SchemaDocument};
pub use error::SchemaError;
pub use instance::{Record, Value};
pub use instructions::render;
pub use validate::{UnknownFieldPolicy, ValidationError, ValidationErrorKind, Validator};
