//! Error types for schema compilation

use thiserror::Error;

/// Errors that make a schema document unusable
///
/// Every variant is fatal for a run: no document is processed against a schema that
/// failed to compile.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The document is not valid JSON
    #[error("Schema document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON does not have the shape of a schema document
    #[error("Malformed schema document: {0}")]
    Malformed(String),

    /// The document declares no record types
    #[error("Schema document declares no record types")]
    Empty,

    /// Two records share a name
    #[error("Record type '{0}' is declared more than once")]
    DuplicateRecord(String),

    /// A record name cannot be used as a type reference
    #[error("Invalid record type name '{name}': {reason}")]
    InvalidRecordName {
        /// Offending name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Two fields of one record share a name
    #[error("Field '{field}' is declared more than once in record '{record}'")]
    DuplicateField {
        /// Record containing the collision
        record: String,
        /// Repeated field name
        field: String,
    },

    /// A field name is empty or blank
    #[error("Record '{record}' has a field with an empty name")]
    EmptyFieldName {
        /// Record containing the field
        record: String,
    },

    /// A field refers to a record type the document does not declare
    #[error("Field '{record}.{field}' refers to undeclared record type '{name}'")]
    UndeclaredType {
        /// Record containing the field
        record: String,
        /// Field name
        field: String,
        /// Unresolved type name
        name: String,
    },

    /// A field's type string is not a primitive, a list or an identifier
    #[error("Field '{record}.{field}' has invalid type '{type_string}': {reason}")]
    InvalidType {
        /// Record containing the field
        record: String,
        /// Field name
        field: String,
        /// Type string as written
        type_string: String,
        /// Why it could not be parsed
        reason: String,
    },

    /// The `$root` key names a record that is not declared
    #[error("Root record type '{0}' is not declared")]
    UnknownRoot(String),

    /// The resolved model failed its closure check
    #[error("Type model error: {0}")]
    Model(String),
}
