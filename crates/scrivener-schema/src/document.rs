//! Raw schema documents as written on disk
//!
//! A schema document is a JSON object mapping record names to record bodies. A body
//! is either flat (`{"field": {"type": ..., "description": ...}}`) or wrapped
//! (`{"description": ..., "fields": {...}}`). An optional top-level `"$root"` key
//! names the entry record; otherwise the last declared record is the root.
//!
//! JSON objects are decoded as ordered entry lists so that declaration order survives
//! and repeated names reach the compiler instead of silently overwriting each other.

use crate::error::SchemaError;
use serde::de::{self, value::MapAccessDeserializer, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;
use std::marker::PhantomData;

/// Top-level key naming the root record
pub const ROOT_KEY: &str = "$root";

/// Body key holding the field map in the wrapped record form
const FIELDS_KEY: &str = "fields";

/// Body key holding the record description in the wrapped record form
const DESCRIPTION_KEY: &str = "description";

/// A field definition before its type string is resolved
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawField {
    /// Type string, e.g. `string` or `List[Party]`
    #[serde(rename = "type")]
    pub type_string: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,
}

/// A record definition before resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Record name
    pub name: String,

    /// Optional record description (wrapped form only)
    pub description: Option<String>,

    /// Fields in declaration order; repeated names are kept
    pub fields: Vec<(String, RawField)>,
}

/// A parsed but unresolved schema document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaDocument {
    /// Explicit root record name, if the document sets `$root`
    pub root: Option<String>,

    /// Records in declaration order; repeated names are kept
    pub records: Vec<RawRecord>,
}

impl SchemaDocument {
    /// Parse a schema document from JSON text
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let top: Entries<TextOr<TextOr<serde_json::Value>>> = serde_json::from_str(json)?;

        let mut document = SchemaDocument::default();
        for (key, value) in top.0 {
            match (key.as_str(), value) {
                (ROOT_KEY, TextOr::Text(root)) => document.root = Some(root),
                (ROOT_KEY, TextOr::Object(_)) => {
                    return Err(SchemaError::Malformed(format!(
                        "'{}' must be a record type name",
                        ROOT_KEY
                    )));
                }
                (_, TextOr::Text(_)) => {
                    return Err(SchemaError::Malformed(format!(
                        "record '{}' must be an object",
                        key
                    )));
                }
                (_, TextOr::Object(body)) => document.records.push(parse_record(key, body)?),
            }
        }

        Ok(document)
    }
}

/// Interpret a record body in either the flat or the wrapped form
fn parse_record(
    name: String,
    body: Entries<TextOr<serde_json::Value>>,
) -> Result<RawRecord, SchemaError> {
    if is_wrapped(&body) {
        let mut description = None;
        let mut fields = Vec::new();
        for (key, value) in body.0 {
            match value {
                TextOr::Text(text) => description = Some(text),
                TextOr::Object(entries) => {
                    debug_assert_eq!(key, FIELDS_KEY);
                    for (field, definition) in entries.0 {
                        let raw = parse_field(&name, &field, definition)?;
                        fields.push((field, raw));
                    }
                }
            }
        }
        return Ok(RawRecord { name, description, fields });
    }

    let mut fields = Vec::with_capacity(body.0.len());
    for (field, value) in body.0 {
        let definition = match value {
            TextOr::Object(entries) => serde_json::Value::Object(entries.0.into_iter().collect()),
            TextOr::Text(_) => {
                return Err(SchemaError::Malformed(format!(
                    "field '{}.{}' must be an object with a 'type'",
                    name, field
                )));
            }
        };
        let raw = parse_field(&name, &field, definition)?;
        fields.push((field, raw));
    }

    Ok(RawRecord {
        name,
        description: None,
        fields,
    })
}

/// Whether a body uses the `{"description"?, "fields": {...}}` form
///
/// A flat record whose only field is named `fields` is told apart by its value: a
/// field definition holds strings, a wrapped field map holds objects.
fn is_wrapped(body: &Entries<TextOr<serde_json::Value>>) -> bool {
    let mut has_fields = false;
    for (key, value) in &body.0 {
        match (key.as_str(), value) {
            (FIELDS_KEY, TextOr::Object(entries)) => {
                if !entries.0.iter().all(|(_, v)| v.is_object()) {
                    return false;
                }
                has_fields = true;
            }
            (DESCRIPTION_KEY, TextOr::Text(_)) => {}
            _ => return false,
        }
    }
    has_fields
}

fn parse_field(
    record: &str,
    field: &str,
    definition: serde_json::Value,
) -> Result<RawField, SchemaError> {
    serde_json::from_value(definition).map_err(|e| {
        SchemaError::Malformed(format!("field '{}.{}': {}", record, field, e))
    })
}

/// JSON object entries in document order, repeated keys kept
#[derive(Debug, Clone, PartialEq)]
struct Entries<T>(Vec<(String, T)>);

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Entries<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
            type Value = Entries<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, T>()? {
                    entries.push((key, value));
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

/// Either a bare string or an ordered object
#[derive(Debug, Clone, PartialEq)]
enum TextOr<T> {
    Text(String),
    Object(Entries<T>),
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for TextOr<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TextOrVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for TextOrVisitor<T> {
            type Value = TextOr<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string or a JSON object")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(TextOr::Text(v.to_owned()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(TextOr::Text(v))
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
                Entries::deserialize(MapAccessDeserializer::new(map)).map(TextOr::Object)
            }
        }

        deserializer.deserialize_any(TextOrVisitor(PhantomData))
    }
}
