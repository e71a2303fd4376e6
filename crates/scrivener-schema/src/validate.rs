//! Validation of structured output against a compiled type model
//!
//! The LLM is treated as an untrusted producer: every declared field must be present
//! and non-null, and every value must have the declared type. Nothing is defaulted.

use crate::instance::{Record, Value};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use scrivener_domain::{PrimitiveKind, RecordTypeDef, TypeModel, TypeRef};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use thiserror::Error;
use tracing::warn;

/// What to do with object keys the record type does not declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownFieldPolicy {
    /// Fail validation on the first undeclared key
    #[default]
    Reject,
    /// Drop undeclared keys, logging each at `warn`
    Ignore,
}

/// A value that does not conform to the type model
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{path}: {kind}")]
pub struct ValidationError {
    /// Location of the offending value, e.g. `$.parties[0].name`
    pub path: String,

    /// What was wrong
    pub kind: ValidationErrorKind,
}

/// Ways a value can fail validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationErrorKind {
    /// A declared field is absent
    #[error("missing required field")]
    MissingField,

    /// A declared field is `null`
    #[error("null is not accepted for {expected}")]
    Null {
        /// Declared type
        expected: String,
    },

    /// The JSON value has the wrong kind
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        /// Declared type
        expected: String,
        /// JSON kind that was found
        found: String,
    },

    /// An integer does not fit in 64 bits or has a fractional part
    #[error("'{value}' is not a 64-bit integer")]
    InvalidInteger {
        /// Number as written
        value: String,
    },

    /// A timestamp string could not be parsed
    #[error("'{value}' is not an RFC 3339 timestamp or YYYY-MM-DD date")]
    InvalidTimestamp {
        /// String as written
        value: String,
    },

    /// A key not declared by the record type (under [`UnknownFieldPolicy::Reject`])
    #[error("field is not declared by record type '{record}'")]
    UnknownField {
        /// Record type being validated
        record: String,
    },
}

/// Validates JSON values against a type model
#[derive(Debug, Clone, Copy)]
pub struct Validator<'m> {
    model: &'m TypeModel,
    policy: UnknownFieldPolicy,
}

impl<'m> Validator<'m> {
    /// Create a validator that rejects unknown fields
    pub fn new(model: &'m TypeModel) -> Self {
        Self {
            model,
            policy: UnknownFieldPolicy::default(),
        }
    }

    /// Choose the unknown-field policy
    pub fn with_policy(mut self, policy: UnknownFieldPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Validate `json` as an instance of the model's root record type
    pub fn validate(&self, json: &Json) -> Result<Record, ValidationError> {
        self.validate_record(self.model.root(), json, "$")
    }

    fn validate_record(
        &self,
        record: &RecordTypeDef,
        json: &Json,
        path: &str,
    ) -> Result<Record, ValidationError> {
        let object = match json {
            Json::Object(object) => object,
            Json::Null => {
                return Err(error(
                    path,
                    ValidationErrorKind::Null {
                        expected: format!("`{}` object", record.name),
                    },
                ));
            }
            other => {
                return Err(error(
                    path,
                    ValidationErrorKind::TypeMismatch {
                        expected: format!("`{}` object", record.name),
                        found: json_kind(other).to_string(),
                    },
                ));
            }
        };

        for key in object.keys() {
            if record.field(key).is_some() {
                continue;
            }
            let key_path = format!("{}.{}", path, key);
            match self.policy {
                UnknownFieldPolicy::Reject => {
                    return Err(error(
                        &key_path,
                        ValidationErrorKind::UnknownField {
                            record: record.name.clone(),
                        },
                    ));
                }
                UnknownFieldPolicy::Ignore => {
                    warn!("Ignoring undeclared field {}", key_path);
                }
            }
        }

        let mut instance = Record::new(record.name.clone());
        for field in &record.fields {
            let field_path = format!("{}.{}", path, field.name);
            let value = object
                .get(&field.name)
                .ok_or_else(|| error(&field_path, ValidationErrorKind::MissingField))?;
            instance.push(field.name.clone(), self.validate_value(&field.ty, value, &field_path)?);
        }

        Ok(instance)
    }

    fn validate_value(&self, ty: &TypeRef, json: &Json, path: &str) -> Result<Value, ValidationError> {
        if json.is_null() {
            return Err(error(
                path,
                ValidationErrorKind::Null {
                    expected: ty.to_string(),
                },
            ));
        }

        match ty {
            TypeRef::Primitive(kind) => validate_primitive(*kind, json, path),
            TypeRef::List(inner) => {
                let items = json.as_array().ok_or_else(|| mismatch(ty, json, path))?;
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.validate_value(inner, item, &format!("{}[{}]", path, i)))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::List)
            }
            TypeRef::Record(name) => {
                // Every reference resolves in a built model
                let record = self.model.record(name).ok_or_else(|| mismatch(ty, json, path))?;
                self.validate_record(record, json, path).map(Value::Record)
            }
        }
    }
}

fn validate_primitive(kind: PrimitiveKind, json: &Json, path: &str) -> Result<Value, ValidationError> {
    let ty = TypeRef::Primitive(kind);
    match (kind, json) {
        (PrimitiveKind::String, Json::String(s)) => Ok(Value::String(s.clone())),
        (PrimitiveKind::Boolean, Json::Bool(b)) => Ok(Value::Boolean(*b)),
        (PrimitiveKind::Float, Json::Number(n)) => n
            .as_f64()
            .map(Value::Float)
            .ok_or_else(|| mismatch(&ty, json, path)),
        (PrimitiveKind::Integer, Json::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return Ok(Value::Integer(i));
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                    Ok(Value::Integer(f as i64))
                }
                _ => Err(error(
                    path,
                    ValidationErrorKind::InvalidInteger {
                        value: n.to_string(),
                    },
                )),
            }
        }
        (PrimitiveKind::Timestamp, Json::String(s)) => parse_timestamp(s)
            .map(Value::Timestamp)
            .ok_or_else(|| {
                error(
                    path,
                    ValidationErrorKind::InvalidTimestamp { value: s.clone() },
                )
            }),
        _ => Err(mismatch(&ty, json, path)),
    }
}

/// Parse RFC 3339, a zone-less date-time (UTC assumed) or a bare date (midnight UTC)
fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts);
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

fn mismatch(ty: &TypeRef, json: &Json, path: &str) -> ValidationError {
    error(
        path,
        ValidationErrorKind::TypeMismatch {
            expected: ty.to_string(),
            found: json_kind(json).to_string(),
        },
    )
}

fn error(path: &str, kind: ValidationErrorKind) -> ValidationError {
    ValidationError {
        path: path.to_string(),
        kind,
    }
}
