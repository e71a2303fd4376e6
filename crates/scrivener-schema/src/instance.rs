//! Validated structured instances

use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// A value that has been checked against a field type
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `string` field
    String(String),
    /// `integer` field
    Integer(i64),
    /// `float` field
    Float(f64),
    /// `boolean` field
    Boolean(bool),
    /// `timestamp` field
    Timestamp(DateTime<FixedOffset>),
    /// `List[...]` field
    List(Vec<Value>),
    /// Record-typed field
    Record(Record),
}

/// An instance of a record type, fields in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    type_name: String,
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Create an empty instance of the named record type
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field value
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.push(name, value);
        self
    }

    /// Append a field value in place
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.fields.push((name.into(), value));
    }

    /// Name of the record type this instance belongs to
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Look up a field value by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Iterate over `(name, value)` pairs in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Serialize as pretty-printed JSON with fields in declaration order
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Timestamp(ts) => {
                serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Record(record) => record.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_keeps_declaration_order() {
        let record = Record::new("Party")
            .with("name", Value::String("Acme Corp".to_string()))
            .with("address", Value::String("1 Main St".to_string()))
            .with("active", Value::Boolean(true));

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"name":"Acme Corp","address":"1 Main St","active":true}"#
        );
    }

    #[test]
    fn test_timestamp_serializes_as_rfc3339() {
        let ts = DateTime::parse_from_rfc3339("2024-01-31T00:00:00+00:00").unwrap();
        let record = Record::new("Term").with("start", Value::Timestamp(ts));
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"start":"2024-01-31T00:00:00Z"}"#);
    }

    #[test]
    fn test_nested_records_and_lists() {
        let party = Record::new("Party").with("name", Value::String("Acme".to_string()));
        let nda = Record::new("NDA").with("parties", Value::List(vec![Value::Record(party)]));

        let json = serde_json::to_string(&nda).unwrap();
        assert_eq!(json, r#"{"parties":[{"name":"Acme"}]}"#);
        assert!(matches!(nda.get("parties"), Some(Value::List(items)) if items.len() == 1));
        assert_eq!(nda.type_name(), "NDA");
    }
}
