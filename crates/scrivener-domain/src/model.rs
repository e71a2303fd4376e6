//! Type model for extraction schemas
//!
//! A schema document compiles into a [`TypeModel`]: a closed set of named record
//! types whose fields are typed with a [`TypeRef`]. A `TypeRef` is a tagged union of
//! a primitive, a list of another `TypeRef`, or a reference to a record by name.
//!
//! References are stored by name rather than by pointer, so self-referential and
//! mutually recursive records need no special representation. The model guarantees
//! that every name it holds resolves.

use std::collections::HashMap;
use std::fmt;

/// Primitive value kinds recognized in schema documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// UTF-8 text
    String,
    /// Signed 64-bit integer
    Integer,
    /// 64-bit floating point number
    Float,
    /// `true` or `false`
    Boolean,
    /// Point in time, carried as an RFC 3339 string on the wire
    Timestamp,
}

impl PrimitiveKind {
    /// Every primitive kind, in tag order
    pub const ALL: [PrimitiveKind; 5] = [
        PrimitiveKind::String,
        PrimitiveKind::Integer,
        PrimitiveKind::Float,
        PrimitiveKind::Boolean,
        PrimitiveKind::Timestamp,
    ];

    /// The tag used for this kind in schema documents
    pub fn tag(&self) -> &'static str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Integer => "integer",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Timestamp => "timestamp",
        }
    }

    /// Look up a primitive kind by its schema tag (case-sensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use scrivener_domain::PrimitiveKind;
    ///
    /// assert_eq!(PrimitiveKind::from_tag("integer"), Some(PrimitiveKind::Integer));
    /// assert_eq!(PrimitiveKind::from_tag("Integer"), None);
    /// ```
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// The type of a field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// A primitive value
    Primitive(PrimitiveKind),
    /// Zero or more values of the inner type
    List(Box<TypeRef>),
    /// An instance of the named record type
    Record(String),
}

impl TypeRef {
    /// Shorthand for `TypeRef::List(Box::new(inner))`
    pub fn list_of(inner: TypeRef) -> Self {
        TypeRef::List(Box::new(inner))
    }

    /// Shorthand for `TypeRef::Record(name.into())`
    pub fn record(name: impl Into<String>) -> Self {
        TypeRef::Record(name.into())
    }

    /// The record name this type ultimately refers to, looking through lists
    pub fn referenced_record(&self) -> Option<&str> {
        match self {
            TypeRef::Primitive(_) => None,
            TypeRef::List(inner) => inner.referenced_record(),
            TypeRef::Record(name) => Some(name),
        }
    }
}

impl fmt::Display for TypeRef {
    /// Formats the type using the schema document grammar
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Primitive(kind) => write!(f, "{}", kind),
            TypeRef::List(inner) => write!(f, "List[{}]", inner),
            TypeRef::Record(name) => f.write_str(name),
        }
    }
}

/// A typed, described field of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    /// Field name, unique within its record
    pub name: String,

    /// Field type
    pub ty: TypeRef,

    /// Human-readable description, forwarded to the LLM
    pub description: String,
}

/// A named record type with fields in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTypeDef {
    /// Record name, unique within its model
    pub name: String,

    /// Optional description of the record as a whole
    pub description: Option<String>,

    /// Fields in declaration order
    pub fields: Vec<FieldSchema>,
}

impl RecordTypeDef {
    /// Create a record type with no fields
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: Vec::new(),
        }
    }

    /// Attach a record-level description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a field
    pub fn with_field(
        mut self,
        name: impl Into<String>,
        ty: TypeRef,
        description: impl Into<String>,
    ) -> Self {
        self.fields.push(FieldSchema {
            name: name.into(),
            ty,
            description: description.into(),
        });
        self
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// The resolved, reference-closed set of record types compiled from one schema document
///
/// A `TypeModel` is immutable once built. It is the single structural definition that
/// both the format instructions and the response validator read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeModel {
    records: Vec<RecordTypeDef>,
    index: HashMap<String, usize>,
    root: usize,
}

impl TypeModel {
    /// Build a model from record definitions and the name of the root record
    ///
    /// Fails if a record name repeats, a field name repeats within a record, a field
    /// refers to a record that is not part of `records`, or `root` is not declared.
    ///
    /// # Examples
    ///
    /// ```
    /// use scrivener_domain::{RecordTypeDef, TypeModel, TypeRef, PrimitiveKind};
    ///
    /// let party = RecordTypeDef::new("Party")
    ///     .with_field("name", TypeRef::Primitive(PrimitiveKind::String), "Party name");
    /// let nda = RecordTypeDef::new("NDA")
    ///     .with_field("parties", TypeRef::list_of(TypeRef::record("Party")), "All parties");
    ///
    /// let model = TypeModel::new(vec![party, nda], "NDA").unwrap();
    /// assert_eq!(model.root().name, "NDA");
    /// ```
    pub fn new(records: Vec<RecordTypeDef>, root: &str) -> Result<Self, String> {
        let mut index = HashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            if index.insert(record.name.clone(), position).is_some() {
                return Err(format!("duplicate record type '{}'", record.name));
            }
        }

        for record in &records {
            for (i, field) in record.fields.iter().enumerate() {
                if record.fields[..i].iter().any(|f| f.name == field.name) {
                    return Err(format!(
                        "duplicate field '{}' in record '{}'",
                        field.name, record.name
                    ));
                }
                if let Some(target) = field.ty.referenced_record() {
                    if !index.contains_key(target) {
                        return Err(format!(
                            "field '{}.{}' refers to undeclared record type '{}'",
                            record.name, field.name, target
                        ));
                    }
                }
            }
        }

        let root = *index
            .get(root)
            .ok_or_else(|| format!("root record type '{}' is not declared", root))?;

        Ok(Self { records, index, root })
    }

    /// The designated entry record type
    pub fn root(&self) -> &RecordTypeDef {
        &self.records[self.root]
    }

    /// Look up a record type by name
    pub fn record(&self, name: &str) -> Option<&RecordTypeDef> {
        self.index.get(name).map(|&i| &self.records[i])
    }

    /// All record types in declaration order
    pub fn records(&self) -> &[RecordTypeDef] {
        &self.records
    }

    /// Number of record types
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the model has no record types (never true for a built model)
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string() -> TypeRef {
        TypeRef::Primitive(PrimitiveKind::String)
    }

    #[test]
    fn test_primitive_tags_round_trip() {
        for kind in PrimitiveKind::ALL {
            assert_eq!(PrimitiveKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(PrimitiveKind::from_tag("str"), None);
    }

    #[test]
    fn test_type_ref_display_uses_schema_grammar() {
        let ty = TypeRef::list_of(TypeRef::list_of(TypeRef::record("Party")));
        assert_eq!(ty.to_string(), "List[List[Party]]");
        assert_eq!(TypeRef::Primitive(PrimitiveKind::Timestamp).to_string(), "timestamp");
    }

    #[test]
    fn test_referenced_record_looks_through_lists() {
        let ty = TypeRef::list_of(TypeRef::record("Clause"));
        assert_eq!(ty.referenced_record(), Some("Clause"));
        assert_eq!(TypeRef::list_of(string()).referenced_record(), None);
    }

    #[test]
    fn test_model_rejects_dangling_reference() {
        let nda = RecordTypeDef::new("NDA")
            .with_field("parties", TypeRef::list_of(TypeRef::record("Party")), "");
        let err = TypeModel::new(vec![nda], "NDA").unwrap_err();
        assert!(err.contains("Party"));
    }

    #[test]
    fn test_model_rejects_duplicate_field() {
        let party = RecordTypeDef::new("Party")
            .with_field("name", string(), "")
            .with_field("name", string(), "");
        assert!(TypeModel::new(vec![party], "Party").is_err());
    }

    #[test]
    fn test_model_rejects_unknown_root() {
        let party = RecordTypeDef::new("Party").with_field("name", string(), "");
        assert!(TypeModel::new(vec![party], "NDA").is_err());
    }

    #[test]
    fn test_self_reference_is_legal() {
        let clause = RecordTypeDef::new("Clause")
            .with_field("text", string(), "")
            .with_field("subclauses", TypeRef::list_of(TypeRef::record("Clause")), "");
        let model = TypeModel::new(vec![clause], "Clause").unwrap();
        assert_eq!(model.len(), 1);
        assert!(model.record("Clause").is_some());
    }

    #[test]
    fn test_records_keep_declaration_order() {
        let a = RecordTypeDef::new("A").with_field("b", TypeRef::record("B"), "");
        let b = RecordTypeDef::new("B").with_field("x", string(), "");
        let model = TypeModel::new(vec![a, b], "A").unwrap();
        let names: Vec<_> = model.records().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }
}
