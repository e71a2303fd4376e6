//! Two-pass schema compiler
//!
//! Pass 1 declares every record name so that forward and mutually recursive
//! references can bind. Pass 2 walks each record's fields in declaration order and
//! resolves their type strings against the declared names.
//!
//! Type grammar:
//!
//! ```text
//! type := primitive | "List[" type "]" | record-name
//! primitive := "string" | "integer" | "float" | "boolean" | "timestamp"
//! ```

use crate::document::SchemaDocument;
use crate::error::SchemaError;
use scrivener_domain::{FieldSchema, PrimitiveKind, RecordTypeDef, TypeModel, TypeRef};
use std::collections::HashSet;
use tracing::debug;

/// Name reserved for the list constructor
const LIST_KEYWORD: &str = "List";

/// Parse and compile a schema document from JSON text
pub fn compile_str(json: &str) -> Result<TypeModel, SchemaError> {
    let document = SchemaDocument::from_json(json)?;
    compile(&document)
}

/// Compile a parsed schema document into a type model
///
/// # Errors
///
/// Returns [`SchemaError`] when a record or field name collides, a record name is not
/// a usable identifier, a type string is malformed, or a type string names a record
/// the document does not declare.
pub fn compile(document: &SchemaDocument) -> Result<TypeModel, SchemaError> {
    if document.records.is_empty() {
        return Err(SchemaError::Empty);
    }

    // Pass 1: declare every record name
    let mut declared: HashSet<&str> = HashSet::with_capacity(document.records.len());
    for record in &document.records {
        check_record_name(&record.name)?;
        if !declared.insert(record.name.as_str()) {
            return Err(SchemaError::DuplicateRecord(record.name.clone()));
        }
    }

    // Pass 2: bind field types
    let mut records = Vec::with_capacity(document.records.len());
    for raw in &document.records {
        let mut record = RecordTypeDef::new(raw.name.clone());
        record.description = raw.description.clone();

        let mut seen: HashSet<&str> = HashSet::with_capacity(raw.fields.len());
        for (name, field) in &raw.fields {
            if name.trim().is_empty() {
                return Err(SchemaError::EmptyFieldName {
                    record: raw.name.clone(),
                });
            }
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    record: raw.name.clone(),
                    field: name.clone(),
                });
            }

            let ty = parse_type(&field.type_string, &declared).map_err(|e| match e {
                TypeError::Undeclared(target) => SchemaError::UndeclaredType {
                    record: raw.name.clone(),
                    field: name.clone(),
                    name: target,
                },
                TypeError::Invalid(reason) => SchemaError::InvalidType {
                    record: raw.name.clone(),
                    field: name.clone(),
                    type_string: field.type_string.clone(),
                    reason,
                },
            })?;

            record.fields.push(FieldSchema {
                name: name.clone(),
                ty,
                description: field.description.clone(),
            });
        }

        records.push(record);
    }

    let root = match &document.root {
        Some(root) if declared.contains(root.as_str()) => root.clone(),
        Some(root) => return Err(SchemaError::UnknownRoot(root.clone())),
        None => records[records.len() - 1].name.clone(),
    };

    debug!(
        "Compiled schema: {} record types, root '{}'",
        records.len(),
        root
    );

    TypeModel::new(records, &root).map_err(SchemaError::Model)
}

/// Reasons a type string fails to resolve
#[derive(Debug, Clone, PartialEq, Eq)]
enum TypeError {
    /// Well-formed identifier with no matching record
    Undeclared(String),
    /// Not a primitive, list or identifier
    Invalid(String),
}

/// Parse a type string against the set of declared record names
///
/// List wrappers are peeled iteratively, so nesting depth is limited only by the
/// length of the string.
fn parse_type(type_string: &str, declared: &HashSet<&str>) -> Result<TypeRef, TypeError> {
    let mut rest = type_string.trim();
    let mut depth = 0usize;

    while let Some(inner) = strip_list(rest)? {
        rest = inner.trim();
        depth += 1;
    }

    let mut ty = parse_base(rest, declared)?;
    for _ in 0..depth {
        ty = TypeRef::list_of(ty);
    }
    Ok(ty)
}

/// If `s` is `List[...]`, return the text between the brackets
fn strip_list(s: &str) -> Result<Option<&str>, TypeError> {
    let Some(after_keyword) = s.strip_prefix(LIST_KEYWORD) else {
        return Ok(None);
    };
    let after_keyword = after_keyword.trim_start();
    let Some(open) = after_keyword.strip_prefix('[') else {
        // An identifier that merely starts with "List", such as "ListItem"
        if after_keyword.is_empty() {
            return Err(TypeError::Invalid(
                "List requires an element type, e.g. List[string]".to_string(),
            ));
        }
        return Ok(None);
    };
    let inner = open
        .strip_suffix(']')
        .ok_or_else(|| TypeError::Invalid("unclosed 'List['".to_string()))?;
    if inner.trim().is_empty() {
        return Err(TypeError::Invalid("List element type is empty".to_string()));
    }
    Ok(Some(inner))
}

fn parse_base(s: &str, declared: &HashSet<&str>) -> Result<TypeRef, TypeError> {
    if s.is_empty() {
        return Err(TypeError::Invalid("type is empty".to_string()));
    }
    if let Some(kind) = PrimitiveKind::from_tag(s) {
        return Ok(TypeRef::Primitive(kind));
    }
    if !is_identifier(s) {
        return Err(TypeError::Invalid(format!(
            "'{}' is not a primitive ({}), a List[...] or a record type name",
            s,
            primitive_tags()
        )));
    }
    if declared.contains(s) {
        Ok(TypeRef::record(s))
    } else {
        Err(TypeError::Undeclared(s.to_string()))
    }
}

fn check_record_name(name: &str) -> Result<(), SchemaError> {
    let reason = if !is_identifier(name) {
        "must start with a letter or underscore and contain only letters, digits and underscores"
    } else if PrimitiveKind::from_tag(name).is_some() {
        "shadows a primitive type"
    } else if name == LIST_KEYWORD {
        "is reserved for lists"
    } else {
        return Ok(());
    };

    Err(SchemaError::InvalidRecordName {
        name: name.to_string(),
        reason: reason.to_string(),
    })
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn primitive_tags() -> String {
    PrimitiveKind::ALL
        .iter()
        .map(|k| k.tag())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const NDA_SCHEMA: &str = r#"{
        "Party": {"fields": {"name": {"type": "string", "description": "Name of the party"}}},
        "NDA": {"fields": {"parties": {"type": "List[Party]", "description": "All parties"}}}
    }"#;

    fn declared<'a>(names: &[&'a str]) -> HashSet<&'a str> {
        names.iter().copied().collect()
    }

    #[test]
    fn test_compile_nda_scenario() {
        let model = compile_str(NDA_SCHEMA).unwrap();

        let root = model.root();
        assert_eq!(root.name, "NDA");
        assert_eq!(root.fields.len(), 1);
        assert_eq!(root.fields[0].name, "parties");
        assert_eq!(root.fields[0].ty, TypeRef::list_of(TypeRef::record("Party")));
        assert_eq!(root.fields[0].description, "All parties");
    }

    #[test]
    fn test_root_fields_match_declaration() {
        let model = compile_str(
            r#"{"Term": {
                "start_date": {"type": "timestamp", "description": "Start"},
                "renewals": {"type": "integer", "description": "Renewal count"},
                "fee": {"type": "float", "description": "Fee"},
                "auto_renew": {"type": "boolean", "description": "Auto renews"},
                "notes": {"type": "List[string]", "description": "Notes"}
            }}"#,
        )
        .unwrap();

        let fields: Vec<_> = model
            .root()
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.ty.to_string(), f.description.as_str()))
            .collect();
        assert_eq!(
            fields,
            vec![
                ("start_date", "timestamp".to_string(), "Start"),
                ("renewals", "integer".to_string(), "Renewal count"),
                ("fee", "float".to_string(), "Fee"),
                ("auto_renew", "boolean".to_string(), "Auto renews"),
                ("notes", "List[string]".to_string(), "Notes"),
            ]
        );
    }

    #[test]
    fn test_forward_and_mutual_references() {
        let model = compile_str(
            r#"{
                "Person": {"employer": {"type": "Company", "description": ""}},
                "Company": {"staff": {"type": "List[Person]", "description": ""}}
            }"#,
        )
        .unwrap();
        assert_eq!(model.root().name, "Company");
        assert_eq!(
            model.record("Person").unwrap().fields[0].ty,
            TypeRef::record("Company")
        );
    }

    #[test]
    fn test_explicit_root() {
        let model = compile_str(
            r#"{"$root": "Party", "Party": {"name": {"type": "string"}}, "Other": {}}"#,
        )
        .unwrap();
        assert_eq!(model.root().name, "Party");
    }

    #[test]
    fn test_unknown_root() {
        let err = compile_str(r#"{"$root": "Missing", "Party": {}}"#).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownRoot(name) if name == "Missing"));
    }

    #[test]
    fn test_undeclared_reference_fails() {
        let err = compile_str(
            r#"{"NDA": {"parties": {"type": "List[Party]", "description": ""}}}"#,
        )
        .unwrap_err();
        match err {
            SchemaError::UndeclaredType { record, field, name } => {
                assert_eq!(record, "NDA");
                assert_eq!(field, "parties");
                assert_eq!(name, "Party");
            }
            other => panic!("Expected UndeclaredType, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_record_fails() {
        let err = compile_str(r#"{"A": {}, "A": {}}"#).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateRecord(name) if name == "A"));
    }

    #[test]
    fn test_duplicate_field_fails() {
        let err = compile_str(r#"{"A": {"x": {"type": "string"}, "x": {"type": "integer"}}}"#)
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField { .. }));
    }

    #[test]
    fn test_record_name_shadowing_primitive_fails() {
        let err = compile_str(r#"{"string": {}}"#).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidRecordName { .. }));

        let err = compile_str(r#"{"List": {}}"#).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidRecordName { .. }));

        let err = compile_str(r#"{"my record": {}}"#).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidRecordName { .. }));
    }

    #[test]
    fn test_empty_document_fails() {
        assert!(matches!(compile_str("{}"), Err(SchemaError::Empty)));
    }

    #[test]
    fn test_parse_nested_lists() {
        let ty = parse_type("List[List[Party]]", &declared(&["Party"])).unwrap();
        assert_eq!(
            ty,
            TypeRef::list_of(TypeRef::list_of(TypeRef::record("Party")))
        );
    }

    #[test]
    fn test_parse_tolerates_whitespace() {
        let ty = parse_type("  List[ string ] ", &declared(&[])).unwrap();
        assert_eq!(ty, TypeRef::list_of(TypeRef::Primitive(PrimitiveKind::String)));
    }

    #[test]
    fn test_identifier_starting_with_list() {
        let ty = parse_type("ListItem", &declared(&["ListItem"])).unwrap();
        assert_eq!(ty, TypeRef::record("ListItem"));
    }

    #[test]
    fn test_malformed_types() {
        let names = declared(&["Party"]);
        for bad in [
            "", "List", "List[", "List[]", "List[Party", "List[Party]]", "Dict[str, str]",
            "foo bar", "List[Party][0]",
        ] {
            assert!(
                matches!(parse_type(bad, &names), Err(TypeError::Invalid(_))),
                "expected '{}' to be invalid",
                bad
            );
        }
    }

    #[test]
    fn test_primitive_tags_are_case_sensitive() {
        let result = parse_type("String", &declared(&[]));
        assert_eq!(result, Err(TypeError::Undeclared("String".to_string())));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn type_ref() -> impl Strategy<Value = TypeRef> {
        let leaf = prop_oneof![
            proptest::sample::select(PrimitiveKind::ALL.to_vec()).prop_map(TypeRef::Primitive),
            proptest::sample::select(vec!["Party", "Clause", "ListEntry"]).prop_map(TypeRef::record),
        ];
        leaf.prop_recursive(6, 6, 1, |inner| inner.prop_map(TypeRef::list_of))
    }

    proptest! {
        /// Property: the printed form of any type parses back to the same type
        #[test]
        fn test_printed_types_parse_back(ty in type_ref()) {
            let names: HashSet<&str> = ["Party", "Clause", "ListEntry"].into_iter().collect();
            let parsed = parse_type(&ty.to_string(), &names);
            prop_assert_eq!(parsed, Ok(ty));
        }
    }
}
