//! Format instructions derived from a compiled type model
//!
//! The rendering is a self-contained description of the JSON object the LLM must
//! return: every field with its type and description, nested record shapes expanded
//! in place, and lists spelled out as "zero or more occurrences" of their element.
//! Each record shape is expanded once, at its first use; later uses and recursion
//! refer back to it by name, so the output stays linear in the size of the model.

use scrivener_domain::{PrimitiveKind, RecordTypeDef, TypeModel, TypeRef};
use std::collections::HashSet;
use std::fmt::Write;

/// Spaces per nesting level
const INDENT: usize = 4;

/// Render format instructions for the model's root record
///
/// # Examples
///
/// ```
/// use scrivener_schema::{compile_str, render};
///
/// let model = compile_str(r#"{"Party": {"name": {"type": "string", "description": "Legal name"}}}"#).unwrap();
/// let text = render(&model);
/// assert!(text.contains(r#""name" (string): Legal name"#));
/// ```
pub fn render(model: &TypeModel) -> String {
    let root = model.root();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "The output must be a single JSON object describing a `{}`, shaped exactly as below.",
        root.name
    );
    out.push_str("Return only the JSON object, without Markdown code fences or commentary.\n");
    out.push_str("Every listed field is required and `null` is never accepted; ");
    out.push_str("use an empty string or empty array when the document says nothing.\n");
    out.push_str("Do not add fields that are not listed.\n");
    out.push_str(
        "Timestamps are RFC 3339 strings, for example \"2024-01-31T00:00:00Z\".\n\n",
    );

    let mut walk = Walk {
        stack: vec![root.name.as_str()],
        expanded: HashSet::from([root.name.as_str()]),
    };
    render_record(model, root, 0, &mut walk, &mut out);
    out
}

/// Where the shape of a referenced record is spelled out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    /// Expanded right after the field
    Below,
    /// An enclosing record, currently being expanded
    Enclosing,
    /// Expanded earlier in the output
    Above,
}

/// Records on the current path and records already expanded
struct Walk<'m> {
    stack: Vec<&'m str>,
    expanded: HashSet<&'m str>,
}

impl Walk<'_> {
    fn shape_of(&self, name: &str) -> Shape {
        if self.stack.contains(&name) {
            Shape::Enclosing
        } else if self.expanded.contains(name) {
            Shape::Above
        } else {
            Shape::Below
        }
    }
}

fn render_record<'m>(
    model: &'m TypeModel,
    record: &'m RecordTypeDef,
    depth: usize,
    walk: &mut Walk<'m>,
    out: &mut String,
) {
    let pad = " ".repeat(depth * INDENT);
    match &record.description {
        Some(description) if !description.is_empty() => {
            let _ = writeln!(out, "{}`{}` object ({}):", pad, record.name, description);
        }
        _ => {
            let _ = writeln!(out, "{}`{}` object:", pad, record.name);
        }
    }

    if record.fields.is_empty() {
        let _ = writeln!(out, "{}  (no fields; use {{}})", pad);
        return;
    }

    for field in &record.fields {
        let target = field.ty.referenced_record();
        let shape = target.map_or(Shape::Below, |name| walk.shape_of(name));

        let _ = write!(
            out,
            "{}  - \"{}\" ({})",
            pad,
            field.name,
            describe(&field.ty, shape)
        );
        if field.description.is_empty() {
            out.push('\n');
        } else {
            let _ = writeln!(out, ": {}", field.description);
        }

        if shape != Shape::Below {
            continue;
        }
        if let Some(nested) = target.and_then(|name| model.record(name)) {
            walk.expanded.insert(nested.name.as_str());
            walk.stack.push(nested.name.as_str());
            render_record(model, nested, depth + 1, walk, out);
            walk.stack.pop();
        }
    }
}

/// Describe a field type in words
fn describe(ty: &TypeRef, shape: Shape) -> String {
    match ty {
        TypeRef::Primitive(kind) => primitive_phrase(*kind).to_string(),
        TypeRef::List(inner) => format!(
            "JSON array of zero or more occurrences of {}",
            with_article(inner, shape)
        ),
        TypeRef::Record(name) => match shape {
            Shape::Below => format!("a `{}` object, shape below", name),
            Shape::Enclosing => format!(
                "a `{}` object, same shape as the enclosing `{}` described above",
                name, name
            ),
            Shape::Above => format!("a `{}` object, shape described above", name),
        },
    }
}

fn with_article(ty: &TypeRef, shape: Shape) -> String {
    match ty {
        TypeRef::List(_) => format!("a {}", describe(ty, shape)),
        _ => describe(ty, shape),
    }
}

fn primitive_phrase(kind: PrimitiveKind) -> &'static str {
    match kind {
        PrimitiveKind::String => "string",
        PrimitiveKind::Integer => "integer",
        PrimitiveKind::Float => "number",
        PrimitiveKind::Boolean => "boolean, true or false",
        PrimitiveKind::Timestamp => "timestamp, RFC 3339 string",
    }
}
