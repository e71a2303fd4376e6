//! Parse LLM output into a validated record

use scrivener_schema::{Record, UnknownFieldPolicy, Validator};
use scrivener_domain::TypeModel;

/// Locate the JSON object in an LLM reply
///
/// LLMs sometimes wrap JSON in Markdown code blocks or add a sentence before or after
/// it. The outermost `{ ... }` span is returned; `None` if the reply has no object.
pub fn extract_json_object(response: &str) -> Option<&str> {
    let body = strip_code_fence(response.trim());
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (start < end).then(|| &body[start..=end])
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (```json) up to the end of the opening line
    let rest = rest.find('\n').map_or("", |i| &rest[i + 1..]);
    match rest.rfind("```") {
        Some(i) => &rest[..i],
        None => rest,
    }
}

/// Parse and validate a raw LLM reply against the model's root record
///
/// The error is a human-readable reason; the caller attaches the raw reply.
pub fn parse_response(
    response: &str,
    model: &TypeModel,
    policy: UnknownFieldPolicy,
) -> Result<Record, String> {
    let json = extract_json_object(response)
        .ok_or_else(|| "response contains no JSON object".to_string())?;

    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| format!("invalid JSON: {}", e))?;

    Validator::new(model)
        .with_policy(policy)
        .validate(&value)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrivener_schema::{compile_str, Value};

    fn model() -> TypeModel {
        compile_str(
            r#"{
                "Party": {"fields": {"name": {"type": "string", "description": "Name"}}},
                "NDA": {"fields": {"parties": {"type": "List[Party]", "description": "Parties"}}}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_plain_object() {
        assert_eq!(extract_json_object(" {\"a\": 1} "), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_fenced_object() {
        let response = "```json\n{\"parties\": []}\n```";
        assert_eq!(extract_json_object(response), Some("{\"parties\": []}"));

        let response = "```\n{\"parties\": []}\n```";
        assert_eq!(extract_json_object(response), Some("{\"parties\": []}"));
    }

    #[test]
    fn test_object_surrounded_by_prose() {
        let response = "Here is the extraction:\n{\"a\": {\"b\": 2}}\nLet me know if you need more.";
        assert_eq!(extract_json_object(response), Some("{\"a\": {\"b\": 2}}"));
    }

    #[test]
    fn test_no_object() {
        assert_eq!(extract_json_object("I cannot help with that."), None);
        assert_eq!(extract_json_object("} backwards {"), None);
        assert_eq!(extract_json_object(""), None);
    }

    #[test]
    fn test_parse_valid_response() {
        let record = parse_response(
            "```json\n{\"parties\": [{\"name\": \"Acme Corp\"}]}\n```",
            &model(),
            UnknownFieldPolicy::Reject,
        )
        .unwrap();
        assert!(matches!(record.get("parties"), Some(Value::List(items)) if items.len() == 1));
    }

    #[test]
    fn test_parse_null_list_fails() {
        let err = parse_response("{\"parties\": null}", &model(), UnknownFieldPolicy::Reject)
            .unwrap_err();
        assert!(err.starts_with("$.parties"));
    }

    #[test]
    fn test_parse_invalid_json_fails() {
        let err = parse_response("{\"parties\": [}", &model(), UnknownFieldPolicy::Reject)
            .unwrap_err();
        assert!(err.starts_with("invalid JSON"));
    }
}
