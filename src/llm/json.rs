//! Recovery of a JSON object from model text.
//!
//! Structured responses are requested as JSON, but some models still wrap
//! the object in a markdown fence or a sentence. Recovery tries the text
//! as-is, then a fenced block, then each balanced `{...}` span in order.

use serde_json::Value;

use crate::error::AiError;

/// Parse the single JSON object contained in `text`.
pub fn parse_object(text: &str) -> Result<Value, AiError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AiError::SchemaValidation(
            "model returned an empty response".to_string(),
        ));
    }

    [Some(trimmed), fenced_block(trimmed)]
        .into_iter()
        .flatten()
        .chain(balanced_spans(trimmed))
        .find_map(|candidate| match serde_json::from_str::<Value>(candidate) {
            Ok(value) if value.is_object() => Some(value),
            _ => None,
        })
        .ok_or_else(|| {
            AiError::SchemaValidation("model response is not a JSON object".to_string())
        })
}

/// Body of the first ```` ``` ```` fence, with an optional `json` tag removed.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")? + 3;
    let rest = &text[start..];
    let end = rest.find("```")?;
    let inner = rest[..end].trim_start();
    Some(inner.strip_prefix("json").unwrap_or(inner).trim())
}

/// Every balanced `{...}` span, one per opening brace, in text order.
fn balanced_spans(text: &str) -> impl Iterator<Item = &str> {
    text.match_indices('{')
        .filter_map(|(start, _)| balanced_from(&text[start..]))
}

/// The `{...}` span opening at the start of `text`, ignoring braces inside
/// strings.
fn balanced_from(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[..=idx]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_object() {
        let value = parse_object(r#"{"type": "feat", "description": "add login"}"#).unwrap();
        assert_eq!(value["type"], "feat");
    }

    #[test]
    fn test_parse_json_fence() {
        let text = "```json\n{\"type\": \"fix\", \"description\": \"null check\"}\n```";
        assert_eq!(parse_object(text).unwrap()["type"], "fix");
    }

    #[test]
    fn test_parse_untagged_fence() {
        let text = "```\n{\"type\": \"docs\", \"description\": \"readme\"}\n```";
        assert_eq!(parse_object(text).unwrap()["type"], "docs");
    }

    #[test]
    fn test_parse_object_inside_prose() {
        let text = r#"Sure! {"type": "chore", "description": "bump {deps}"} Hope that helps."#;
        let value = parse_object(text).unwrap();
        assert_eq!(value["description"], "bump {deps}");
    }

    #[test]
    fn test_braces_in_prose_before_object() {
        let text = r#"Using the {scope} convention: {"type": "feat", "description": "add login"}"#;
        let value = parse_object(text).unwrap();
        assert_eq!(value["type"], "feat");
        assert_eq!(value["description"], "add login");
    }

    #[test]
    fn test_unbalanced_brace_before_object() {
        let text = r#"Placeholder { left open. {"type": "fix", "description": "close handle"}"#;
        assert_eq!(parse_object(text).unwrap()["type"], "fix");
    }

    #[test]
    fn test_escaped_quotes_do_not_end_string() {
        let text = r#"Result: {"type": "feat", "description": "say \"hi\" }"} trailing"#;
        let value = parse_object(text).unwrap();
        assert_eq!(value["description"], "say \"hi\" }");
    }

    #[test]
    fn test_plain_text_is_rejected() {
        let err = parse_object("feat: add login page").unwrap_err();
        assert!(matches!(err, AiError::SchemaValidation(_)));
    }

    #[test]
    fn test_array_is_rejected() {
        assert!(parse_object(r#"["feat", "fix"]"#).is_err());
    }

    #[test]
    fn test_empty_is_rejected() {
        assert!(parse_object("   ").is_err());
    }
}
