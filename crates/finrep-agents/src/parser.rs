use serde::de::DeserializeOwned;

use crate::error::ReportError;

/// Extract the first JSON object from a string that may contain surrounding text.
///
/// Handles common oracle response formats:
/// - Clean JSON: `{"key": "value"}`
/// - Markdown-wrapped: ```json\n{"key": "value"}\n```
/// - Prefix text: `Here is the section:\n{"key": "value"}`
pub fn extract_json(text: &str) -> Result<String, ReportError> {
    let trimmed = text.trim();

    if trimmed.starts_with('{') && serde_json::from_str::<serde_json::Value>(trimmed).is_ok() {
        return Ok(trimmed.to_string());
    }

    if let Some(json_str) = extract_from_markdown_block(trimmed) {
        if serde_json::from_str::<serde_json::Value>(&json_str).is_ok() {
            return Ok(json_str);
        }
    }

    if let Some(json_str) = extract_first_object(trimmed) {
        if serde_json::from_str::<serde_json::Value>(&json_str).is_ok() {
            return Ok(json_str);
        }
    }

    Err(ReportError::Malformed(format!(
        "No valid JSON object found in response (length={})",
        text.len()
    )))
}

/// Extract JSON from a markdown code block (```json ... ``` or ``` ... ```)
fn extract_from_markdown_block(text: &str) -> Option<String> {
    let start_markers = ["```json\n", "```json\r\n", "```\n", "```\r\n"];

    for marker in &start_markers {
        if let Some(start) = text.find(marker) {
            let json_start = start + marker.len();
            if let Some(end) = text[json_start..].find("```") {
                let extracted = text[json_start..json_start + end].trim();
                return Some(extracted.to_string());
            }
        }
    }

    None
}

/// Find the first balanced { ... } in the text.
fn extract_first_object(text: &str) -> Option<String> {
    let mut depth = 0;
    let mut start = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if !in_string && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start {
                        return Some(text[s..=i].to_string());
                    }
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse a typed stage payload from raw oracle output.
///
/// Anything that does not deserialize into `T` is a hard failure; there is no
/// partial-credit parsing.
pub fn parse_payload<T: DeserializeOwned>(raw: &str) -> Result<T, ReportError> {
    let json_str = extract_json(raw)?;
    serde_json::from_str(&json_str)
        .map_err(|e| ReportError::Malformed(format!("Failed to parse payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn extract_clean_json() {
        let input = r#"{"summary": "flat", "rows": []}"#;
        assert_eq!(extract_json(input).unwrap(), input);
    }

    #[test]
    fn extract_from_markdown() {
        let input = "Here is the section:\n```json\n{\"items\": [\"a\"]}\n```\nDone.";
        assert_eq!(extract_json(input).unwrap(), r#"{"items": ["a"]}"#);
    }

    #[test]
    fn extract_from_markdown_no_lang() {
        let input = "Result:\n```\n{\"text\": \"ok\"}\n```";
        assert_eq!(extract_json(input).unwrap(), r#"{"text": "ok"}"#);
    }

    #[test]
    fn extract_with_prefix_text() {
        let input = "Sure, the cards follow:\n{\"cards\": [{\"title\": \"Trend\", \"text\": \"up [1]\"}]}";
        let result = extract_json(input).unwrap();
        assert!(result.starts_with("{\"cards\""));
    }

    #[test]
    fn braces_inside_strings_are_ignored() {
        let input = r#"note {"text": "range {low} to {high}", "n": 2} trailing"#;
        let parsed: serde_json::Value = serde_json::from_str(&extract_json(input).unwrap()).unwrap();
        assert_eq!(parsed["n"], 2);
    }

    #[test]
    fn stray_closing_brace_before_object() {
        let input = "} oops {\"ok\": true}";
        assert_eq!(extract_json(input).unwrap(), r#"{"ok": true}"#);
    }

    #[test]
    fn no_json_is_malformed() {
        let err = extract_json("plain prose, nothing structured").unwrap_err();
        assert!(matches!(err, ReportError::Malformed(_)));
    }

    #[derive(Debug, Deserialize)]
    struct Bullets {
        items: Vec<String>,
    }

    #[test]
    fn parse_payload_typed() {
        let parsed: Bullets = parse_payload("```json\n{\"items\": [\"x\", \"y\"]}\n```").unwrap();
        assert_eq!(parsed.items, vec!["x", "y"]);
    }

    #[test]
    fn parse_payload_wrong_shape() {
        let result: Result<Bullets, _> = parse_payload(r#"{"bullets": ["x"]}"#);
        assert!(matches!(result, Err(ReportError::Malformed(_))));
    }
}
