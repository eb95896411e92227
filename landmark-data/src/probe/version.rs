//! Extraction of the top-level `version` token from a document prefix.
//!
//! A structured parse is tried first. Prefixes cut off mid-document fail to
//! parse, so a bounded textual scan follows: it accepts the first `"version"`
//! key (the token followed by a colon) only when the brace balance shows it
//! sits at the top nesting level.

use serde_json::Value;

/// Bytes after the first `{` that the textual scan inspects.
pub const SCAN_WINDOW: usize = 500;

const VERSION_KEY: &str = "\"version\"";

/// Return the top-level `version` of `prefix` as a string.
///
/// Never fails: anything unexpected yields `None`.
///
/// # Examples
/// ```
/// use landmark_data::extract_version;
///
/// assert_eq!(
///     extract_version(r#"{"a":{"version":"9"},"version":"3","b":1}"#).as_deref(),
///     Some("3"),
/// );
/// assert_eq!(extract_version(r#"{"name":"x","vers"#), None);
/// ```
#[must_use]
pub fn extract_version(prefix: &str) -> Option<String> {
    match serde_json::from_str::<Value>(prefix) {
        Ok(Value::Object(fields)) => fields.get("version").and_then(scalar_text),
        Ok(_) => None,
        Err(_) => scan_root_version(prefix),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Scan possibly truncated JSON text for a top-level `version` scalar.
#[must_use]
pub fn scan_root_version(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let window = bounded_window(text.get(start..)?, SCAN_WINDOW);
    // The token only counts as a key when a colon follows it.
    let (key_at, value) = window.match_indices(VERSION_KEY).find_map(|(at, _)| {
        let after_key = window.get(at + VERSION_KEY.len()..)?;
        let value = after_key.trim_start().strip_prefix(':')?;
        Some((at, value.trim_start()))
    })?;
    let before = window.get(..key_at)?;
    if before.matches('{').count() != before.matches('}').count() + 1 {
        return None;
    }
    if let Some(quoted) = value.strip_prefix('"') {
        let end = quoted.find('"')?;
        return quoted.get(..end).map(str::to_owned);
    }
    let literal: String = value
        .chars()
        .take_while(|ch| ch.is_ascii_digit() || *ch == '.')
        .collect();
    (!literal.is_empty()).then_some(literal)
}

fn bounded_window(text: &str, limit: usize) -> &str {
    let mut end = limit.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.get(..end).unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(r#"{"a":{"version":"9"},"version":"3","b":1}"#, Some("3"))]
    #[case(r#"{"version": 4.2, "items": []}"#, Some("4.2"))]
    #[case(r#"{"version": true}"#, Some("true"))]
    #[case(r#"{"version": {"major": 1}}"#, None)]
    #[case(r#"{"items": []}"#, None)]
    #[case(r#"["version", 1]"#, None)]
    fn complete_documents_use_the_parser(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(extract_version(input).as_deref(), expected);
    }

    #[rstest]
    #[case(r#"{"name":"x","vers"#, None)]
    #[case(r#"{"version":"2024.05","items":[{"id":1"#, Some("2024.05"))]
    #[case(r#"  {"version" : 17, "items":[{"#, Some("17"))]
    #[case(r#"{"meta":{"version":"9"},"items":[{"#, None)]
    #[case(r#"{"meta":{"a":1},"version":"5","items":[{"#, Some("5"))]
    #[case(r#"{"kind":"version","version":"3","items":[{"#, Some("3"))]
    #[case(r#"{"tags":["version"] ,"version" :7,"items":[{"#, Some("7"))]
    #[case(r#"{"version":"unterminated"#, None)]
    #[case(r#"{"version": null, "items": [{"#, None)]
    #[case("no braces at all", None)]
    #[case("", None)]
    fn truncated_documents_fall_back_to_the_scan(
        #[case] input: &str,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(extract_version(input).as_deref(), expected);
    }

    #[rstest]
    fn scan_ignores_keys_beyond_the_window() {
        let padding = "x".repeat(SCAN_WINDOW);
        let input = format!(r#"{{"pad":"{padding}","version":"1","#);
        assert_eq!(scan_root_version(&input), None);
    }

    #[rstest]
    fn window_respects_multibyte_characters() {
        let padding = "鸟".repeat(SCAN_WINDOW);
        let input = format!(r#"{{"version":"8","name":"{padding}"#);
        assert_eq!(scan_root_version(&input).as_deref(), Some("8"));
    }
}
