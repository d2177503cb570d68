// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Tag conversion between the authoritative representation (a JSON array
//! stored in a string column, e.g. `["rust","tokio"]`) and the index-side
//! keyword list.

use serde_json::Value;

/// Parse a JSON-array-in-string into a tag list.
///
/// Blank, malformed or non-array input yields an empty list. Non-string
/// array members are skipped.
///
/// ```
/// use index_sync::model::tags::parse_tags;
///
/// assert_eq!(parse_tags(r#"["a","b"]"#), vec!["a", "b"]);
/// assert!(parse_tags("not json").is_empty());
/// assert!(parse_tags("").is_empty());
/// ```
pub fn parse_tags(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Serialize a tag list back to its JSON-array-in-string form.
pub fn serialize_tags(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert_eq!(parse_tags(r#"["java", "rust"]"#), vec!["java", "rust"]);
    }

    #[test]
    fn test_parse_empty_array() {
        assert!(parse_tags("[]").is_empty());
    }

    #[test]
    fn test_parse_malformed() {
        assert!(parse_tags(r#"["unterminated"#).is_empty());
        assert!(parse_tags("{\"a\": 1}").is_empty());
        assert!(parse_tags("null").is_empty());
        assert!(parse_tags("   ").is_empty());
    }

    #[test]
    fn test_parse_skips_non_strings() {
        assert_eq!(parse_tags(r#"["a", 1, null, "b"]"#), vec!["a", "b"]);
    }

    #[test]
    fn test_serialize() {
        let tags = vec!["a".to_string(), "b\"c".to_string()];
        let raw = serialize_tags(&tags);
        assert_eq!(parse_tags(&raw), tags);
        assert_eq!(serialize_tags(&[]), "[]");
    }
}
