//! Lenient JSON extraction from model output.

use serde_json::Value;

/// The first well-formed JSON object embedded in `text`.
///
/// Models wrap JSON in prose or code fences, so every `{` is tried as a
/// starting point and the first one that parses as a complete object wins.
pub fn first_json_object(text: &str) -> Option<serde_json::Map<String, Value>> {
    text.match_indices('{').find_map(|(start, _)| {
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Object(map))) => Some(map),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_object() {
        let obj = first_json_object(r#"{"answer": "Paris", "page": 3}"#).unwrap();
        assert_eq!(obj["answer"], "Paris");
        assert_eq!(obj["page"], 3);
    }

    #[test]
    fn object_inside_fence_and_prose() {
        let text = "Sure! Here you go:\n```json\n{\"answer\": \"42\"}\n```\nHope it helps.";
        let obj = first_json_object(text).unwrap();
        assert_eq!(obj["answer"], "42");
    }

    #[test]
    fn skips_unbalanced_brace_before_object() {
        let text = "set {a, b and then {\"page\": 2}";
        let obj = first_json_object(text).unwrap();
        assert_eq!(obj["page"], 2);
    }

    #[test]
    fn no_object() {
        assert!(first_json_object("no json here").is_none());
        assert!(first_json_object("{broken").is_none());
        assert!(first_json_object("").is_none());
    }
}
