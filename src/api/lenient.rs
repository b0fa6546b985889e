//! Field decoders that accept whatever the upstream happened to send.
//!
//! Each helper reads a [`Value`] first and maps unexpected shapes to an empty
//! result, so one oddly-typed field never fails the surrounding record.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Strings pass through, numbers and booleans are rendered, anything else is `None`.
pub fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?))
}

/// Like [`opt_text`] but yields an empty string instead of `None`.
pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_default())
}

/// Keeps the elements of an array that decode as `T`; a non-array is empty.
pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(error = %e, "dropping undecodable list element");
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Sample {
        #[serde(deserialize_with = "opt_text")]
        phone: Option<String>,
        #[serde(deserialize_with = "text")]
        name: String,
        #[serde(deserialize_with = "list")]
        tags: Vec<String>,
    }

    fn sample(value: Value) -> Sample {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn numbers_become_text_and_structures_become_empty() {
        let s = sample(json!({"phone": 812345, "name": null, "tags": ["a", 3, "b"]}));
        assert_eq!(s.phone.as_deref(), Some("812345"));
        assert_eq!(s.name, "");
        assert_eq!(s.tags, ["a", "b"]);

        let s = sample(json!({"phone": {"cell": "1"}, "name": ["x"], "tags": "a,b"}));
        assert_eq!(s.phone, None);
        assert_eq!(s.name, "");
        assert!(s.tags.is_empty());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let s = sample(json!({}));
        assert_eq!(s.phone, None);
        assert!(s.tags.is_empty());
    }
}
