//! Tolerant deserialization for analyzer output.
//!
//! The analysis service returns loosely shaped JSON: numbers where strings are
//! expected, `null` where objects are expected, strings where booleans are
//! expected. None of that may fail a record, so every input type routes its
//! fields through these helpers and falls back to a neutral default.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserialize `T`, substituting `T::default()` for any shape mismatch.
pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Deserialize a list, skipping elements that do not fit `T`.
/// Non-array values become an empty list.
pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Any scalar rendered as text; `null`, arrays and objects become `None`.
pub fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(&value))
}

/// Like [`string`] but `None` collapses to an empty string.
pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    string(deserializer).map(Option::unwrap_or_default)
}

pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `true`/`false`, or the strings `yes`/`true`/`no`/`false` (case-insensitive).
pub fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "yes" | "true" => Some(true),
            "no" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// A JSON number, or a string holding one.
pub fn to_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// An integer count; fractional numbers truncate, numeric strings must be integral.
pub fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Lowercased, trimmed text of a scalar; `null` and containers become empty.
pub fn normalized(value: &Value) -> String {
    scalar_text(value)
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_default()
}

/// Pull a JSON document out of model text.
///
/// Accepts bare JSON, a fully fenced block (```` ```json ... ``` ````), a
/// fenced block embedded in prose, or failing those the span from the first
/// `{` to the last `}`.
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();

    if let Some(inner) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    {
        let inner = inner.trim();
        let inner = match inner.get(..4) {
            Some(tag) if tag.eq_ignore_ascii_case("json") => &inner[4..],
            _ => inner,
        };
        if let Ok(value) = serde_json::from_str(inner.trim()) {
            return Some(value);
        }
    }

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    if let Some(start) = trimmed.find("```json") {
        let body = &trimmed[start + "```json".len()..];
        if let Some(end) = body.find("```") {
            if let Ok(value) = serde_json::from_str(body[..end].trim()) {
                return Some(value);
            }
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_extract_json_shapes() {
        assert_eq!(extract_json(r#"{"a": 1}"#), Some(json!({"a": 1})));
        assert_eq!(
            extract_json("```json\n{\"segments\": []}\n```"),
            Some(json!({"segments": []}))
        );
        assert_eq!(extract_json("```\n{\"b\": 2}\n```"), Some(json!({"b": 2})));
        assert_eq!(
            extract_json("Here you go:\n```json\n{\"c\": 3}\n```\nThanks"),
            Some(json!({"c": 3}))
        );
        assert_eq!(
            extract_json("result: {\"d\": {\"e\": 4}} done"),
            Some(json!({"d": {"e": 4}}))
        );
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Inner {
        count: u32,
    }

    #[derive(Debug, Default, Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "or_default")]
        inner: Inner,
        #[serde(default, deserialize_with = "list")]
        items: Vec<Inner>,
        #[serde(default, deserialize_with = "string")]
        label: Option<String>,
    }

    #[test]
    fn test_shape_mismatches_fall_back() {
        let probe: Probe =
            serde_json::from_value(json!({"inner": "oops", "items": {"a": 1}, "label": [1]}))
                .unwrap();
        assert_eq!(probe.inner, Inner::default());
        assert!(probe.items.is_empty());
        assert!(probe.label.is_none());
    }

    #[test]
    fn test_list_skips_bad_elements() {
        let probe: Probe =
            serde_json::from_value(json!({"items": [{"count": 2}, "x", {"count": 5}]})).unwrap();
        assert_eq!(probe.items, vec![Inner { count: 2 }, Inner { count: 5 }]);
    }

    #[test]
    fn test_string_accepts_scalars() {
        let probe: Probe = serde_json::from_value(json!({"label": 3.1})).unwrap();
        assert_eq!(probe.label.as_deref(), Some("3.1"));
        let probe: Probe = serde_json::from_value(json!({"label": null})).unwrap();
        assert!(probe.label.is_none());
    }

    #[test]
    fn test_to_bool() {
        assert_eq!(to_bool(&json!(true)), Some(true));
        assert_eq!(to_bool(&json!(" No ")), Some(false));
        assert_eq!(to_bool(&json!("TRUE")), Some(true));
        assert_eq!(to_bool(&json!("NA")), None);
        assert_eq!(to_bool(&Value::Null), None);
        assert_eq!(to_bool(&json!(0)), None);
    }

    #[test]
    fn test_to_f64() {
        assert_eq!(to_f64(&json!(170)), Some(170.0));
        assert_eq!(to_f64(&json!(" 72.5 ")), Some(72.5));
        assert_eq!(to_f64(&json!("170 cm")), None);
        assert_eq!(to_f64(&json!("NaN")), None);
        assert_eq!(to_f64(&Value::Null), None);
    }

    #[test]
    fn test_to_i64() {
        assert_eq!(to_i64(&json!(4)), Some(4));
        assert_eq!(to_i64(&json!(3.9)), Some(3));
        assert_eq!(to_i64(&json!("5")), Some(5));
        assert_eq!(to_i64(&json!("5.0")), None);
        assert_eq!(to_i64(&json!("many")), None);
    }
}
