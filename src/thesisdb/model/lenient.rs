//! Field deserializers that never fail.
//!
//! Records are written by several tools and older versions, so a field may be
//! `null`, a number where a string is expected (`"capacity": "2"`, a numeric
//! student code) or something unusable. These helpers coerce what they can
//! and fall back to the empty value otherwise. A record only fails to read
//! when it is not an object at all.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

fn value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Value, D::Error> {
    Value::deserialize(deserializer)
}

pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite())
}

pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(scalar_to_string(&value(deserializer)?).unwrap_or_default())
}

pub fn opt_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(scalar_to_string(&value(deserializer)?))
}

pub fn u32_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(u32_from(&value(deserializer)?).unwrap_or(0))
}

pub fn u64_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(to_i64(&value(deserializer)?)
        .and_then(|n| u64::try_from(n).ok())
        .unwrap_or(0))
}

pub(crate) fn u32_from(value: &Value) -> Option<u32> {
    to_i64(value).and_then(|n| u32::try_from(n).ok())
}

pub fn i32_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    Ok(opt_i32_from(&value(deserializer)?).unwrap_or(0))
}

pub fn opt_i32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i32>, D::Error> {
    Ok(opt_i32_from(&value(deserializer)?))
}

fn opt_i32_from(value: &Value) -> Option<i32> {
    to_i64(value).and_then(|n| i32::try_from(n).ok())
}

pub fn f64_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(to_f64(&value(deserializer)?).unwrap_or(0.0))
}

/// `null` and unreadable values count as `true`, the default for `active`.
pub fn bool_or_true<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match value(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !matches!(s.trim().to_lowercase().as_str(), "false" | "0" | "no"),
        _ => true,
    })
}

/// A list of scalars; a single scalar becomes a one-element list.
pub fn string_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match value(deserializer)? {
        Value::Array(items) => items.iter().filter_map(scalar_to_string).collect(),
        other => scalar_to_string(&other).into_iter().collect(),
    })
}

pub fn string_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, String>, D::Error> {
    Ok(match value(deserializer)? {
        Value::Object(map) => map
            .into_iter()
            .filter_map(|(k, v)| scalar_to_string(&v).map(|v| (k, v)))
            .collect(),
        _ => BTreeMap::new(),
    })
}

/// Any value that reads as `T`, else `T::default()`.
pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned + Default,
{
    Ok(serde_json::from_value(value(deserializer)?).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Loose {
        #[serde(default, deserialize_with = "string")]
        code: String,
        #[serde(default, deserialize_with = "u32_or_zero")]
        capacity: u32,
        #[serde(default, deserialize_with = "opt_i32")]
        year: Option<i32>,
        #[serde(default, deserialize_with = "string_list")]
        keywords: Vec<String>,
        #[serde(default = "yes", deserialize_with = "bool_or_true")]
        active: bool,
    }

    fn yes() -> bool {
        true
    }

    #[test]
    fn test_coercions() {
        let p: Loose = serde_json::from_value(json!({
            "code": 9912,
            "capacity": " 2 ",
            "year": "1403",
            "keywords": "locks",
            "active": null
        }))
        .unwrap();
        assert_eq!(p.code, "9912");
        assert_eq!(p.capacity, 2);
        assert_eq!(p.year, Some(1403));
        assert_eq!(p.keywords, vec!["locks"]);
        assert!(p.active);
    }

    #[test]
    fn test_unusable_values_become_empty() {
        let p: Loose = serde_json::from_value(json!({
            "code": null,
            "capacity": -3,
            "year": {"y": 1},
            "keywords": [1, null, "a", {"b": 2}],
            "active": "false"
        }))
        .unwrap();
        assert_eq!(p.code, "");
        assert_eq!(p.capacity, 0);
        assert_eq!(p.year, None);
        assert_eq!(p.keywords, vec!["1", "a"]);
        assert!(!p.active);
    }
}
