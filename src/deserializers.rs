//! Forgiving deserializers for store rows and form fields.
//!
//! PostgREST returns `null` for unset numeric columns and some platform APIs
//! return counts as strings; both should read as plain numbers.

use serde::{Deserialize, Deserializer};

/// Deserializes a count that may be a number, a numeric string or `null`.
///
/// # Accepted Formats
///
/// * `12` / `12.6` (rounded) / `"12"` / `null` (→ 0)
///
/// # Errors
///
/// Returns an error for non-numeric strings and non-scalar values.
pub fn de_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let v = Option::<serde_json::Value>::deserialize(deserializer)?;
    match v {
        None | Some(serde_json::Value::Null) => Ok(0),
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64))
            .ok_or_else(|| D::Error::custom("invalid numeric count")),
        Some(serde_json::Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(0);
            }
            s.parse::<i64>()
                .or_else(|_| s.parse::<f64>().map(|f| f.round() as i64))
                .map_err(|_| D::Error::custom(format!("invalid count '{s}'")))
        }
        Some(other) => Err(D::Error::custom(format!("invalid count type: {other}"))),
    }
}

/// Deserializes a boolean form field: `true`, `"true"`, `"1"`, `"on"`, `"yes"`.
pub fn de_bool_forgiving<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match v {
        Some(serde_json::Value::Bool(b)) => b,
        Some(serde_json::Value::String(s)) => parse_bool(&s),
        Some(serde_json::Value::Number(n)) => n.as_i64().is_some_and(|i| i != 0),
        _ => false,
    })
}

pub fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "on" | "yes"
    )
}
