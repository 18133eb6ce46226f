//! Turn free-form model output into schema-conformant JSON.
//!
//! Strict path: strip code fences, scan for balanced `{..}` candidates and take
//! the first that parses with a usable primary field. Degraded path: pull the
//! primary field out with a field-specific pattern. Every other field is then
//! coerced to its declared kind or replaced by its default.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::capabilities::schema::{FieldKind, FieldSpec, Schema};

/// Upper bound on `{` positions tried by the balanced scan
const MAX_CANDIDATES: usize = 64;

static LEADING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^```[A-Za-z0-9_-]*[ \t]*\r?\n?").unwrap());
static TRAILING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r?\n?```\s*$").unwrap());

/// Schema-conformant result handed back to callers
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NormalizedResult {
    /// Provider id that produced it, or "fallback"
    pub source: String,
    /// True when the strict JSON path failed and the primary field was extracted by pattern
    pub degraded: bool,
    pub fields: Map<String, Value>,
}

impl NormalizedResult {
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn str_field(&self, name: &str) -> String {
        self.fields
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    pub fn f64_field(&self, name: &str) -> f64 {
        self.fields.get(name).and_then(Value::as_f64).unwrap_or(0.0)
    }

    pub fn i64_field(&self, name: &str) -> i64 {
        self.fields.get(name).and_then(Value::as_i64).unwrap_or(0)
    }

    pub fn list_field(&self, name: &str) -> Vec<String> {
        self.fields
            .get(name)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// True when every schema field is present with its declared kind
    pub fn satisfies(&self, schema: &Schema) -> bool {
        schema.fields.iter().enumerate().all(|(i, spec)| {
            self.fields
                .get(spec.name)
                .is_some_and(|v| value_matches(spec.kind, v) && (i > 0 || !is_empty_primary(v)))
        })
    }
}

/// Normalize `raw` against `schema`. Returns `None` only when neither a JSON
/// object nor the primary field can be recovered.
pub fn normalize(raw: &str, schema: &Schema) -> Option<NormalizedResult> {
    let text = strip_fences(raw);
    if text.is_empty() {
        return None;
    }

    if let Some(object) = first_usable_object(text, schema) {
        return Some(complete(object, schema, false));
    }

    let primary = schema.primary();
    let value = if schema.free_text {
        Some(Value::String(text.to_string()))
    } else {
        extract_field(text, primary)
    }?;

    let mut object = Map::new();
    object.insert(primary.name.to_string(), value);
    Some(complete(object, schema, true))
}

/// Build a result from explicit values, defaulting anything missing (primary included).
/// Used by terminal fallbacks so they share the same coercion rules.
pub fn from_values(values: Map<String, Value>, schema: &Schema) -> NormalizedResult {
    complete(values, schema, false)
}

/// Remove a leading ```` ``` ```` / ```` ```json ```` line and a trailing fence
pub fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(m) = LEADING_FENCE.find(text) {
        text = &text[m.end()..];
    }
    if let Some(m) = TRAILING_FENCE.find(text) {
        text = &text[..m.start()];
    }
    text.trim()
}

/// Byte ranges of balanced `{..}` substrings, one per opening brace, in order.
/// Braces inside JSON strings (with escapes) do not count.
pub fn balanced_candidates(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    for (start, _) in text.match_indices('{').take(MAX_CANDIDATES) {
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;
        for (offset, &b) in bytes[start..].iter().enumerate() {
            if in_string {
                match b {
                    _ if escaped => escaped = false,
                    b'\\' => escaped = true,
                    b'"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match b {
                b'"' => in_string = true,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        out.push(&text[start..=start + offset]);
                        break;
                    }
                }
                _ => {}
            }
        }
    }
    out
}

fn first_usable_object(text: &str, schema: &Schema) -> Option<Map<String, Value>> {
    let primary = schema.primary();
    let usable = |obj: &Map<String, Value>| {
        obj.get(primary.name)
            .and_then(|v| coerce(primary.kind, v))
            .is_some_and(|v| !is_empty_primary(&v))
    };

    for candidate in balanced_candidates(text) {
        if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(candidate)
            && usable(&obj)
        {
            return Some(obj);
        }
    }

    // Greedy first-`{` to last-`}` slice
    let (start, end) = (text.find('{')?, text.rfind('}')?);
    if start < end
        && let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(&text[start..=end])
        && usable(&obj)
    {
        return Some(obj);
    }
    None
}

/// Pattern-based recovery of a single field from malformed JSON-ish text
fn extract_field(text: &str, spec: &FieldSpec) -> Option<Value> {
    let name = regex::escape(spec.name);
    match spec.kind {
        FieldKind::String => {
            // closing quote optional: replies cut off by max_tokens still yield the value
            let re = Regex::new(&format!(r#""{name}"\s*:\s*"((?:[^"\\]|\\.)*)"?"#)).ok()?;
            let captured = re.captures(text)?.get(1)?.as_str();
            let value = serde_json::from_str::<String>(&format!("\"{captured}\""))
                .unwrap_or_else(|_| captured.replace("\\\"", "\"").replace("\\n", "\n"));
            let value = value.trim().to_string();
            (!value.is_empty()).then_some(Value::String(value))
        }
        FieldKind::Number | FieldKind::Integer => {
            let re = Regex::new(&format!(r#""?{name}"?\s*[:=]\s*"?(-?\d+(?:\.\d+)?)"#)).ok()?;
            let captured = re.captures(text)?.get(1)?.as_str();
            coerce(spec.kind, &Value::String(captured.to_string()))
        }
        FieldKind::StringList => {
            let re = Regex::new(&format!(r#""{name}"\s*:\s*(\[[^\]]*\])"#)).ok()?;
            let captured = re.captures(text)?.get(1)?.as_str();
            let parsed = serde_json::from_str::<Value>(captured).ok()?;
            coerce(spec.kind, &parsed).filter(|v| !is_empty_primary(v))
        }
    }
}

/// Coerce every schema field; unknown extra keys are kept as-is
fn complete(mut object: Map<String, Value>, schema: &Schema, degraded: bool) -> NormalizedResult {
    for spec in schema.fields {
        let coerced = object.get(spec.name).and_then(|v| coerce(spec.kind, v));
        let value = coerced.unwrap_or_else(|| spec.default.to_value());
        object.insert(spec.name.to_string(), value);
    }
    NormalizedResult {
        source: String::new(),
        degraded,
        fields: object,
    }
}

fn coerce(kind: FieldKind, value: &Value) -> Option<Value> {
    match (kind, value) {
        (FieldKind::String, Value::String(s)) => Some(Value::String(s.trim().to_string())),
        (FieldKind::String, Value::Number(n)) => Some(Value::String(n.to_string())),
        (FieldKind::String, Value::Bool(b)) => Some(Value::String(b.to_string())),

        (FieldKind::Number, Value::Number(n)) => n.as_f64().and_then(Number::from_f64).map(Value::Number),
        (FieldKind::Number, Value::String(s)) => parse_leading_number(s)
            .and_then(Number::from_f64)
            .map(Value::Number),

        (FieldKind::Integer, Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .map(Value::from),
        (FieldKind::Integer, Value::String(s)) => {
            parse_leading_number(s).map(|f| Value::from(f.round() as i64))
        }

        (FieldKind::StringList, Value::Array(items)) => Some(Value::Array(
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) if !s.trim().is_empty() => Some(Value::String(s.trim().to_string())),
                    Value::Number(n) => Some(Value::String(n.to_string())),
                    _ => None,
                })
                .collect(),
        )),
        (FieldKind::StringList, Value::String(s)) => {
            let parts: Vec<&str> = if s.contains([',', '\n']) {
                s.split([',', '\n']).collect()
            } else {
                s.split_whitespace().collect()
            };
            Some(Value::Array(
                parts
                    .into_iter()
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(|part| Value::String(part.to_string()))
                    .collect(),
            ))
        }

        _ => None,
    }
}

/// "8.7", " 8.7/10", "85%" -> leading number
fn parse_leading_number(s: &str) -> Option<f64> {
    let t = s.trim();
    let end = t
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && c == '-')))
        .map(|(i, _)| i)
        .unwrap_or(t.len());
    t[..end].parse::<f64>().ok().filter(|f| f.is_finite())
}

fn value_matches(kind: FieldKind, value: &Value) -> bool {
    match kind {
        FieldKind::String => value.is_string(),
        FieldKind::Number => value.is_number(),
        FieldKind::Integer => value.is_i64() || value.is_u64(),
        FieldKind::StringList => value
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_string)),
    }
}

fn is_empty_primary(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
