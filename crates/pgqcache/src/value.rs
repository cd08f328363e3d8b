//! Dynamic values carried by filter predicates and payloads, and the
//! PostgreSQL literal renderer (the "value escaper") that turns them into
//! inline SQL text.
//!
//! Injection safety: [`render`] is only ever used to inline values into
//! `WHERE`/`SET`-literal position for predicate and operator-prefixed payload
//! entries (see [`crate::builder`]); ordinary INSERT/UPDATE payload values are
//! bound as driver parameters instead (`$1`, `$2`, ...), never rendered as a
//! literal. `render` never produces text that could close out of a string
//! literal it opened -- every quote and backslash in a `Text` value is doubled.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A dynamically-typed value, as it arrives from a parsed filter record.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDateTime),
    Array(Vec<Value>),
    /// A JSON object or array that isn't modeled as [`Value::Array`] directly
    /// (e.g. a jsonb payload column). Serialized with `serde_json` then
    /// single-quoted.
    Object(serde_json::Value),
    /// A zero-argument thunk. Rendered by invoking it and re-dispatching on
    /// the result, mirroring a source language where a plain function can
    /// stand in for any value (computed defaults, `now()`-style values).
    Deferred(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(n) => write!(f, "Float({n})"),
            Value::Text(s) => write!(f, "Text({s:?})"),
            Value::Date(d) => write!(f, "Date({d})"),
            Value::Array(a) => write!(f, "Array({a:?})"),
            Value::Object(o) => write!(f, "Object({o})"),
            Value::Deferred(_) => write!(f, "Deferred(..)"),
        }
    }
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Resolve any [`Value::Deferred`] thunks, recursively, to a concrete value.
    pub fn resolved(&self) -> Value {
        match self {
            Value::Deferred(f) => f().resolved(),
            other => other.clone(),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            obj @ serde_json::Value::Object(_) => Value::Object(obj),
        }
    }
}

/// Deserializes from plain JSON; there is no wire representation for a
/// deferred thunk, so parsed filter records never contain one.
impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

/// Serializes the resolved value: a `Deferred` thunk is invoked, recursively,
/// so both JSON round-tripping and fingerprint canonicalization see the same
/// deterministic shape (see `cache::fingerprint`, which assumes any thunk is
/// pure).
impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.resolved() {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(b),
            Value::Int(i) => serializer.serialize_i64(i),
            Value::Float(n) => serializer.serialize_f64(n),
            Value::Text(s) => serializer.serialize_str(&s),
            Value::Date(d) => serializer.serialize_str(&d.format("%Y-%m-%d %H:%M:%S").to_string()),
            Value::Array(items) => items.serialize(serializer),
            Value::Object(o) => o.serialize(serializer),
            Value::Deferred(_) => unreachable!("resolved() strips Deferred"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// Render `v` as an inline PostgreSQL literal.
///
/// `uppercase_null` selects between the two accepted spellings of the null
/// literal: WHERE-clause position uses lowercase `null`, array-element
/// position uses uppercase `NULL` -- both are valid PostgreSQL, the spec just
/// asks that the choice be consistent per call site.
pub fn render(v: &Value, uppercase_null: bool) -> String {
    match v.resolved() {
        Value::Null => {
            if uppercase_null {
                "NULL".to_string()
            } else {
                "null".to_string()
            }
        }
        Value::Bool(b) => if b { "true" } else { "false" }.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(n) => {
            if n.fract() == 0.0 && n.is_finite() {
                format!("{n:.1}")
            } else {
                n.to_string()
            }
        }
        Value::Text(s) => render_string(&s),
        Value::Date(d) => format!(
            "'{:04}-{:02}-{:02} {:02}:{:02}:{:02}'",
            d.date().format("%Y"),
            d.date().format("%m"),
            d.date().format("%d"),
            d.time().format("%H"),
            d.time().format("%M"),
            d.time().format("%S"),
        ),
        Value::Array(items) => {
            if items.is_empty() {
                "null".to_string()
            } else {
                let rendered: Vec<String> = items.iter().map(|i| render(i, true)).collect();
                format!("ARRAY[{}]", rendered.join(", "))
            }
        }
        Value::Object(o) => render_string(&o.to_string()),
        Value::Deferred(_) => unreachable!("resolved() strips Deferred"),
    }
}

fn render_string(s: &str) -> String {
    let has_backslash = s.contains('\\');
    let escaped: String = s.chars().fold(String::with_capacity(s.len() + 2), |mut acc, c| {
        match c {
            '\'' => acc.push_str("''"),
            '\\' => acc.push_str("\\\\"),
            other => acc.push(other),
        }
        acc
    });
    if has_backslash {
        format!("E'{escaped}'")
    } else {
        format!("'{escaped}'")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_context_cased() {
        assert_eq!(render(&Value::Null, false), "null");
        assert_eq!(render(&Value::Null, true), "NULL");
    }

    #[test]
    fn bool_renders_bare() {
        assert_eq!(render(&Value::Bool(true), false), "true");
        assert_eq!(render(&Value::Bool(false), false), "false");
    }

    #[test]
    fn number_renders_without_quotes() {
        assert_eq!(render(&Value::Int(1999), false), "1999");
        assert_eq!(render(&Value::Float(2.5), false), "2.5");
    }

    #[test]
    fn string_quotes_are_doubled() {
        assert_eq!(render(&Value::text("O'Brien"), false), "'O''Brien'");
    }

    #[test]
    fn string_with_backslash_gets_escape_prefix() {
        let rendered = render(&Value::text(r"a\b"), false);
        assert_eq!(rendered, r"E'a\\b'");
    }

    #[test]
    fn string_round_trips_for_arbitrary_utf8() {
        for s in ["hello", "O'Brien", r"back\slash", "unicode: héllo", "", "''"] {
            let literal = render(&Value::text(s), false);
            let inner = if let Some(rest) = literal.strip_prefix('E') {
                rest
            } else {
                &literal
            };
            let inner = &inner[1..inner.len() - 1];
            let unescaped = inner.replace("\\\\", "\\").replace("''", "'");
            assert_eq!(unescaped, s);
        }
    }

    #[test]
    fn empty_array_is_null() {
        assert_eq!(render(&Value::Array(vec![]), false), "null");
    }

    #[test]
    fn array_uses_uppercase_null_for_elements() {
        let arr = Value::Array(vec![Value::Int(1), Value::Null]);
        assert_eq!(render(&arr, false), "ARRAY[1, NULL]");
    }

    #[test]
    fn object_is_json_then_single_quoted() {
        let obj = Value::Object(serde_json::json!({"a": 1}));
        assert_eq!(render(&obj, false), "'{\"a\":1}'");
    }

    #[test]
    fn deferred_value_is_invoked_and_redispatched() {
        let deferred = Value::Deferred(Arc::new(|| Value::Int(42)));
        assert_eq!(render(&deferred, false), "42");
    }

    #[test]
    fn from_json_number_picks_int_or_float() {
        assert!(matches!(Value::from(serde_json::json!(5)), Value::Int(5)));
        assert!(matches!(Value::from(serde_json::json!(5.5)), Value::Float(_)));
    }
}
