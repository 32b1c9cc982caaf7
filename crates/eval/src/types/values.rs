//! Runtime values and their rendering, truthiness and ordering rules.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use super::ValueError;

/// A value in the expression language.
/// All numbers use `rust_decimal::Decimal` -- never `f64`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Number(Decimal),
    Boolean(bool),
    DateTime(OffsetDateTime),
    Array(Vec<Value>),
    Dict(BTreeMap<String, Value>),
    Error(ValueError),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Value {
        Value::Text(s.into())
    }

    pub fn error(e: ValueError) -> Value {
        Value::Error(e)
    }

    /// Builds a dict from `(key, value)` pairs; later duplicates win.
    pub fn dict<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Value {
        Value::Dict(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns the kind name used in type errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::DateTime(_) => "datetime",
            Value::Array(_) => "array",
            Value::Dict(_) => "dict",
            Value::Error(_) => "error",
        }
    }

    /// Returns a representation for error messages.
    pub fn describe(&self) -> String {
        match self {
            Value::Text(s) => format!("\"{}\"", s),
            Value::Number(_) | Value::Boolean(_) | Value::DateTime(_) => self.render(),
            Value::Array(_) => "array".to_string(),
            Value::Dict(_) => "dict".to_string(),
            Value::Error(_) => "error".to_string(),
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Text(s) => !s.is_empty(),
            Value::Number(n) => !n.is_zero(),
            Value::Boolean(b) => *b,
            Value::DateTime(_) => true,
            Value::Array(items) => !items.is_empty(),
            Value::Dict(entries) => !entries.is_empty(),
            Value::Error(_) => false,
        }
    }

    /// Canonical text form.
    ///
    /// Dicts render with keys in ascending order so identical content always
    /// renders identically. Errors inside containers render as inline markers.
    pub fn render(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(n) => n.normalize().to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::DateTime(dt) => render_datetime(dt),
            Value::Array(items) => {
                let rendered: Vec<String> = items.iter().map(Value::render).collect();
                serde_json::to_string(&rendered).unwrap_or_default()
            }
            Value::Dict(entries) => {
                let pairs: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v.render()))
                    .collect();
                format!("{{{}}}", pairs.join(", "))
            }
            Value::Error(e) => format!("ERROR: {}", e),
        }
    }

    /// Orders two values of the same comparable kind.
    ///
    /// Numbers compare by decimal value, text lexically and datetimes by
    /// instant. Any other pairing is an error.
    pub fn compare(&self, other: &Value) -> Result<Ordering, ValueError> {
        match (self, other) {
            (Value::Number(l), Value::Number(r)) => Ok(l.cmp(r)),
            (Value::Text(l), Value::Text(r)) => Ok(l.cmp(r)),
            (Value::DateTime(l), Value::DateTime(r)) => Ok(l.cmp(r)),
            (Value::Error(e), _) | (_, Value::Error(e)) => Err(e.clone()),
            (l, r) => Err(ValueError::message(format!(
                "can't compare {} with {}",
                l.describe(),
                r.describe()
            ))),
        }
    }

    /// Converts to text, propagating errors.
    pub fn to_text(&self) -> Result<String, ValueError> {
        match self {
            Value::Error(e) => Err(e.clone()),
            other => Ok(other.render()),
        }
    }

    /// Converts to a boolean by truthiness, propagating errors.
    pub fn to_boolean(&self) -> Result<bool, ValueError> {
        match self {
            Value::Error(e) => Err(e.clone()),
            other => Ok(other.truthy()),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Number of items for arrays and dicts.
    pub fn length(&self) -> Option<usize> {
        match self {
            Value::Array(items) => Some(items.len()),
            Value::Dict(entries) => Some(entries.len()),
            _ => None,
        }
    }
}

pub(crate) fn render_datetime(dt: &OffsetDateTime) -> String {
    dt.format(&Rfc3339).unwrap_or_else(|_| dt.to_string())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
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

impl From<Decimal> for Value {
    fn from(n: Decimal) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Decimal::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<OffsetDateTime> for Value {
    fn from(dt: OffsetDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<ValueError> for Value {
    fn from(e: ValueError) -> Self {
        Value::Error(e)
    }
}
