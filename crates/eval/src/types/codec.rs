//! JSON encoding and decoding of values.
//!
//! Numbers travel as decimal text inside `serde_json::Number` (the
//! `arbitrary_precision` feature), so no digits are lost in either direction.

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::values::{render_datetime, Value};
use super::ValueError;

/// How numbers are written when encoding values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberFormat {
    /// Bare numeric literal: `1.50`.
    #[default]
    Literal,
    /// Quoted decimal string: `"1.50"`.
    Quoted,
}

/// Encoding options passed to every value-to-JSON call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonConfig {
    #[serde(default)]
    pub numbers: NumberFormat,
}

impl JsonConfig {
    pub fn quoted_numbers() -> Self {
        JsonConfig {
            numbers: NumberFormat::Quoted,
        }
    }
}

impl Value {
    /// Encodes this value as JSON. Encoding an error value fails with it.
    pub fn to_json(&self, config: &JsonConfig) -> Result<serde_json::Value, ValueError> {
        Ok(match self {
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Number(n) => encode_number(n, config)?,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::DateTime(dt) => serde_json::Value::String(render_datetime(dt)),
            Value::Array(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(|item| item.to_json(config))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Dict(entries) => {
                let mut obj = serde_json::Map::new();
                for (k, v) in entries {
                    obj.insert(k.clone(), v.to_json(config)?);
                }
                serde_json::Value::Object(obj)
            }
            Value::Error(e) => return Err(e.clone()),
        })
    }

    /// Encodes this value as compact JSON text.
    pub fn to_json_text(&self, config: &JsonConfig) -> Result<String, ValueError> {
        let json = self.to_json(config)?;
        serde_json::to_string(&json).map_err(|e| ValueError::message(e.to_string()))
    }

    /// Decodes a JSON value. `null` becomes empty text; strings stay text
    /// (no datetime sniffing).
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Text(String::new()),
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => decode_number(n),
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Array(items) => {
                Value::Array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(obj) => Value::Dict(
                obj.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect::<BTreeMap<_, _>>(),
            ),
        }
    }
}

fn encode_number(n: &Decimal, config: &JsonConfig) -> Result<serde_json::Value, ValueError> {
    let text = n.to_string();
    match config.numbers {
        NumberFormat::Quoted => Ok(serde_json::Value::String(text)),
        NumberFormat::Literal => serde_json::Number::from_str(&text)
            .map(serde_json::Value::Number)
            .map_err(|e| ValueError::message(format!("unable to encode number {}: {}", text, e))),
    }
}

fn decode_number(n: &serde_json::Number) -> Value {
    let text = n.to_string();
    match Decimal::from_str(&text).or_else(|_| Decimal::from_scientific(&text)) {
        Ok(d) => Value::Number(d),
        Err(_) => Value::Error(ValueError::Conversion {
            value: text,
            target: "number",
        }),
    }
}
