//! Discriminant-based dispatch for typed JSON envelopes.
//!
//! A [`Registry`] maps the value of an envelope's `type` field to a decoder
//! for that kind. Registries are plain values: callers build them once and
//! pass them to whatever needs to decode.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::deserialize::InterchangeError;

/// Decodes one kind of envelope into `T`.
pub type Decoder<T> = fn(&serde_json::Value) -> Result<T, InterchangeError>;

/// Dispatch table from `type` discriminant to decoder.
pub struct Registry<T> {
    kind: &'static str,
    decoders: BTreeMap<&'static str, Decoder<T>>,
}

impl<T> Registry<T> {
    /// Creates an empty registry. `kind` names the family of envelopes
    /// (e.g. "action") and is used in error messages.
    pub fn new(kind: &'static str) -> Self {
        Registry {
            kind,
            decoders: BTreeMap::new(),
        }
    }

    /// Registers a decoder for `type_name`, replacing any previous one.
    pub fn register(mut self, type_name: &'static str, decoder: Decoder<T>) -> Self {
        self.decoders.insert(type_name, decoder);
        self
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.decoders.contains_key(type_name)
    }

    /// Registered type names in ascending order.
    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.decoders.keys().copied()
    }

    /// Reads the discriminant of `data` and dispatches to its decoder.
    pub fn read(&self, data: &serde_json::Value) -> Result<T, InterchangeError> {
        let type_name = read_type(data, self.kind)?;
        let decoder = self
            .decoders
            .get(type_name)
            .ok_or_else(|| InterchangeError::UnknownType {
                kind: self.kind.to_string(),
                type_name: type_name.to_string(),
            })?;
        decoder(data)
    }

    /// Reads every envelope in `items`, failing on the first bad one.
    pub fn read_all(&self, items: &[serde_json::Value]) -> Result<Vec<T>, InterchangeError> {
        items.iter().map(|item| self.read(item)).collect()
    }
}

/// Reads the `type` discriminant of an envelope.
pub fn read_type<'a>(
    data: &'a serde_json::Value,
    kind: &str,
) -> Result<&'a str, InterchangeError> {
    if !data.is_object() {
        return Err(InterchangeError::Invalid {
            kind: kind.to_string(),
            type_name: String::new(),
            message: "envelope must be a JSON object".to_string(),
        });
    }
    data.get("type")
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| InterchangeError::MissingField {
            field: format!("{}.type", kind),
        })
}

/// Decodes the body of an envelope into `S`. The `type` field itself is
/// ignored by the target struct.
pub fn decode_typed<S: DeserializeOwned>(
    data: &serde_json::Value,
    kind: &str,
) -> Result<S, InterchangeError> {
    serde_json::from_value(data.clone()).map_err(|e| InterchangeError::Invalid {
        kind: kind.to_string(),
        type_name: data
            .get("type")
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .to_string(),
        message: e.to_string(),
    })
}

/// Serializes `body` and wraps it in an envelope with the given discriminant.
pub fn encode_typed<S: Serialize>(
    type_name: &str,
    body: &S,
) -> Result<serde_json::Value, InterchangeError> {
    let value = serde_json::to_value(body).map_err(|e| InterchangeError::Invalid {
        kind: "envelope".to_string(),
        type_name: type_name.to_string(),
        message: e.to_string(),
    })?;
    let mut obj = match value {
        serde_json::Value::Object(obj) => obj,
        serde_json::Value::Null => serde_json::Map::new(),
        other => {
            return Err(InterchangeError::Invalid {
                kind: "envelope".to_string(),
                type_name: type_name.to_string(),
                message: format!("body must serialize to an object, got {}", other),
            })
        }
    };
    obj.insert(
        "type".to_string(),
        serde_json::Value::String(type_name.to_string()),
    );
    Ok(serde_json::Value::Object(obj))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Deserialize, Serialize)]
    struct Greeting {
        text: String,
    }

    #[derive(Debug, PartialEq)]
    enum Shape {
        Greeting(Greeting),
        Noop,
    }

    fn registry() -> Registry<Shape> {
        Registry::new("shape")
            .register("greeting", |v| decode_typed(v, "shape").map(Shape::Greeting))
            .register("noop", |_| Ok(Shape::Noop))
    }

    #[test]
    fn dispatches_on_type() {
        let reg = registry();
        let shape = reg.read(&json!({"type": "greeting", "text": "hi"})).unwrap();
        assert_eq!(
            shape,
            Shape::Greeting(Greeting {
                text: "hi".to_string()
            })
        );
        assert_eq!(reg.read(&json!({"type": "noop"})).unwrap(), Shape::Noop);
    }

    #[test]
    fn unknown_type_is_an_error() {
        let err = registry().read(&json!({"type": "circle"})).unwrap_err();
        assert_eq!(
            err,
            InterchangeError::UnknownType {
                kind: "shape".to_string(),
                type_name: "circle".to_string()
            }
        );
        assert_eq!(err.to_string(), "unknown shape type 'circle'");
    }

    #[test]
    fn missing_type_is_an_error() {
        let err = registry().read(&json!({"text": "hi"})).unwrap_err();
        assert!(matches!(err, InterchangeError::MissingField { .. }));
        let err = registry().read(&json!("greeting")).unwrap_err();
        assert!(matches!(err, InterchangeError::Invalid { .. }));
    }

    #[test]
    fn invalid_body_names_the_type() {
        let err = registry().read(&json!({"type": "greeting"})).unwrap_err();
        match err {
            InterchangeError::Invalid { type_name, .. } => assert_eq!(type_name, "greeting"),
            other => panic!("expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn encode_adds_discriminant() {
        let value = encode_typed(
            "greeting",
            &Greeting {
                text: "hi".to_string(),
            },
        )
        .unwrap();
        assert_eq!(value, json!({"type": "greeting", "text": "hi"}));
    }

    #[test]
    fn type_names_are_sorted() {
        let reg = registry();
        assert_eq!(reg.type_names().collect::<Vec<_>>(), vec!["greeting", "noop"]);
        assert!(reg.contains("noop"));
        assert!(!reg.contains("circle"));
    }
}
