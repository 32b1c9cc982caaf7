//! Run results: named values captured by routers and actions.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use time::OffsetDateTime;

use crate::context::{Capability, Item, Queryable};
use crate::dates;
use crate::types::{Value, ValueError};

/// A value captured during a run, e.g. by a router with a result name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category_localized: String,
    pub node_uuid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
    #[serde(with = "dates::rfc3339")]
    pub created_on: OffsetDateTime,
}

impl RunResult {
    pub fn key(&self) -> String {
        snakify(&self.name)
    }

    fn localized_category(&self) -> &str {
        if self.category_localized.is_empty() {
            &self.category
        } else {
            &self.category_localized
        }
    }
}

/// Normalizes a result name into its lookup key: lowercase, with every run of
/// non-alphanumeric characters collapsed to `_` and no leading or trailing `_`.
pub fn snakify(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_sep && !key.is_empty() {
                key.push('_');
            }
            pending_sep = false;
            key.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    key
}

/// A run's results keyed by snakified name, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Results {
    entries: Vec<(String, RunResult)>,
}

impl Results {
    pub fn new() -> Self {
        Results::default()
    }

    /// Saves a result. An existing entry with the same key is replaced in
    /// place.
    pub fn save(&mut self, result: RunResult) {
        let key = result.key();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = result,
            None => self.entries.push((key, result)),
        }
    }

    /// Looks up by key; the key is snakified first so names work too.
    pub fn get(&self, key: &str) -> Option<&RunResult> {
        let key = snakify(key);
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, r)| r)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RunResult)> + '_ {
        self.entries.iter().map(|(k, r)| (k.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Results {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, result) in &self.entries {
            map.serialize_entry(key, result)?;
        }
        map.end()
    }
}

// ──────────────────────────────────────────────
// Expression context
// ──────────────────────────────────────────────

/// How much of a result is exposed: `@results.x` only has value and
/// category, `@run.results.x` has everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detail {
    Simple,
    Full,
}

pub struct ResultContext<'a> {
    pub result: &'a RunResult,
    pub detail: Detail,
}

impl Queryable for ResultContext<'_> {
    fn describe(&self) -> String {
        "result".to_string()
    }

    fn capability(&self) -> Capability {
        Capability::Keyed
    }

    fn resolve(&self, key: &str) -> Result<Item<'_>, ValueError> {
        let r = self.result;
        let item = match (key, self.detail) {
            ("value", _) => Item::text(r.value.clone()),
            ("category", _) => Item::text(r.category.clone()),
            ("category_localized", Detail::Full) => Item::text(r.localized_category()),
            ("name", Detail::Full) => Item::text(r.name.clone()),
            ("input", Detail::Full) => Item::text(r.input.clone()),
            ("node_uuid", Detail::Full) => Item::text(r.node_uuid.clone()),
            ("created_on", Detail::Full) => Item::value(Value::DateTime(r.created_on)),
            ("extra", Detail::Full) => Item::value(
                r.extra
                    .as_ref()
                    .map(Value::from_json)
                    .unwrap_or_else(|| Value::text("")),
            ),
            _ => {
                return Err(ValueError::NoSuchKey {
                    container: "result".to_string(),
                    key: key.to_string(),
                })
            }
        };
        Ok(item)
    }

    fn atomize(&self) -> Option<Value> {
        Some(Value::text(self.result.value.clone()))
    }
}

pub struct ResultsContext<'a> {
    pub results: &'a Results,
    pub detail: Detail,
}

impl Queryable for ResultsContext<'_> {
    fn describe(&self) -> String {
        "results".to_string()
    }

    fn capability(&self) -> Capability {
        Capability::Keyed
    }

    fn resolve(&self, key: &str) -> Result<Item<'_>, ValueError> {
        self.results
            .get(key)
            .map(|result| {
                Item::Owned(Box::new(ResultContext {
                    result,
                    detail: self.detail,
                }))
            })
            .ok_or_else(|| ValueError::NoSuchKey {
                container: "results".to_string(),
                key: key.to_string(),
            })
    }

    fn atomize(&self) -> Option<Value> {
        Some(Value::Dict(
            self.results
                .iter()
                .map(|(k, r)| (k.to_string(), Value::text(r.value.clone())))
                .collect(),
        ))
    }
}
