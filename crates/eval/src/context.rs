//! Queryable entities exposed to expressions.
//!
//! Everything an expression can walk into implements [`Queryable`]. A single
//! [`Capability`] tag tells the resolver whether the entity answers keys,
//! indexes, both, or nothing at all.

use std::borrow::Cow;

use crate::types::{Value, ValueError};

/// What an entity supports during path resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Keyed,
    Indexed,
    KeyedIndexed,
    Atomic,
}

impl Capability {
    pub fn is_keyed(self) -> bool {
        matches!(self, Capability::Keyed | Capability::KeyedIndexed)
    }

    pub fn is_indexed(self) -> bool {
        matches!(self, Capability::Indexed | Capability::KeyedIndexed)
    }
}

/// One step of a resolution: a plain value or another entity.
pub enum Item<'a> {
    Value(Cow<'a, Value>),
    Entity(&'a dyn Queryable),
    Owned(Box<dyn Queryable + 'a>),
}

impl<'a> Item<'a> {
    pub fn value(v: Value) -> Item<'a> {
        Item::Value(Cow::Owned(v))
    }

    pub fn borrowed(v: &'a Value) -> Item<'a> {
        Item::Value(Cow::Borrowed(v))
    }

    pub fn text(s: impl Into<String>) -> Item<'a> {
        Item::value(Value::Text(s.into()))
    }

    pub fn as_queryable(&self) -> &dyn Queryable {
        match self {
            Item::Value(v) => &**v,
            Item::Entity(e) => *e,
            Item::Owned(b) => &**b,
        }
    }
}

/// An entity that can appear in an expression path.
pub trait Queryable {
    /// Short description used in error messages, e.g. `contact`.
    fn describe(&self) -> String;

    fn capability(&self) -> Capability;

    /// Looks up a key. Only called when the capability is keyed.
    fn resolve(&self, key: &str) -> Result<Item<'_>, ValueError> {
        Err(ValueError::NotResolvable {
            key: key.to_string(),
            kind: self.describe(),
        })
    }

    /// Number of indexable items.
    fn length(&self) -> usize {
        0
    }

    /// Returns the item at `index`, already bounds-checked by the caller.
    fn index(&self, index: usize) -> Result<Item<'_>, ValueError> {
        Err(ValueError::IndexOutOfRange {
            index: index as i64,
            length: self.length(),
        })
    }

    /// The value this entity stands for when a path ends on it.
    /// `None` means the entity has no representation in the value set.
    fn atomize(&self) -> Option<Value>;
}

impl Queryable for Value {
    fn describe(&self) -> String {
        Value::describe(self)
    }

    fn capability(&self) -> Capability {
        match self {
            Value::Dict(_) => Capability::Keyed,
            Value::Array(_) => Capability::Indexed,
            _ => Capability::Atomic,
        }
    }

    fn resolve(&self, key: &str) -> Result<Item<'_>, ValueError> {
        match self {
            Value::Dict(entries) => entries
                .get(key)
                .map(Item::borrowed)
                .ok_or_else(|| ValueError::NoSuchKey {
                    container: "dict".to_string(),
                    key: key.to_string(),
                }),
            other => Err(ValueError::NotResolvable {
                key: key.to_string(),
                kind: other.describe(),
            }),
        }
    }

    fn length(&self) -> usize {
        match self {
            Value::Array(items) => items.len(),
            _ => 0,
        }
    }

    fn index(&self, index: usize) -> Result<Item<'_>, ValueError> {
        match self {
            Value::Array(items) => {
                items
                    .get(index)
                    .map(Item::borrowed)
                    .ok_or(ValueError::IndexOutOfRange {
                        index: index as i64,
                        length: items.len(),
                    })
            }
            _ => Err(ValueError::NotResolvable {
                key: index.to_string(),
                kind: self.describe(),
            }),
        }
    }

    fn atomize(&self) -> Option<Value> {
        Some(self.clone())
    }
}

/// A keyed entity assembled from named items, used for the context root and
/// for small derived objects.
pub struct Fields<'a> {
    name: &'static str,
    entries: Vec<(&'static str, Item<'a>)>,
    default: Option<Value>,
}

impl<'a> Fields<'a> {
    pub fn new(name: &'static str) -> Self {
        Fields {
            name,
            entries: Vec::new(),
            default: None,
        }
    }

    pub fn with(mut self, key: &'static str, item: Item<'a>) -> Self {
        self.entries.push((key, item));
        self
    }

    /// The value rendered when a path stops at this object.
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }
}

impl Queryable for Fields<'_> {
    fn describe(&self) -> String {
        self.name.to_string()
    }

    fn capability(&self) -> Capability {
        Capability::Keyed
    }

    fn resolve(&self, key: &str) -> Result<Item<'_>, ValueError> {
        let (_, item) = self
            .entries
            .iter()
            .find(|(k, _)| *k == key)
            .ok_or_else(|| ValueError::NoSuchKey {
                container: self.name.to_string(),
                key: key.to_string(),
            })?;
        Ok(match item {
            Item::Value(v) => Item::borrowed(&**v),
            Item::Entity(e) => Item::Entity(*e),
            Item::Owned(b) => Item::Entity(&**b),
        })
    }

    fn atomize(&self) -> Option<Value> {
        self.default.clone()
    }
}
