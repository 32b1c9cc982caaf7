//! Expression-visible value types.
//!
//! The value set is closed: text, number, boolean, datetime, array, dict and
//! error. Errors are ordinary values so partially failing expressions can
//! still render.

pub mod codec;
pub mod values;

pub use codec::{JsonConfig, NumberFormat};
pub use values::Value;

// ──────────────────────────────────────────────
// Value-level errors
// ──────────────────────────────────────────────

/// An error carried as a value through expression evaluation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    /// A value couldn't be converted to the requested kind.
    #[error("unable to convert {value} to a {target}")]
    Conversion { value: String, target: &'static str },
    /// A number doesn't fit the 32-bit integer range.
    #[error("number value {value} is out of range for an integer")]
    Range { value: String },
    /// A keyed container has no entry for the key.
    #[error("{container} has no property '{key}'")]
    NoSuchKey { container: String, key: String },
    /// An index fell outside `[-length, length)`.
    #[error("index {index} out of range for {length} items")]
    IndexOutOfRange { index: i64, length: usize },
    /// The value at this point of the path supports neither keys nor indexes.
    #[error("can't resolve key '{key}' of type {kind}")]
    NotResolvable { key: String, kind: String },
    /// A path resolved to something outside the value set.
    #[error("'{path}' resolved to unsupported type {kind}")]
    UnsupportedKind { path: String, kind: String },
    #[error("{0}")]
    Message(String),
}

impl ValueError {
    pub fn message(msg: impl Into<String>) -> Self {
        ValueError::Message(msg.into())
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
