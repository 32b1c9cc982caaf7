//! switchboard-interchange: typed JSON envelopes and asset definitions.
//!
//! Every polymorphic entity exchanged with the engine (actions, modifiers,
//! events, triggers, resumes) travels as a JSON object carrying a `type`
//! discriminant. This crate reads that discriminant and dispatches to a
//! kind-specific decoder held in an explicit [`Registry`], and provides the
//! plain structs that flow definitions and other assets deserialize into.
//!
//! The engine owns its registries; nothing here is global or mutable after
//! construction.

pub mod deserialize;
pub mod registry;
pub mod types;

pub use deserialize::{from_interchange, read_flow, InterchangeError};
pub use registry::{decode_typed, encode_typed, read_type, Decoder, Registry};
pub use types::*;
