//! Deserialization of asset bundles and flow definitions.
//!
//! The main entry point is [`from_interchange`], which takes a
//! `&serde_json::Value` and produces an [`AssetsBundle`]. Flows are checked
//! for graph consistency as they are read so the engine can trust node,
//! exit and category references.

use std::collections::BTreeSet;
use std::fmt;

use serde::de::DeserializeOwned;

use crate::types::*;

/// Errors during asset or envelope deserialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterchangeError {
    /// A required field is missing.
    MissingField { field: String },
    /// An envelope's discriminant has no registered decoder.
    UnknownType { kind: String, type_name: String },
    /// An envelope or asset failed to decode.
    Invalid {
        kind: String,
        type_name: String,
        message: String,
    },
    /// A flow graph references something that doesn't exist.
    InvalidFlow { flow_uuid: String, message: String },
    /// The bundle structure is invalid.
    InvalidBundle(String),
}

impl fmt::Display for InterchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterchangeError::MissingField { field } => {
                write!(f, "missing required field: '{}'", field)
            }
            InterchangeError::UnknownType { kind, type_name } => {
                write!(f, "unknown {} type '{}'", kind, type_name)
            }
            InterchangeError::Invalid {
                kind,
                type_name,
                message,
            } => {
                if type_name.is_empty() {
                    write!(f, "invalid {}: {}", kind, message)
                } else {
                    write!(f, "invalid {}[type={}]: {}", kind, type_name, message)
                }
            }
            InterchangeError::InvalidFlow { flow_uuid, message } => {
                write!(f, "flow '{}': {}", flow_uuid, message)
            }
            InterchangeError::InvalidBundle(msg) => {
                write!(f, "invalid bundle: {}", msg)
            }
        }
    }
}

impl std::error::Error for InterchangeError {}

/// Deserialize an assets JSON bundle into typed structs.
///
/// Every section is optional; a bundle with only `flows` is valid.
pub fn from_interchange(bundle: &serde_json::Value) -> Result<AssetsBundle, InterchangeError> {
    if !bundle.is_object() {
        return Err(InterchangeError::InvalidBundle(
            "bundle must be a JSON object".to_string(),
        ));
    }

    let flows = match bundle.get("flows").and_then(|f| f.as_array()) {
        Some(items) => items.iter().map(read_flow).collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    let mut seen = BTreeSet::new();
    for flow in &flows {
        if !seen.insert(flow.uuid.as_str()) {
            return Err(InterchangeError::InvalidBundle(format!(
                "duplicate flow uuid '{}'",
                flow.uuid
            )));
        }
    }

    Ok(AssetsBundle {
        flows,
        channels: read_section(bundle, "channels")?,
        classifiers: read_section(bundle, "classifiers")?,
        ticketers: read_section(bundle, "ticketers")?,
        groups: read_section(bundle, "groups")?,
        fields: read_section(bundle, "fields")?,
        resthooks: read_section(bundle, "resthooks")?,
    })
}

fn read_section<T: DeserializeOwned>(
    bundle: &serde_json::Value,
    section: &str,
) -> Result<Vec<T>, InterchangeError> {
    match bundle.get(section) {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(items) => {
            serde_json::from_value(items.clone()).map_err(|e| InterchangeError::Invalid {
                kind: section.to_string(),
                type_name: String::new(),
                message: e.to_string(),
            })
        }
    }
}

/// Read a single flow definition and check that its graph is consistent.
pub fn read_flow(data: &serde_json::Value) -> Result<FlowDef, InterchangeError> {
    let flow: FlowDef =
        serde_json::from_value(data.clone()).map_err(|e| InterchangeError::Invalid {
            kind: "flow".to_string(),
            type_name: String::new(),
            message: e.to_string(),
        })?;
    check_flow(&flow)?;
    Ok(flow)
}

fn check_flow(flow: &FlowDef) -> Result<(), InterchangeError> {
    let invalid = |message: String| InterchangeError::InvalidFlow {
        flow_uuid: flow.uuid.clone(),
        message,
    };

    let mut node_uuids = BTreeSet::new();
    for node in &flow.nodes {
        if !node_uuids.insert(node.uuid.as_str()) {
            return Err(invalid(format!("duplicate node uuid '{}'", node.uuid)));
        }
    }

    for node in &flow.nodes {
        let exit_uuids: BTreeSet<&str> = node.exits.iter().map(|e| e.uuid.as_str()).collect();

        for exit in &node.exits {
            if let Some(dest) = &exit.destination_uuid {
                if !node_uuids.contains(dest.as_str()) {
                    return Err(invalid(format!(
                        "exit '{}' of node '{}' points to missing node '{}'",
                        exit.uuid, node.uuid, dest
                    )));
                }
            }
        }

        let Some(router) = &node.router else {
            if node.exits.len() > 1 {
                return Err(invalid(format!(
                    "node '{}' has {} exits but no router",
                    node.uuid,
                    node.exits.len()
                )));
            }
            continue;
        };

        let category_uuids: BTreeSet<&str> =
            router.categories.iter().map(|c| c.uuid.as_str()).collect();

        for category in &router.categories {
            if !exit_uuids.contains(category.exit_uuid.as_str()) {
                return Err(invalid(format!(
                    "category '{}' of node '{}' uses missing exit '{}'",
                    category.name, node.uuid, category.exit_uuid
                )));
            }
        }
        for case in &router.cases {
            if !category_uuids.contains(case.category_uuid.as_str()) {
                return Err(invalid(format!(
                    "case '{}' of node '{}' uses missing category '{}'",
                    case.uuid, node.uuid, case.category_uuid
                )));
            }
        }
        match &router.default_category_uuid {
            Some(default) if category_uuids.contains(default.as_str()) => {}
            Some(default) => {
                return Err(invalid(format!(
                    "default category '{}' of node '{}' doesn't exist",
                    default, node.uuid
                )))
            }
            None => {
                return Err(invalid(format!(
                    "router of node '{}' has no default category",
                    node.uuid
                )))
            }
        }
    }

    Ok(())
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
