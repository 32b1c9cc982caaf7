//! Typed structs for the asset JSON consumed by the engine.
//!
//! Flow graphs keep their actions as raw `serde_json::Value` envelopes;
//! the engine decodes them through its action registry so that new action
//! kinds never require changes here.

use serde::{Deserialize, Serialize};

/// All assets available to a session: flows plus the channels, classifiers,
/// ticketers, groups, fields and resthooks they reference.
#[derive(Debug, Clone, Default)]
pub struct AssetsBundle {
    pub flows: Vec<FlowDef>,
    pub channels: Vec<ChannelDef>,
    pub classifiers: Vec<ClassifierDef>,
    pub ticketers: Vec<TicketerDef>,
    pub groups: Vec<GroupDef>,
    pub fields: Vec<FieldDef>,
    pub resthooks: Vec<ResthookDef>,
}

// ── Flow graph ──────────────────────────────────────────────────────

/// A flow definition: an ordered list of nodes, the first being the entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowDef {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub nodes: Vec<NodeDef>,
}

/// A node in a flow graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeDef {
    pub uuid: String,
    /// Action envelopes, each carrying a `type` discriminant.
    #[serde(default)]
    pub actions: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router: Option<RouterDef>,
    #[serde(default)]
    pub exits: Vec<ExitDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExitDef {
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_uuid: Option<String>,
}

/// A router picks one of its categories after a node's actions have run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouterDef {
    #[serde(rename = "type")]
    pub router_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait: Option<WaitDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_name: Option<String>,
    #[serde(default)]
    pub categories: Vec<CategoryDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operand: Option<String>,
    #[serde(default)]
    pub cases: Vec<CaseDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_category_uuid: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WaitDef {
    #[serde(rename = "type")]
    pub wait_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryDef {
    pub uuid: String,
    pub name: String,
    pub exit_uuid: String,
}

/// A single router test, e.g. `{"type": "has_any_word", "arguments": ["red"]}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaseDef {
    pub uuid: String,
    #[serde(rename = "type")]
    pub case_type: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    pub category_uuid: String,
}

// ── Other assets ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelDef {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub schemes: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassifierDef {
    pub uuid: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub classifier_type: String,
    #[serde(default)]
    pub intents: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TicketerDef {
    pub uuid: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub ticketer_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupDef {
    pub uuid: String,
    pub name: String,
}

/// A contact field declaration. `type` is one of `text`, `number`, `datetime`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldDef {
    pub key: String,
    pub name: String,
    #[serde(rename = "type", default = "default_field_type")]
    pub value_type: String,
}

fn default_field_type() -> String {
    "text".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResthookDef {
    pub slug: String,
    #[serde(default)]
    pub subscribers: Vec<String>,
}
