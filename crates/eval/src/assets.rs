//! Read-only assets shared by every session of an engine.
//!
//! A [`SessionAssets`] is built once from an interchange bundle (flows are
//! decoded through the engine's action registry at that point) and shared
//! between sessions behind an `Arc`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use switchboard_interchange::{
    AssetsBundle, ChannelDef, ClassifierDef, FieldDef, GroupDef, ResthookDef, TicketerDef,
};

use crate::definition::Flow;
use crate::engine::{EngineError, Registries};

/// A non-owning reference to an asset by UUID, carrying its name for display.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetRef {
    pub uuid: String,
    pub name: String,
}

impl AssetRef {
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        AssetRef {
            uuid: uuid.into(),
            name: name.into(),
        }
    }
}

/// The value type of a contact field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Number,
    DateTime,
}

impl FieldType {
    fn parse(name: &str) -> Option<FieldType> {
        match name {
            "text" => Some(FieldType::Text),
            "number" => Some(FieldType::Number),
            "datetime" => Some(FieldType::DateTime),
            _ => None,
        }
    }
}

/// A declared contact field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub key: String,
    pub name: String,
    pub value_type: FieldType,
}

#[derive(Debug, Default)]
pub struct SessionAssets {
    flows: BTreeMap<String, Arc<Flow>>,
    flow_order: Vec<String>,
    channels: Vec<ChannelDef>,
    classifiers: Vec<ClassifierDef>,
    ticketers: Vec<TicketerDef>,
    groups: Vec<GroupDef>,
    fields: BTreeMap<String, Field>,
    resthooks: Vec<ResthookDef>,
}

impl SessionAssets {
    /// Builds assets from a decoded bundle, decoding every flow's actions.
    pub fn from_bundle(
        bundle: AssetsBundle,
        registries: &Registries,
    ) -> Result<SessionAssets, EngineError> {
        let mut flows = BTreeMap::new();
        let mut flow_order = Vec::with_capacity(bundle.flows.len());
        for def in bundle.flows {
            let flow = Flow::from_def(def, registries)?;
            flow_order.push(flow.uuid.clone());
            flows.insert(flow.uuid.clone(), Arc::new(flow));
        }

        let mut fields = BTreeMap::new();
        for FieldDef {
            key,
            name,
            value_type,
        } in bundle.fields
        {
            let value_type = FieldType::parse(&value_type).ok_or_else(|| {
                EngineError::InvalidAsset(format!(
                    "field '{}' has unknown type '{}'",
                    key, value_type
                ))
            })?;
            fields.insert(
                key.clone(),
                Field {
                    key,
                    name,
                    value_type,
                },
            );
        }

        Ok(SessionAssets {
            flows,
            flow_order,
            channels: bundle.channels,
            classifiers: bundle.classifiers,
            ticketers: bundle.ticketers,
            groups: bundle.groups,
            fields,
            resthooks: bundle.resthooks,
        })
    }

    pub fn flow(&self, uuid: &str) -> Option<&Arc<Flow>> {
        self.flows.get(uuid)
    }

    /// Flows in the order they were declared.
    pub fn flows(&self) -> impl Iterator<Item = &Arc<Flow>> + '_ {
        self.flow_order.iter().filter_map(|uuid| self.flows.get(uuid))
    }

    pub fn channel(&self, uuid: &str) -> Option<&ChannelDef> {
        self.channels.iter().find(|c| c.uuid == uuid)
    }

    /// The first channel able to send on `scheme`.
    pub fn channel_for_scheme(&self, scheme: &str) -> Option<&ChannelDef> {
        self.channels.iter().find(|c| {
            c.schemes.iter().any(|s| s == scheme)
                && (c.roles.is_empty() || c.roles.iter().any(|r| r == "send"))
        })
    }

    pub fn classifier(&self, uuid: &str) -> Option<&ClassifierDef> {
        self.classifiers.iter().find(|c| c.uuid == uuid)
    }

    pub fn ticketer(&self, uuid: &str) -> Option<&TicketerDef> {
        self.ticketers.iter().find(|t| t.uuid == uuid)
    }

    pub fn group(&self, uuid: &str) -> Option<&GroupDef> {
        self.groups.iter().find(|g| g.uuid == uuid)
    }

    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> + '_ {
        self.fields.values()
    }

    pub fn resthook(&self, slug: &str) -> Option<&ResthookDef> {
        self.resthooks.iter().find(|r| r.slug == slug)
    }
}
