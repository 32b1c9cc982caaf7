//! Typed flow graphs, decoded from interchange definitions.
//!
//! Actions are decoded through the engine's registry and validated when the
//! flow is built, so a [`Flow`] held by [`SessionAssets`] is always runnable.
//!
//! [`SessionAssets`]: crate::assets::SessionAssets

use std::collections::BTreeMap;

use switchboard_interchange::{FlowDef, NodeDef};

use crate::actions::{Action, ENTER_FLOW};
use crate::assets::AssetRef;
use crate::engine::{EngineError, Registries};
use crate::routers::Router;

#[derive(Debug)]
pub struct Flow {
    pub uuid: String,
    pub name: String,
    pub language: String,
    nodes: Vec<Node>,
    index: BTreeMap<String, usize>,
}

#[derive(Debug)]
pub struct Node {
    pub uuid: String,
    pub actions: Vec<Box<dyn Action>>,
    pub router: Option<Router>,
    pub exits: Vec<Exit>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exit {
    pub uuid: String,
    pub destination_uuid: Option<String>,
}

impl Flow {
    pub fn from_def(def: FlowDef, registries: &Registries) -> Result<Flow, EngineError> {
        let mut nodes = Vec::with_capacity(def.nodes.len());
        let mut index = BTreeMap::new();
        for node_def in def.nodes {
            let node = Node::from_def(&def.uuid, node_def, registries)?;
            index.insert(node.uuid.clone(), nodes.len());
            nodes.push(node);
        }
        Ok(Flow {
            uuid: def.uuid,
            name: def.name,
            language: def.language,
            nodes,
            index,
        })
    }

    pub fn reference(&self) -> AssetRef {
        AssetRef::new(self.uuid.clone(), self.name.clone())
    }

    /// The entry node, if the flow has any nodes.
    pub fn entry(&self) -> Option<&Node> {
        self.nodes.first()
    }

    pub fn node(&self, uuid: &str) -> Option<&Node> {
        self.index.get(uuid).map(|&i| &self.nodes[i])
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

impl Node {
    fn from_def(flow_uuid: &str, def: NodeDef, registries: &Registries) -> Result<Node, EngineError> {
        let invalid = |message: String| EngineError::InvalidFlow {
            flow: flow_uuid.to_string(),
            message,
        };

        let actions = registries.actions.read_all(&def.actions)?;
        for (i, action) in actions.iter().enumerate() {
            action.validate()?;
            if action.type_name() == ENTER_FLOW && i + 1 != actions.len() {
                return Err(invalid(format!(
                    "enter_flow action '{}' must be the last action of node '{}'",
                    action.uuid(),
                    def.uuid
                )));
            }
        }

        let router = match def.router {
            Some(router) => Some(Router::from_def(router).map_err(|e| {
                invalid(format!("router of node '{}': {}", def.uuid, e))
            })?),
            None => None,
        };

        Ok(Node {
            uuid: def.uuid,
            actions,
            router,
            exits: def
                .exits
                .into_iter()
                .map(|e| Exit {
                    uuid: e.uuid,
                    destination_uuid: e.destination_uuid,
                })
                .collect(),
        })
    }

    pub fn exit(&self, uuid: &str) -> Option<&Exit> {
        self.exits.iter().find(|e| e.uuid == uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use switchboard_interchange::read_flow;

    fn build(data: serde_json::Value) -> Result<Flow, EngineError> {
        Flow::from_def(read_flow(&data).unwrap(), &Registries::standard())
    }

    #[test]
    fn builds_typed_graph() {
        let flow = build(json!({
            "uuid": "f-1",
            "name": "Greeting",
            "nodes": [
                {
                    "uuid": "n-1",
                    "actions": [{"type": "send_msg", "uuid": "a-1", "text": "Hi"}],
                    "exits": [{"uuid": "e-1", "destination_uuid": "n-2"}]
                },
                {"uuid": "n-2", "exits": [{"uuid": "e-2"}]}
            ]
        }))
        .unwrap();

        assert_eq!(flow.entry().unwrap().uuid, "n-1");
        assert_eq!(flow.node("n-2").unwrap().exits[0].destination_uuid, None);
        assert_eq!(flow.node("n-1").unwrap().actions[0].type_name(), "send_msg");
        assert!(flow.node("n-3").is_none());
        assert_eq!(flow.reference(), AssetRef::new("f-1", "Greeting"));
    }

    #[test]
    fn rejects_unknown_action_type() {
        let err = build(json!({
            "uuid": "f-1",
            "name": "Broken",
            "nodes": [{
                "uuid": "n-1",
                "actions": [{"type": "launch_rocket", "uuid": "a-1"}],
                "exits": [{"uuid": "e-1"}]
            }]
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "unknown action type 'launch_rocket'");
    }

    #[test]
    fn rejects_enter_flow_before_other_actions() {
        let err = build(json!({
            "uuid": "f-1",
            "name": "Parent",
            "nodes": [{
                "uuid": "n-1",
                "actions": [
                    {"type": "enter_flow", "uuid": "a-1", "flow": {"uuid": "f-2", "name": "Child"}},
                    {"type": "send_msg", "uuid": "a-2", "text": "too late"}
                ],
                "exits": [{"uuid": "e-1"}]
            }]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("must be the last action"));
    }

    #[test]
    fn rejects_invalid_action() {
        let err = build(json!({
            "uuid": "f-1",
            "name": "Hooks",
            "nodes": [{
                "uuid": "n-1",
                "actions": [{
                    "type": "call_webhook",
                    "uuid": "a-1",
                    "method": "GET",
                    "url": "http://example.com",
                    "headers": {"Bad Header": "x"}
                }],
                "exits": [{"uuid": "e-1"}]
            }]
        }))
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(err.to_string().contains("'Bad Header' is not a valid HTTP header"));
    }

    #[test]
    fn rejects_unknown_router_type() {
        let err = build(json!({
            "uuid": "f-1",
            "name": "Random",
            "nodes": [{
                "uuid": "n-1",
                "router": {
                    "type": "random",
                    "categories": [{"uuid": "c-1", "name": "A", "exit_uuid": "e-1"}],
                    "default_category_uuid": "c-1"
                },
                "exits": [{"uuid": "e-1"}]
            }]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("unknown router type 'random'"));
    }
}
