use serde::{Deserialize, Serialize};
use switchboard_interchange::{encode_typed, InterchangeError};

use super::{Action, ActionError};
use crate::assets::AssetRef;
use crate::flow::RunScope;

pub const ENTER_FLOW: &str = "enter_flow";

/// Starts a child run of another flow. It must be the last action of its
/// node: the parent continues at the node's router once the child exits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnterFlowAction {
    pub uuid: String,
    pub flow: AssetRef,
}

impl Action for EnterFlowAction {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn type_name(&self) -> &'static str {
        ENTER_FLOW
    }

    fn execute(&self, scope: &mut RunScope<'_>) -> Result<(), ActionError> {
        scope.enter_flow(self.flow.clone());
        Ok(())
    }

    fn to_json(&self) -> Result<serde_json::Value, InterchangeError> {
        encode_typed(ENTER_FLOW, self)
    }
}
