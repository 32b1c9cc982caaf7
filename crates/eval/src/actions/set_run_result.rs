use serde::{Deserialize, Serialize};
use switchboard_interchange::{encode_typed, InterchangeError};

use super::{Action, ActionError, ValidationError};
use crate::flow::RunScope;

pub(super) const TYPE: &str = "set_run_result";

/// Saves a result on the run. The value is a template; the category is
/// stored as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetRunResultAction {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
}

impl Action for SetRunResultAction {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn type_name(&self) -> &'static str {
        TYPE
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new(self, "result name is required"));
        }
        Ok(())
    }

    fn execute(&self, scope: &mut RunScope<'_>) -> Result<(), ActionError> {
        let value = scope.evaluate(&self.value);
        scope.save_result(&self.name, &value, &self.category, "", None);
        Ok(())
    }

    fn to_json(&self) -> Result<serde_json::Value, InterchangeError> {
        encode_typed(TYPE, self)
    }
}
