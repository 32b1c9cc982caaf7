use serde::{Deserialize, Serialize};
use switchboard_interchange::{encode_typed, InterchangeError};

use super::{Action, ActionError, ValidationError, CATEGORY_FAILURE, CATEGORY_SUCCESS};
use crate::assets::AssetRef;
use crate::events::{EventPayload, ServiceCalled};
use crate::flow::RunScope;
use crate::routers::DEFAULT_OPERAND;
use crate::services::Classification;

pub(super) const TYPE: &str = "call_classifier";

fn default_input() -> String {
    DEFAULT_OPERAND.to_string()
}

/// Classifies the input with an NLU classifier and saves the top intent.
///
/// The result value is the intent name, and the full classification goes in
/// the result's extra so routers can test `@results.x.extra`. A classifier
/// error saves a `Failure` result with an empty value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallClassifierAction {
    pub uuid: String,
    pub classifier: AssetRef,
    #[serde(default = "default_input")]
    pub input: String,
    pub result_name: String,
}

impl Action for CallClassifierAction {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn type_name(&self) -> &'static str {
        TYPE
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.result_name.trim().is_empty() {
            return Err(ValidationError::new(self, "result name is required"));
        }
        Ok(())
    }

    fn execute(&self, scope: &mut RunScope<'_>) -> Result<(), ActionError> {
        let assets = scope.assets();
        let Some(classifier) = assets.classifier(&self.classifier.uuid) else {
            scope.error(format!("no such classifier with UUID '{}'", self.classifier.uuid));
            return Ok(());
        };

        let input = scope.evaluate(&self.input);
        if input.trim().is_empty() {
            scope.error("classifier input evaluated to empty string");
            return Ok(());
        }

        let service = match scope.services().classification(classifier) {
            Ok(service) => service,
            Err(e) => {
                scope.error(e.to_string());
                scope.save_result(&self.result_name, "", CATEGORY_FAILURE, &input, None);
                return Ok(());
            }
        };
        let outcome = service.classify(scope.environment(), &input);
        scope.log(EventPayload::ServiceCalled(ServiceCalled {
            service: "classifier".to_string(),
            classifier: Some(AssetRef::new(classifier.uuid.clone(), classifier.name.clone())),
        }));

        match outcome {
            Ok(classification) => {
                let value = top_intent(&classification).unwrap_or_default();
                let extra = serde_json::to_value(&classification)
                    .map_err(|e| ActionError::Invalid(e.to_string()))?;
                scope.save_result(&self.result_name, &value, CATEGORY_SUCCESS, &input, Some(extra));
            }
            Err(e) => {
                scope.error(e.to_string());
                scope.save_result(&self.result_name, "", CATEGORY_FAILURE, &input, None);
            }
        }
        Ok(())
    }

    fn to_json(&self) -> Result<serde_json::Value, InterchangeError> {
        encode_typed(TYPE, self)
    }
}

/// Intents come ordered by descending confidence.
fn top_intent(classification: &Classification) -> Option<String> {
    classification.intents.first().map(|i| i.name.clone())
}
