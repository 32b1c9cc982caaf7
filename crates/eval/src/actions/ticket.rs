use serde::{Deserialize, Serialize};
use switchboard_interchange::{encode_typed, InterchangeError};

use super::{Action, ActionError, ValidationError, CATEGORY_FAILURE, CATEGORY_SUCCESS};
use crate::assets::AssetRef;
use crate::events::{EventPayload, TicketOpened};
use crate::flow::RunScope;
use crate::template::TemplateOptions;

pub(super) const TYPE: &str = "open_ticket";

/// Opens a support ticket with a ticketing service. With a `result_name`,
/// the ticket UUID is saved as the result value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenTicketAction {
    pub uuid: String,
    pub ticketer: AssetRef,
    pub subject: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub result_name: String,
}

impl Action for OpenTicketAction {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn type_name(&self) -> &'static str {
        TYPE
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.ticketer.uuid.is_empty() {
            return Err(ValidationError::new(self, "ticketer is required"));
        }
        Ok(())
    }

    fn execute(&self, scope: &mut RunScope<'_>) -> Result<(), ActionError> {
        let assets = scope.assets();
        let Some(ticketer) = assets.ticketer(&self.ticketer.uuid) else {
            scope.error(format!("no such ticketer with UUID '{}'", self.ticketer.uuid));
            return Ok(());
        };

        let subject = scope.evaluate(&self.subject);
        let body = scope.evaluate_with(&self.body, TemplateOptions::default());

        let opened = scope
            .services()
            .ticket(ticketer)
            .and_then(|service| service.open(&subject, &body));
        match opened {
            Ok(ticket) => {
                let uuid = ticket.uuid.clone();
                scope.log(EventPayload::TicketOpened(TicketOpened { ticket }));
                if !self.result_name.is_empty() {
                    scope.save_result(&self.result_name, &uuid, CATEGORY_SUCCESS, "", None);
                }
            }
            Err(e) => {
                scope.error(e.to_string());
                if !self.result_name.is_empty() {
                    scope.save_result(&self.result_name, "", CATEGORY_FAILURE, "", None);
                }
            }
        }
        Ok(())
    }

    fn to_json(&self) -> Result<serde_json::Value, InterchangeError> {
        encode_typed(TYPE, self)
    }
}
