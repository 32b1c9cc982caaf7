use serde::{Deserialize, Serialize};
use switchboard_interchange::{encode_typed, InterchangeError};

use super::{Action, ActionError, ValidationError};
use crate::events::{EmailSent, EventPayload};
use crate::flow::RunScope;
use crate::template::TemplateOptions;

pub(super) const TYPE: &str = "send_email";

/// Sends an email. Addresses that evaluate to empty are dropped; the body
/// is not truncated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendEmailAction {
    pub uuid: String,
    pub addresses: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl Action for SendEmailAction {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn type_name(&self) -> &'static str {
        TYPE
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.addresses.is_empty() {
            return Err(ValidationError::new(self, "at least one address is required"));
        }
        Ok(())
    }

    fn execute(&self, scope: &mut RunScope<'_>) -> Result<(), ActionError> {
        let addresses: Vec<String> = self
            .addresses
            .iter()
            .map(|a| scope.evaluate(a).trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if addresses.is_empty() {
            scope.error("email addresses evaluated to empty");
            return Ok(());
        }

        // subjects are a single line
        let subject = scope.evaluate(&self.subject).replace(['\r', '\n'], " ");
        let subject = subject.trim().to_string();
        if subject.is_empty() {
            scope.error("email subject evaluated to empty string");
            return Ok(());
        }
        let body = scope.evaluate_with(&self.body, TemplateOptions::default());

        let service = scope.services().email(&scope.assets())?;
        service.send(&addresses, &subject, &body)?;
        scope.log(EventPayload::EmailSent(EmailSent {
            addresses,
            subject,
            body,
        }));
        Ok(())
    }

    fn to_json(&self) -> Result<serde_json::Value, InterchangeError> {
        encode_typed(TYPE, self)
    }
}
