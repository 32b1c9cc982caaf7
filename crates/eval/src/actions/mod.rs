//! Actions: the typed steps a node performs before routing.
//!
//! Every action is a plain serde struct implementing [`Action`]. Templates
//! are evaluated first and each evaluated field is checked; problems are
//! logged as `error` events and the action returns early without failing
//! the run. An `Err` from [`Action::execute`] is also turned into an error
//! event by the driver.

mod airtime;
mod classifier;
mod contact;
mod email;
mod enter_flow;
mod send_msg;
mod set_run_result;
mod ticket;
mod webhook;

pub use airtime::TransferAirtimeAction;
pub use classifier::CallClassifierAction;
pub use contact::{
    AddContactGroupsAction, AddContactUrnAction, RemoveContactGroupsAction,
    SetContactFieldAction, SetContactLanguageAction, SetContactNameAction,
};
pub use email::SendEmailAction;
pub use enter_flow::{EnterFlowAction, ENTER_FLOW};
pub use send_msg::SendMsgAction;
pub use set_run_result::SetRunResultAction;
pub use ticket::OpenTicketAction;
pub use webhook::{CallResthookAction, CallWebhookAction};

use std::fmt;

use serde::de::DeserializeOwned;
use switchboard_interchange::{decode_typed, InterchangeError, Registry};

use crate::flow::RunScope;
use crate::services::ServiceError;
use crate::types::ValueError;

/// Category of results saved by actions that succeeded.
pub const CATEGORY_SUCCESS: &str = "Success";
/// Category of results saved by actions that failed.
pub const CATEGORY_FAILURE: &str = "Failure";

/// Errors an action can return from `execute`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Value(#[from] ValueError),
    #[error("{0}")]
    Invalid(String),
}

/// A static problem with an action definition, found when its flow is built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {type_name} action '{uuid}': {message}")]
pub struct ValidationError {
    pub uuid: String,
    pub type_name: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(action: &dyn Action, message: impl Into<String>) -> Self {
        ValidationError {
            uuid: action.uuid().to_string(),
            type_name: action.type_name(),
            message: message.into(),
        }
    }
}

pub trait Action: Send + Sync + fmt::Debug {
    fn uuid(&self) -> &str;

    fn type_name(&self) -> &'static str;

    /// Checks the definition itself, before anything is evaluated.
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn execute(&self, scope: &mut RunScope<'_>) -> Result<(), ActionError>;

    fn to_json(&self) -> Result<serde_json::Value, InterchangeError>;
}

fn decode<A>(data: &serde_json::Value) -> Result<Box<dyn Action>, InterchangeError>
where
    A: Action + DeserializeOwned + 'static,
{
    let action: A = decode_typed(data, "action")?;
    Ok(Box::new(action))
}

/// The decoding table for every action type.
pub fn registry() -> Registry<Box<dyn Action>> {
    Registry::new("action")
        .register(send_msg::TYPE, decode::<SendMsgAction>)
        .register(contact::SET_CONTACT_NAME, decode::<SetContactNameAction>)
        .register(contact::SET_CONTACT_FIELD, decode::<SetContactFieldAction>)
        .register(contact::SET_CONTACT_LANGUAGE, decode::<SetContactLanguageAction>)
        .register(contact::ADD_CONTACT_URN, decode::<AddContactUrnAction>)
        .register(contact::ADD_CONTACT_GROUPS, decode::<AddContactGroupsAction>)
        .register(contact::REMOVE_CONTACT_GROUPS, decode::<RemoveContactGroupsAction>)
        .register(set_run_result::TYPE, decode::<SetRunResultAction>)
        .register(webhook::CALL_WEBHOOK, decode::<CallWebhookAction>)
        .register(webhook::CALL_RESTHOOK, decode::<CallResthookAction>)
        .register(email::TYPE, decode::<SendEmailAction>)
        .register(classifier::TYPE, decode::<CallClassifierAction>)
        .register(ticket::TYPE, decode::<OpenTicketAction>)
        .register(airtime::TYPE, decode::<TransferAirtimeAction>)
        .register(ENTER_FLOW, decode::<EnterFlowAction>)
}
