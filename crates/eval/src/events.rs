//! Events: the ordered record of everything a session did.
//!
//! Every event is a JSON object with a `type` discriminant, a `created_on`
//! timestamp and, when it was produced while visiting a node, a `step_uuid`.
//! Bodies are plain structs so they can be decoded through a [`Registry`].

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use switchboard_interchange::{decode_typed, encode_typed, InterchangeError, Registry};
use time::OffsetDateTime;

use crate::assets::AssetRef;
use crate::dates;
use crate::services::{CallStatus, Ticket, WebhookCall};

/// A message sent to or received from a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Msg {
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<AssetRef>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quick_replies: Vec<String>,
}

impl Msg {
    pub fn text(uuid: impl Into<String>, text: impl Into<String>) -> Self {
        Msg {
            uuid: uuid.into(),
            urn: None,
            channel: None,
            text: text.into(),
            attachments: Vec::new(),
            quick_replies: Vec::new(),
        }
    }
}

// ── Event bodies ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCreated {
    pub msg: Msg,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgReceived {
    pub msg: Msg,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgWait {}

/// A non-fatal problem, e.g. a template that failed to evaluate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub text: String,
}

/// A fatal problem that ended a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookCalled {
    pub url: String,
    pub method: String,
    pub status: CallStatus,
    pub status_code: u16,
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resthook: Option<String>,
    pub call: WebhookCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResultChanged {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailSent {
    pub addresses: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// A call to an external service other than a webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCalled {
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<AssetRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketOpened {
    pub ticket: Ticket,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirtimeTransferred {
    pub sender: String,
    pub recipient: String,
    pub currency: String,
    #[serde(with = "crate::numeric::json_number")]
    pub desired_amount: Decimal,
    #[serde(with = "crate::numeric::json_number")]
    pub actual_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEntered {
    pub flow: AssetRef,
    pub parent_run_uuid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactNameChanged {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRef {
    pub key: String,
    pub name: String,
}

/// `value` is absent when the field was cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactFieldChanged {
    pub field: FieldRef,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactLanguageChanged {
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactUrnsChanged {
    pub urns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactGroupsChanged {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups_added: Vec<AssetRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups_removed: Vec<AssetRef>,
}

// ── Event ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    MsgCreated(MsgCreated),
    MsgReceived(MsgReceived),
    MsgWait(MsgWait),
    Error(ErrorEvent),
    Failure(Failure),
    WebhookCalled(WebhookCalled),
    RunResultChanged(RunResultChanged),
    EmailSent(EmailSent),
    ServiceCalled(ServiceCalled),
    TicketOpened(TicketOpened),
    AirtimeTransferred(AirtimeTransferred),
    FlowEntered(FlowEntered),
    ContactNameChanged(ContactNameChanged),
    ContactFieldChanged(ContactFieldChanged),
    ContactLanguageChanged(ContactLanguageChanged),
    ContactUrnsChanged(ContactUrnsChanged),
    ContactGroupsChanged(ContactGroupsChanged),
}

impl EventPayload {
    pub fn type_name(&self) -> &'static str {
        match self {
            EventPayload::MsgCreated(_) => "msg_created",
            EventPayload::MsgReceived(_) => "msg_received",
            EventPayload::MsgWait(_) => "msg_wait",
            EventPayload::Error(_) => "error",
            EventPayload::Failure(_) => "failure",
            EventPayload::WebhookCalled(_) => "webhook_called",
            EventPayload::RunResultChanged(_) => "run_result_changed",
            EventPayload::EmailSent(_) => "email_sent",
            EventPayload::ServiceCalled(_) => "service_called",
            EventPayload::TicketOpened(_) => "ticket_opened",
            EventPayload::AirtimeTransferred(_) => "airtime_transferred",
            EventPayload::FlowEntered(_) => "flow_entered",
            EventPayload::ContactNameChanged(_) => "contact_name_changed",
            EventPayload::ContactFieldChanged(_) => "contact_field_changed",
            EventPayload::ContactLanguageChanged(_) => "contact_language_changed",
            EventPayload::ContactUrnsChanged(_) => "contact_urns_changed",
            EventPayload::ContactGroupsChanged(_) => "contact_groups_changed",
        }
    }

    fn encode_body(&self) -> Result<serde_json::Value, InterchangeError> {
        let name = self.type_name();
        match self {
            EventPayload::MsgCreated(b) => encode_typed(name, b),
            EventPayload::MsgReceived(b) => encode_typed(name, b),
            EventPayload::MsgWait(b) => encode_typed(name, b),
            EventPayload::Error(b) => encode_typed(name, b),
            EventPayload::Failure(b) => encode_typed(name, b),
            EventPayload::WebhookCalled(b) => encode_typed(name, b),
            EventPayload::RunResultChanged(b) => encode_typed(name, b),
            EventPayload::EmailSent(b) => encode_typed(name, b),
            EventPayload::ServiceCalled(b) => encode_typed(name, b),
            EventPayload::TicketOpened(b) => encode_typed(name, b),
            EventPayload::AirtimeTransferred(b) => encode_typed(name, b),
            EventPayload::FlowEntered(b) => encode_typed(name, b),
            EventPayload::ContactNameChanged(b) => encode_typed(name, b),
            EventPayload::ContactFieldChanged(b) => encode_typed(name, b),
            EventPayload::ContactLanguageChanged(b) => encode_typed(name, b),
            EventPayload::ContactUrnsChanged(b) => encode_typed(name, b),
            EventPayload::ContactGroupsChanged(b) => encode_typed(name, b),
        }
    }
}

/// Shorthand for an `error` event payload.
pub fn error(text: impl Into<String>) -> EventPayload {
    EventPayload::Error(ErrorEvent { text: text.into() })
}

/// Shorthand for a `failure` event payload.
pub fn failure(text: impl Into<String>) -> EventPayload {
    EventPayload::Failure(Failure { text: text.into() })
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub created_on: OffsetDateTime,
    pub step_uuid: Option<String>,
    pub payload: EventPayload,
}

#[derive(Serialize, Deserialize)]
struct EventHeader {
    #[serde(with = "dates::rfc3339")]
    created_on: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    step_uuid: Option<String>,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Event {
            created_on: OffsetDateTime::now_utc(),
            step_uuid: None,
            payload,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.payload.type_name()
    }

    pub fn to_json(&self) -> Result<serde_json::Value, InterchangeError> {
        let mut data = self.payload.encode_body()?;
        let header = encode_typed(
            self.type_name(),
            &EventHeader {
                created_on: self.created_on,
                step_uuid: self.step_uuid.clone(),
            },
        )?;
        if let (Some(obj), serde_json::Value::Object(header)) = (data.as_object_mut(), header) {
            obj.extend(header);
        }
        Ok(data)
    }

    /// Decodes an event through `registry`.
    pub fn read(
        data: &serde_json::Value,
        registry: &Registry<EventPayload>,
    ) -> Result<Event, InterchangeError> {
        let payload = registry.read(data)?;
        let header: EventHeader = decode_typed(data, "event")?;
        Ok(Event {
            created_on: header.created_on,
            step_uuid: header.step_uuid,
            payload,
        })
    }
}

fn body<S: DeserializeOwned>(data: &serde_json::Value) -> Result<S, InterchangeError> {
    decode_typed(data, "event")
}

/// The decoding table for every event type.
pub fn registry() -> Registry<EventPayload> {
    Registry::new("event")
        .register("msg_created", |d| body(d).map(EventPayload::MsgCreated))
        .register("msg_received", |d| body(d).map(EventPayload::MsgReceived))
        .register("msg_wait", |d| body(d).map(EventPayload::MsgWait))
        .register("error", |d| body(d).map(EventPayload::Error))
        .register("failure", |d| body(d).map(EventPayload::Failure))
        .register("webhook_called", |d| body(d).map(EventPayload::WebhookCalled))
        .register("run_result_changed", |d| {
            body(d).map(EventPayload::RunResultChanged)
        })
        .register("email_sent", |d| body(d).map(EventPayload::EmailSent))
        .register("service_called", |d| body(d).map(EventPayload::ServiceCalled))
        .register("ticket_opened", |d| body(d).map(EventPayload::TicketOpened))
        .register("airtime_transferred", |d| {
            body(d).map(EventPayload::AirtimeTransferred)
        })
        .register("flow_entered", |d| body(d).map(EventPayload::FlowEntered))
        .register("contact_name_changed", |d| {
            body(d).map(EventPayload::ContactNameChanged)
        })
        .register("contact_field_changed", |d| {
            body(d).map(EventPayload::ContactFieldChanged)
        })
        .register("contact_language_changed", |d| {
            body(d).map(EventPayload::ContactLanguageChanged)
        })
        .register("contact_urns_changed", |d| {
            body(d).map(EventPayload::ContactUrnsChanged)
        })
        .register("contact_groups_changed", |d| {
            body(d).map(EventPayload::ContactGroupsChanged)
        })
}
