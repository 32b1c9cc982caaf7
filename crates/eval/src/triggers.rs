//! Triggers start sessions; resumes wake up waiting ones.
//!
//! Both carry the contact or message as raw JSON. The contact can only be
//! read once the session's assets are known, so decoding is two-stage: the
//! registry produces the envelope, the session reads the contact from it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use switchboard_interchange::{decode_typed, encode_typed, InterchangeError, Registry};
use time::OffsetDateTime;

use crate::assets::AssetRef;
use crate::context::{Capability, Item, Queryable};
use crate::dates;
use crate::envs::Environment;
use crate::events::Msg;
use crate::types::{Value, ValueError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualTrigger {
    pub flow: AssetRef,
    pub contact: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    #[serde(with = "dates::rfc3339")]
    pub triggered_on: OffsetDateTime,
}

/// Started by an incoming message, which becomes the session's first input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MsgTrigger {
    pub flow: AssetRef,
    pub contact: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    pub msg: Msg,
    #[serde(with = "dates::rfc3339")]
    pub triggered_on: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    Manual(ManualTrigger),
    Msg(MsgTrigger),
}

impl Trigger {
    pub fn type_name(&self) -> &'static str {
        match self {
            Trigger::Manual(_) => "manual",
            Trigger::Msg(_) => "msg",
        }
    }

    pub fn flow(&self) -> &AssetRef {
        match self {
            Trigger::Manual(t) => &t.flow,
            Trigger::Msg(t) => &t.flow,
        }
    }

    pub fn contact(&self) -> &serde_json::Value {
        match self {
            Trigger::Manual(t) => &t.contact,
            Trigger::Msg(t) => &t.contact,
        }
    }

    pub fn environment(&self) -> Option<&Environment> {
        match self {
            Trigger::Manual(t) => t.environment.as_ref(),
            Trigger::Msg(t) => t.environment.as_ref(),
        }
    }

    pub fn params(&self) -> Option<&serde_json::Value> {
        match self {
            Trigger::Manual(t) => t.params.as_ref(),
            Trigger::Msg(_) => None,
        }
    }

    pub fn msg(&self) -> Option<&Msg> {
        match self {
            Trigger::Manual(_) => None,
            Trigger::Msg(t) => Some(&t.msg),
        }
    }

    pub fn triggered_on(&self) -> OffsetDateTime {
        match self {
            Trigger::Manual(t) => t.triggered_on,
            Trigger::Msg(t) => t.triggered_on,
        }
    }

    pub fn to_json(&self) -> Result<serde_json::Value, InterchangeError> {
        match self {
            Trigger::Manual(t) => encode_typed(self.type_name(), t),
            Trigger::Msg(t) => encode_typed(self.type_name(), t),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MsgResume {
    pub msg: Msg,
    #[serde(with = "dates::rfc3339")]
    pub resumed_on: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resume {
    Msg(MsgResume),
}

impl Resume {
    pub fn type_name(&self) -> &'static str {
        match self {
            Resume::Msg(_) => "msg",
        }
    }

    pub fn to_json(&self) -> Result<serde_json::Value, InterchangeError> {
        match self {
            Resume::Msg(r) => encode_typed(self.type_name(), r),
        }
    }
}

fn trigger_body<S: DeserializeOwned>(data: &serde_json::Value) -> Result<S, InterchangeError> {
    decode_typed(data, "trigger")
}

fn resume_body<S: DeserializeOwned>(data: &serde_json::Value) -> Result<S, InterchangeError> {
    decode_typed(data, "resume")
}

pub fn registry() -> Registry<Trigger> {
    Registry::new("trigger")
        .register("manual", |d| trigger_body(d).map(Trigger::Manual))
        .register("msg", |d| trigger_body(d).map(Trigger::Msg))
}

pub fn resume_registry() -> Registry<Resume> {
    Registry::new("resume").register("msg", |d| resume_body(d).map(Resume::Msg))
}

// ──────────────────────────────────────────────
// Inputs
// ──────────────────────────────────────────────

/// The most recent message a session received.
#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    pub msg: Msg,
    pub created_on: OffsetDateTime,
}

/// `@input`.
pub struct InputContext<'a>(pub &'a Input);

impl Queryable for InputContext<'_> {
    fn describe(&self) -> String {
        "input".to_string()
    }

    fn capability(&self) -> Capability {
        Capability::Keyed
    }

    fn resolve(&self, key: &str) -> Result<Item<'_>, ValueError> {
        let msg = &self.0.msg;
        Ok(match key {
            "uuid" => Item::text(msg.uuid.clone()),
            "type" => Item::text("msg"),
            "text" => Item::text(msg.text.clone()),
            "urn" => Item::text(msg.urn.clone().unwrap_or_default()),
            "channel" => Item::value(match &msg.channel {
                Some(c) => Value::dict([
                    ("uuid", Value::text(c.uuid.clone())),
                    ("name", Value::text(c.name.clone())),
                ]),
                None => Value::text(""),
            }),
            "attachments" => Item::value(Value::Array(
                msg.attachments.iter().cloned().map(Value::Text).collect(),
            )),
            "created_on" => Item::value(Value::DateTime(self.0.created_on)),
            _ => {
                return Err(ValueError::NoSuchKey {
                    container: "input".to_string(),
                    key: key.to_string(),
                })
            }
        })
    }

    fn atomize(&self) -> Option<Value> {
        Some(Value::text(self.0.msg.text.clone()))
    }
}

/// `@trigger`.
pub struct TriggerContext<'a>(pub &'a Trigger);

impl Queryable for TriggerContext<'_> {
    fn describe(&self) -> String {
        "trigger".to_string()
    }

    fn capability(&self) -> Capability {
        Capability::Keyed
    }

    fn resolve(&self, key: &str) -> Result<Item<'_>, ValueError> {
        let trigger = self.0;
        Ok(match key {
            "type" => Item::text(trigger.type_name()),
            "params" => Item::value(
                trigger
                    .params()
                    .map(Value::from_json)
                    .unwrap_or_else(|| Value::dict::<String>([])),
            ),
            "flow" => Item::value(Value::dict([
                ("uuid", Value::text(trigger.flow().uuid.clone())),
                ("name", Value::text(trigger.flow().name.clone())),
            ])),
            _ => {
                return Err(ValueError::NoSuchKey {
                    container: "trigger".to_string(),
                    key: key.to_string(),
                })
            }
        })
    }

    fn atomize(&self) -> Option<Value> {
        Some(Value::text(self.0.type_name()))
    }
}
