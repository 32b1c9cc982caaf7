use serde::{Deserialize, Serialize};
use switchboard_interchange::{encode_typed, InterchangeError};

use super::{Action, ActionError};
use crate::assets::AssetRef;
use crate::events::{EventPayload, Msg, MsgCreated};
use crate::flow::RunScope;

pub(super) const TYPE: &str = "send_msg";

/// Sends a message to the contact. Text, attachments and quick replies are
/// templates. The message goes to the first URN that has a channel able to
/// send on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMsgAction {
    pub uuid: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quick_replies: Vec<String>,
}

impl Action for SendMsgAction {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn type_name(&self) -> &'static str {
        TYPE
    }

    fn execute(&self, scope: &mut RunScope<'_>) -> Result<(), ActionError> {
        let text = scope.evaluate(&self.text);
        let attachments: Vec<String> = self
            .attachments
            .iter()
            .map(|a| scope.evaluate(a).trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        let quick_replies: Vec<String> = self
            .quick_replies
            .iter()
            .map(|q| scope.evaluate(q))
            .filter(|q| !q.trim().is_empty())
            .collect();

        if text.trim().is_empty() && attachments.is_empty() {
            scope.error("message text evaluated to empty string");
            return Ok(());
        }

        let assets = scope.assets();
        let destination = scope.contact().urns.iter().find_map(|urn| {
            let channel = match &urn.channel {
                Some(channel) => Some(channel.clone()),
                None => assets
                    .channel_for_scheme(&urn.scheme)
                    .map(|c| AssetRef::new(c.uuid.clone(), c.name.clone())),
            };
            channel.map(|c| (urn.to_raw(false), c))
        });

        let (urn, channel) = match destination {
            Some((urn, channel)) => (Some(urn), Some(channel)),
            None => (None, None),
        };
        scope.log(EventPayload::MsgCreated(MsgCreated {
            msg: Msg {
                uuid: uuid::Uuid::new_v4().to_string(),
                urn,
                channel,
                text,
                attachments,
                quick_replies,
            },
        }));
        Ok(())
    }

    fn to_json(&self) -> Result<serde_json::Value, InterchangeError> {
        encode_typed(TYPE, self)
    }
}
