//! Interaction callback bodies, returned synchronously from the endpoint.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::component::{MessagePayload, Modal};

/// What the bot answers to one interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionResponse {
    /// Answer to a PING.
    Pong,
    /// Post a new message in the channel (possibly ephemeral).
    Message(MessagePayload),
    /// Edit the message the component is attached to.
    UpdateMessage(MessagePayload),
    /// Open a form.
    Modal(Modal),
}

impl InteractionResponse {
    pub fn ephemeral(text: impl Into<String>) -> Self {
        InteractionResponse::Message(MessagePayload::text(text).ephemeral())
    }

    /// Wire callback type.
    pub fn kind(&self) -> u8 {
        match self {
            InteractionResponse::Pong => 1,
            InteractionResponse::Message(_) => 4,
            InteractionResponse::UpdateMessage(_) => 7,
            InteractionResponse::Modal(_) => 9,
        }
    }

    /// The message body, for responses that carry one.
    pub fn payload(&self) -> Option<&MessagePayload> {
        match self {
            InteractionResponse::Message(p) | InteractionResponse::UpdateMessage(p) => Some(p),
            _ => None,
        }
    }
}

impl Serialize for InteractionResponse {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut st = s.serialize_struct("InteractionResponse", 2)?;
        st.serialize_field("type", &self.kind())?;
        match self {
            InteractionResponse::Message(p) | InteractionResponse::UpdateMessage(p) => {
                st.serialize_field("data", p)?;
            }
            InteractionResponse::Modal(m) => st.serialize_field("data", m)?,
            InteractionResponse::Pong => st.skip_field("data")?,
        }
        st.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_shapes() {
        assert_eq!(serde_json::to_value(InteractionResponse::Pong).unwrap(), json!({ "type": 1 }));
        assert_eq!(
            serde_json::to_value(InteractionResponse::UpdateMessage(MessagePayload::text("fertig"))).unwrap(),
            json!({ "type": 7, "data": { "content": "fertig", "components": [] } })
        );
        assert_eq!(
            serde_json::to_value(InteractionResponse::ephemeral("nope")).unwrap(),
            json!({ "type": 4, "data": { "content": "nope", "components": [], "flags": 64 } })
        );
        let modal = Modal::new("reason:12345", "Ablehnen");
        assert_eq!(
            serde_json::to_value(InteractionResponse::Modal(modal)).unwrap(),
            json!({ "type": 9, "data": { "custom_id": "reason:12345", "title": "Ablehnen", "components": [] } })
        );
    }
}
