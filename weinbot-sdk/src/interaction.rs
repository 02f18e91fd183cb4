//! Raw interaction payloads as delivered to the interactions endpoint,
//! and their conversion into [`Event`]s.

use serde::Deserialize;

use crate::event::{Actor, Event, InteractionContext};

pub const TYPE_PING: u8 = 1;
pub const TYPE_APPLICATION_COMMAND: u8 = 2;
pub const TYPE_MESSAGE_COMPONENT: u8 = 3;
pub const TYPE_MODAL_SUBMIT: u8 = 5;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid interaction JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("interaction is missing `{0}`")]
    Missing(&'static str),
    #[error("unsupported interaction type {0}")]
    UnsupportedType(u8),
    #[error("invalid permission bitfield: {0}")]
    Permissions(String),
}

#[derive(Debug, Deserialize)]
pub struct RawInteraction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    pub data: Option<RawData>,
    pub guild_id: Option<String>,
    pub channel_id: Option<String>,
    pub member: Option<RawMember>,
    pub user: Option<RawUser>,
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct RawData {
    pub name: Option<String>,
    pub custom_id: Option<String>,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub components: Vec<RawRow>,
}

#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(default)]
    pub components: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
pub struct RawField {
    pub custom_id: String,
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawMember {
    pub user: Option<RawUser>,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Bitfield serialized as a decimal string.
    pub permissions: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawUser {
    pub id: String,
    pub username: String,
    pub global_name: Option<String>,
}

/// Decode a request body into an [`Event`].
pub fn decode(body: &[u8]) -> Result<Event, DecodeError> {
    let raw: RawInteraction = serde_json::from_slice(body)?;
    raw.into_event()
}

impl RawInteraction {
    pub fn into_event(self) -> Result<Event, DecodeError> {
        if self.kind == TYPE_PING {
            return Ok(Event::Ping);
        }
        if !matches!(
            self.kind,
            TYPE_APPLICATION_COMMAND | TYPE_MESSAGE_COMPONENT | TYPE_MODAL_SUBMIT
        ) {
            return Err(DecodeError::UnsupportedType(self.kind));
        }

        let actor = actor(self.member, self.user)?;
        let data = self.data.ok_or(DecodeError::Missing("data"))?;
        let ctx = InteractionContext {
            interaction_id: self.id,
            token: self.token,
            channel_id: self.channel_id,
            guild_id: self.guild_id,
            user: actor,
        };

        match self.kind {
            TYPE_APPLICATION_COMMAND => Ok(Event::Command {
                ctx,
                name: data.name.ok_or(DecodeError::Missing("data.name"))?,
            }),
            TYPE_MESSAGE_COMPONENT => Ok(Event::Component {
                ctx,
                custom_id: data.custom_id.ok_or(DecodeError::Missing("data.custom_id"))?,
                values: data.values,
            }),
            _ => {
                let custom_id = data.custom_id.ok_or(DecodeError::Missing("data.custom_id"))?;
                let fields = data
                    .components
                    .into_iter()
                    .flat_map(|row| row.components)
                    .map(|f| (f.custom_id, f.value.unwrap_or_default()))
                    .collect();
                Ok(Event::ModalSubmit {
                    ctx,
                    custom_id,
                    fields,
                })
            }
        }
    }
}

/// Guild interactions carry `member` (with nested user); DMs carry `user`.
fn actor(member: Option<RawMember>, user: Option<RawUser>) -> Result<Actor, DecodeError> {
    let (user, roles, permissions) = match member {
        Some(m) => {
            let perms = match m.permissions.as_deref() {
                Some(p) => p
                    .parse::<u64>()
                    .map_err(|_| DecodeError::Permissions(p.to_string()))?,
                None => 0,
            };
            (m.user.or(user), m.roles, perms)
        }
        None => (user, Vec::new(), 0),
    };
    let user = user.ok_or(DecodeError::Missing("user"))?;
    Ok(Actor {
        name: user.global_name.unwrap_or(user.username),
        id: user.id,
        roles,
        permissions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn member() -> serde_json::Value {
        json!({
            "user": { "id": "42", "username": "anna", "global_name": "Anna" },
            "roles": ["900"],
            "permissions": "40"
        })
    }

    #[test]
    fn ping() {
        let body = json!({ "id": "1", "type": 1, "token": "t" }).to_string();
        assert!(matches!(decode(body.as_bytes()).unwrap(), Event::Ping));
    }

    #[test]
    fn command_from_guild_member() {
        let body = json!({
            "id": "1", "type": 2, "token": "tok", "guild_id": "7", "channel_id": "8",
            "member": member(),
            "data": { "id": "55", "name": "bestellen", "type": 1 }
        })
        .to_string();
        match decode(body.as_bytes()).unwrap() {
            Event::Command { ctx, name } => {
                assert_eq!(name, "bestellen");
                assert_eq!(ctx.token, "tok");
                assert_eq!(ctx.channel_id.as_deref(), Some("8"));
                assert_eq!(ctx.user.id, "42");
                assert_eq!(ctx.user.name, "Anna");
                assert_eq!(ctx.user.permissions, 40);
                assert!(ctx.user.has_role("900"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn select_menu_values() {
        let body = json!({
            "id": "1", "type": 3, "token": "t", "channel_id": "8",
            "user": { "id": "42", "username": "anna" },
            "data": { "custom_id": "sel:42", "component_type": 3, "values": ["riesling", "rose"] }
        })
        .to_string();
        match decode(body.as_bytes()).unwrap() {
            Event::Component { ctx, custom_id, values } => {
                assert_eq!(custom_id, "sel:42");
                assert_eq!(values, vec!["riesling", "rose"]);
                assert_eq!(ctx.user.name, "anna");
                assert_eq!(ctx.user.permissions, 0);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn modal_fields_keep_order() {
        let body = json!({
            "id": "1", "type": 5, "token": "t",
            "member": member(),
            "data": {
                "custom_id": "qty:42",
                "components": [
                    { "type": 1, "components": [{ "type": 4, "custom_id": "riesling", "value": "3" }] },
                    { "type": 1, "components": [{ "type": 4, "custom_id": "rose", "value": "2" }] }
                ]
            }
        })
        .to_string();
        match decode(body.as_bytes()).unwrap() {
            Event::ModalSubmit { fields, .. } => {
                assert_eq!(
                    fields,
                    vec![
                        ("riesling".to_string(), "3".to_string()),
                        ("rose".to_string(), "2".to_string())
                    ]
                );
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn rejects_autocomplete_and_missing_user() {
        let body = json!({ "id": "1", "type": 4, "token": "t", "data": {} }).to_string();
        assert!(matches!(
            decode(body.as_bytes()),
            Err(DecodeError::UnsupportedType(4))
        ));

        let body = json!({ "id": "1", "type": 2, "token": "t", "data": { "name": "x" } }).to_string();
        assert!(matches!(decode(body.as_bytes()), Err(DecodeError::Missing("user"))));
    }
}
