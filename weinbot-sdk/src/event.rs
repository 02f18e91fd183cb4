//! Events decoded from incoming interactions for the bot layer to consume.

/// Permission bits carried on guild members.
pub mod permissions {
    pub const ADMINISTRATOR: u64 = 1 << 3;
    pub const MANAGE_GUILD: u64 = 1 << 5;
}

/// Events that the SDK emits to the consumer (bot, test harness, etc.)
#[derive(Debug, Clone)]
pub enum Event {
    /// Endpoint health check from the platform. Must be answered with PONG.
    Ping,

    /// An application (slash) command was invoked.
    Command {
        ctx: InteractionContext,
        name: String,
    },

    /// A button was pressed or a select menu changed.
    /// `values` is empty for buttons.
    Component {
        ctx: InteractionContext,
        custom_id: String,
        values: Vec<String>,
    },

    /// A modal form was submitted. `fields` keeps the form order.
    ModalSubmit {
        ctx: InteractionContext,
        custom_id: String,
        fields: Vec<(String, String)>,
    },
}

impl Event {
    pub fn context(&self) -> Option<&InteractionContext> {
        match self {
            Event::Ping => None,
            Event::Command { ctx, .. }
            | Event::Component { ctx, .. }
            | Event::ModalSubmit { ctx, .. } => Some(ctx),
        }
    }
}

/// Who acted, where, and how to answer them later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionContext {
    pub interaction_id: String,
    /// Continuation token, valid for 15 minutes; used to edit the original response.
    pub token: String,
    pub channel_id: Option<String>,
    pub guild_id: Option<String>,
    pub user: Actor,
}

/// The user behind an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Actor {
    pub id: String,
    pub name: String,
    /// Role ids (guild interactions only).
    pub roles: Vec<String>,
    /// Resolved permission bitfield in the interaction's channel.
    pub permissions: u64,
}

impl Actor {
    pub fn has_permission(&self, bits: u64) -> bool {
        bits != 0 && self.permissions & bits == bits
    }

    pub fn has_role(&self, role_id: &str) -> bool {
        self.roles.iter().any(|r| r == role_id)
    }

    /// Discord mention markup for this user.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}
