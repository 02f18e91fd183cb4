//! Staff-channel posts and customer direct messages.

use weinbot_sdk::client::RestError;
use weinbot_sdk::component::{ActionRow, Button, ButtonStyle, Embed, MessagePayload};

use crate::action::Action;
use crate::catalog::Catalog;
use crate::order::{Order, OrderStatus};
use crate::platform::Platform;

const COLOR_PENDING: u32 = 0xF1C40F;
const COLOR_ACCEPTED: u32 = 0x2ECC71;
const COLOR_REJECTED: u32 = 0xE74C3C;

/// Whether a customer notification reached the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryResult {
    Delivered,
    /// The platform refused: the user does not accept DMs from the bot.
    Blocked,
    /// The attempt failed for another reason; the customer may or may not know.
    Unknown,
}

impl DeliveryResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryResult::Delivered => "delivered",
            DeliveryResult::Blocked => "blocked",
            DeliveryResult::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "delivered" => Some(DeliveryResult::Delivered),
            "blocked" => Some(DeliveryResult::Blocked),
            "unknown" => Some(DeliveryResult::Unknown),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DeliveryResult::Delivered => "✅ benachrichtigt",
            DeliveryResult::Blocked => "⚠️ nicht erreichbar (DMs gesperrt)",
            DeliveryResult::Unknown => "⚠️ Zustellung unklar",
        }
    }

    fn from_error(err: &RestError) -> Self {
        if err.is_dm_blocked() {
            DeliveryResult::Blocked
        } else {
            DeliveryResult::Unknown
        }
    }
}

/// Send a DM. Never fails: the outcome is reported as a [`DeliveryResult`].
pub async fn direct_message<P: Platform>(
    platform: &P,
    user_id: &str,
    payload: &MessagePayload,
) -> DeliveryResult {
    let channel = match platform.open_dm(user_id).await {
        Ok(channel) => channel,
        Err(e) => {
            let result = DeliveryResult::from_error(&e);
            tracing::warn!(user = user_id, error = %e, result = result.as_str(), "Could not open DM channel");
            return result;
        }
    };
    match platform.post_message(&channel, payload).await {
        Ok(_) => DeliveryResult::Delivered,
        Err(e) => {
            let result = DeliveryResult::from_error(&e);
            tracing::warn!(user = user_id, error = %e, result = result.as_str(), "Could not deliver DM");
            result
        }
    }
}

/// One line per item, in order: `3× Spätburgunder`.
pub fn item_lines(order: &Order, catalog: &Catalog) -> String {
    order
        .items
        .iter()
        .map(|i| format!("{}× {}", i.quantity, catalog.display_name(&i.product_key)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The staff-channel post for an order, rendered from its current state.
/// Controls are disabled once the order is resolved.
pub fn staff_message(order: &Order, catalog: &Catalog) -> MessagePayload {
    let color = match order.status {
        OrderStatus::Pending => COLOR_PENDING,
        OrderStatus::Accepted => COLOR_ACCEPTED,
        OrderStatus::Rejected => COLOR_REJECTED,
    };
    let mut embed = Embed::new(format!("Bestellung #{}", order.number))
        .description(format!("Von <@{}>", order.requester_id))
        .color(color)
        .field("Positionen", item_lines(order, catalog), false)
        .field("Status", order.status.label(), true)
        .footer(format!("{} Flaschen", order.total_bottles()))
        .timestamp(order.created_at.to_rfc3339());

    if let Some(resolver) = &order.resolved_by {
        embed = embed.field("Bearbeitet von", format!("<@{resolver}>"), true);
    }
    if let Some(reason) = &order.reject_reason {
        embed = embed.field("Grund", reason.clone(), false);
    }
    if let Some(notice) = order.customer_notice {
        embed = embed.field("Kunde", notice.label(), true);
    }

    let resolved = order.status.is_terminal();
    MessagePayload::default().embed(embed).row(ActionRow::buttons(vec![
        Button::new(
            ButtonStyle::Success,
            "Annehmen",
            Action::Accept { order: order.number }.encode(),
        )
        .disabled(resolved),
        Button::new(
            ButtonStyle::Danger,
            "Ablehnen",
            Action::Reject { order: order.number }.encode(),
        )
        .disabled(resolved),
    ]))
}

pub fn accepted_notice(order: &Order, catalog: &Catalog) -> MessagePayload {
    MessagePayload::text(format!(
        "🍷 Deine Bestellung #{} wurde angenommen!\n{}",
        order.number,
        item_lines(order, catalog)
    ))
}

pub fn rejected_notice(order: &Order, catalog: &Catalog) -> MessagePayload {
    let reason = order.reject_reason.as_deref().unwrap_or("-");
    MessagePayload::text(format!(
        "Deine Bestellung #{} wurde leider abgelehnt.\nGrund: {reason}\n{}",
        order.number,
        item_lines(order, catalog)
    ))
}
