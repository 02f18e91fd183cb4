//! Staff side of the order workflow: accept, reject with a reason.

use std::sync::Arc;

use chrono::Utc;
use weinbot_sdk::component::{Modal, TextInput, TextInputStyle};
use weinbot_sdk::event::{Actor, InteractionContext, permissions};
use weinbot_sdk::response::InteractionResponse;

use crate::action::Action;
use crate::bot::Bot;
use crate::error::{FlowError, FlowResult};
use crate::notify::{self, DeliveryResult};
use crate::order::{Order, OrderNumber, OrderStatus, Verdict};
use crate::platform::Platform;
use crate::store::ResolveOutcome;

/// Form field holding the rejection reason.
pub const REASON_FIELD: &str = "reason";
const MAX_REASON_LEN: u16 = 500;

impl<P: Platform> Bot<P> {
    /// Staff role, the configured permission bits, or administrator.
    pub fn is_staff(&self, user: &Actor) -> bool {
        self.config
            .staff_role
            .as_deref()
            .is_some_and(|role| user.has_role(role))
            || user.has_permission(self.config.staff_permission)
            || user.has_permission(permissions::ADMINISTRATOR)
    }

    fn ensure_staff(&self, ctx: &InteractionContext) -> FlowResult<()> {
        if self.is_staff(&ctx.user) {
            Ok(())
        } else {
            tracing::warn!(user = %ctx.user.id, "Non-staff tried to resolve an order");
            Err(FlowError::unauthorized("Nur das Team darf Bestellungen bearbeiten."))
        }
    }

    /// Current order, refused unless still pending.
    fn pending_order(&self, number: OrderNumber) -> FlowResult<Order> {
        let order = self.store.get(number)?.ok_or(FlowError::NotFound(number))?;
        if order.status.is_terminal() {
            return Err(FlowError::AlreadyResolved {
                order: number,
                status: order.status,
            });
        }
        Ok(order)
    }

    fn apply_verdict(
        &self,
        ctx: &InteractionContext,
        number: OrderNumber,
        verdict: &Verdict,
    ) -> FlowResult<Order> {
        match self.store.resolve(number, verdict, &ctx.user.id, Utc::now())? {
            ResolveOutcome::Resolved(order) => {
                tracing::info!(
                    order = %number,
                    status = %order.status,
                    staff = %ctx.user.id,
                    "Order resolved"
                );
                Ok(order)
            }
            ResolveOutcome::AlreadyResolved(status) => {
                Err(FlowError::AlreadyResolved { order: number, status })
            }
            ResolveOutcome::NotFound => Err(FlowError::NotFound(number)),
        }
    }

    /// DM the customer, record whether it arrived and bring the staff post
    /// up to date. Runs after the interaction has been answered.
    fn spawn_customer_notice(&self, mut order: Order) {
        let notice = match order.status {
            OrderStatus::Rejected => notify::rejected_notice(&order, &self.catalog),
            _ => notify::accepted_notice(&order, &self.catalog),
        };
        let platform = self.platform.clone();
        let store = Arc::clone(&self.store);
        let catalog = Arc::clone(&self.catalog);

        tokio::spawn(async move {
            let number = order.number;
            let result = notify::direct_message(&platform, &order.requester_id, &notice).await;
            if result != DeliveryResult::Delivered {
                tracing::warn!(
                    order = %number,
                    user = %order.requester_id,
                    result = result.as_str(),
                    "Customer was not notified"
                );
            }
            if let Err(e) = store.record_delivery(number, result) {
                tracing::error!(order = %number, error = %e, "Failed to record customer notice");
            }
            order.customer_notice = Some(result);

            let Some(msg) = &order.staff_message else {
                tracing::warn!(order = %number, "Resolved order has no staff message to update");
                return;
            };
            let post = notify::staff_message(&order, &catalog);
            if let Err(e) = platform
                .edit_message(&msg.channel_id, &msg.message_id, &post)
                .await
            {
                tracing::warn!(order = %number, error = %e, "Failed to update staff message");
            }
        });
    }

    /// Commits the status and answers with the updated staff post at once;
    /// the customer is notified afterwards.
    pub(crate) fn accept_order(
        &self,
        ctx: &InteractionContext,
        number: OrderNumber,
    ) -> FlowResult<InteractionResponse> {
        self.ensure_staff(ctx)?;
        self.pending_order(number)?;
        let order = self.apply_verdict(ctx, number, &Verdict::Accept)?;
        let post = notify::staff_message(&order, &self.catalog);
        self.spawn_customer_notice(order);
        Ok(InteractionResponse::UpdateMessage(post))
    }

    pub(crate) fn reject_order(
        &self,
        ctx: &InteractionContext,
        number: OrderNumber,
    ) -> FlowResult<InteractionResponse> {
        self.ensure_staff(ctx)?;
        self.pending_order(number)?;
        let modal = Modal::new(
            Action::RejectReason { order: number }.encode(),
            format!("Bestellung #{number} ablehnen"),
        )
        .input(
            TextInput::new(TextInputStyle::Paragraph, "Grund", REASON_FIELD)
                .length(1, MAX_REASON_LEN),
        );
        Ok(InteractionResponse::Modal(modal))
    }

    pub(crate) fn reject_with_reason(
        &self,
        ctx: &InteractionContext,
        number: OrderNumber,
        fields: &[(String, String)],
    ) -> FlowResult<InteractionResponse> {
        // The form may have been opened before the user lost staff rights.
        self.ensure_staff(ctx)?;
        let reason = fields
            .iter()
            .find(|(id, _)| id == REASON_FIELD)
            .map(|(_, value)| value.trim())
            .unwrap_or("");
        if reason.is_empty() {
            return Err(FlowError::validation("Bitte gib einen Grund für die Ablehnung an."));
        }

        let verdict = Verdict::Reject {
            reason: reason.to_string(),
        };
        let order = self.apply_verdict(ctx, number, &verdict)?;
        self.spawn_customer_notice(order);

        Ok(InteractionResponse::ephemeral(format!(
            "Bestellung #{number} abgelehnt. Der Kunde wird benachrichtigt."
        )))
    }
}
