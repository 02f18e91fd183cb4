//! Staff notifications: the post itself, and the relay for posts that did
//! not make it at submit time.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use weinbot_sdk::client::RestError;
use weinbot_sdk::component::MessagePayload;

use crate::bot::Bot;
use crate::notify;
use crate::order::{OrderNumber, StaffMessageRef};
use crate::platform::Platform;
use crate::store::OrderStore;

/// Entries handled per relay run.
const BATCH: usize = 50;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayReport {
    pub posted: usize,
    pub failed: usize,
}

/// Post an order to the staff channel and settle its outbox row. The caller
/// must hold the row's claim.
///
/// Once the platform accepted the post, this reports success even if the
/// message reference cannot be stored: staff have the order either way.
pub(crate) async fn post_to_staff<P: Platform>(
    platform: &P,
    store: &OrderStore,
    channel: &str,
    number: OrderNumber,
    post: &MessagePayload,
) -> Result<(), RestError> {
    match platform.post_message(channel, post).await {
        Ok(msg) => {
            let msg = StaffMessageRef {
                channel_id: msg.channel_id,
                message_id: msg.id,
            };
            if let Err(e) = store.attach_staff_message(number, &msg) {
                tracing::error!(
                    order = %number,
                    message = %msg.message_id,
                    error = %e,
                    "Staff post sent but not recorded"
                );
            }
            Ok(())
        }
        Err(e) => {
            if let Err(store_err) = store.mark_outbox_failed(number, &e.to_string()) {
                tracing::error!(order = %number, error = %store_err, "Failed to release outbox entry");
            }
            Err(e)
        }
    }
}

/// Post every unclaimed outbox entry older than `grace`.
pub async fn relay_once<P: Platform>(bot: &Bot<P>, grace: Duration) -> anyhow::Result<RelayReport> {
    let grace = chrono::Duration::from_std(grace).context("relay grace period out of range")?;
    let now = Utc::now();
    let due = bot.store().due_outbox(now - grace, now, BATCH)?;
    let mut report = RelayReport::default();

    for entry in due {
        let number = entry.order_number;
        if !bot.store().claim_outbox(number, Utc::now())? {
            continue;
        }
        let Some(order) = bot.store().get(number)? else {
            tracing::warn!(order = %number, "Outbox entry without order, dropping");
            bot.store().drop_outbox(number)?;
            continue;
        };
        if order.staff_message.is_some() {
            bot.store().drop_outbox(number)?;
            continue;
        }

        let post = notify::staff_message(&order, bot.catalog());
        let channel = &bot.config().staff_channel;
        match post_to_staff(bot.platform(), bot.store(), channel, number, &post).await {
            Ok(()) => {
                tracing::info!(order = %number, attempts = entry.attempts + 1, "Relayed staff notification");
                report.posted += 1;
            }
            Err(e) => {
                tracing::warn!(order = %number, attempts = entry.attempts + 1, error = %e, "Staff notification still failing");
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

/// Run [`relay_once`] every `interval`, using the interval as grace period.
pub fn spawn_relay<P: Platform>(bot: Arc<Bot<P>>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match relay_once(&bot, interval).await {
                Ok(report) if report.posted + report.failed > 0 => {
                    tracing::info!(posted = report.posted, failed = report.failed, "Outbox relay run");
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Outbox relay failed"),
            }
        }
    })
}
