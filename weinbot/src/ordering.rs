//! Customer side of the order workflow: prompt, selection, quantity form,
//! submission.

use std::sync::Arc;

use weinbot_sdk::component::{
    ActionRow, Button, ButtonStyle, MAX_MODAL_ROWS, MessagePayload, Modal, SelectOption,
    StringSelect, TextInput, TextInputStyle,
};
use weinbot_sdk::event::InteractionContext;
use weinbot_sdk::response::InteractionResponse;

use crate::action::Action;
use crate::bot::Bot;
use crate::catalog::Catalog;
use crate::error::{FlowError, FlowResult};
use crate::notify;
use crate::order::{NewOrder, OrderItem};
use crate::outbox;
use crate::platform::Platform;

const NOT_YOUR_ORDER: &str = "Das ist nicht deine Bestellung. Starte eine eigene mit /bestellen.";
const SELECTION_GONE: &str =
    "Deine Auswahl ist abgelaufen oder leer. Bitte starte mit /bestellen neu.";

/// The selection prompt, with `selected` pre-checked and listed.
pub fn selection_prompt(owner: &str, catalog: &Catalog, selected: &[String]) -> MessagePayload {
    let max = catalog.len().min(MAX_MODAL_ROWS) as u8;
    let options = catalog
        .products()
        .iter()
        .map(|p| {
            let option = SelectOption::new(&p.display_name, &p.key)
                .selected(selected.iter().any(|k| k == &p.key));
            if p.founder {
                option.description("Limitiert: 1 Stück pro Bestellung")
            } else {
                option
            }
        })
        .collect();

    let content = if selected.is_empty() {
        format!("🍷 Wähle bis zu {max} Weine aus und klicke dann auf „Weiter“.")
    } else {
        let names: Vec<_> = selected.iter().map(|k| catalog.display_name(k)).collect();
        format!("🍷 Deine Auswahl: {}\nKlicke auf „Weiter“, um die Mengen anzugeben.", names.join(", "))
    };

    let owner = owner.to_string();
    MessagePayload::text(content)
        .row(ActionRow::select(
            StringSelect::new(Action::Select { owner: owner.clone() }.encode(), options)
                .placeholder("Weine auswählen")
                .range(1, max),
        ))
        .row(ActionRow::buttons(vec![
            Button::new(ButtonStyle::Primary, "Weiter", Action::Confirm { owner: owner.clone() }.encode())
                .disabled(selected.is_empty()),
            Button::new(ButtonStyle::Secondary, "Abbrechen", Action::Cancel { owner }.encode()),
        ]))
}

impl<P: Platform> Bot<P> {
    pub(crate) fn start_order(&self, ctx: &InteractionContext) -> FlowResult<InteractionResponse> {
        if ctx.channel_id.as_deref() != Some(self.config.order_channel.as_str()) {
            return Err(FlowError::validation(format!(
                "Bestellungen sind nur in <#{}> möglich.",
                self.config.order_channel
            )));
        }
        // A fresh prompt starts from an empty selection.
        self.selections.clear(&ctx.user.id);
        tracing::debug!(user = %ctx.user.id, "Order prompt opened");
        Ok(InteractionResponse::Message(
            selection_prompt(&ctx.user.id, &self.catalog, &[]).ephemeral(),
        ))
    }

    pub(crate) fn select_products(
        &self,
        ctx: &InteractionContext,
        owner: &str,
        values: Vec<String>,
    ) -> FlowResult<InteractionResponse> {
        self.ensure_owner(ctx, owner, NOT_YOUR_ORDER)?;

        let mut keys: Vec<String> = Vec::with_capacity(values.len());
        for value in values {
            if self.catalog.get(&value).is_none() {
                return Err(FlowError::validation(format!("Unbekanntes Produkt `{value}`.")));
            }
            if !keys.contains(&value) {
                keys.push(value);
            }
        }
        if keys.is_empty() {
            return Err(FlowError::validation("Bitte wähle mindestens einen Wein aus."));
        }
        if keys.len() > MAX_MODAL_ROWS {
            return Err(FlowError::validation(format!(
                "Bitte wähle höchstens {MAX_MODAL_ROWS} Weine aus."
            )));
        }

        self.selections.select(owner, keys.clone());
        tracing::debug!(user = owner, products = ?keys, "Selection updated");
        Ok(InteractionResponse::UpdateMessage(selection_prompt(owner, &self.catalog, &keys)))
    }

    pub(crate) fn confirm_selection(
        &self,
        ctx: &InteractionContext,
        owner: &str,
    ) -> FlowResult<InteractionResponse> {
        self.ensure_owner(ctx, owner, NOT_YOUR_ORDER)?;
        let keys = self
            .selections
            .get(owner)
            .filter(|keys| !keys.is_empty())
            .ok_or_else(|| FlowError::validation(SELECTION_GONE))?;

        let modal = keys.iter().fold(
            Modal::new(Action::SubmitQuantities { owner: owner.to_string() }.encode(), "Mengen angeben"),
            |modal, key| {
                let label = format!("Menge: {}", self.catalog.display_name(key));
                modal.input(
                    TextInput::new(TextInputStyle::Short, &label, key.as_str())
                        .value("1")
                        .length(1, 4),
                )
            },
        );
        Ok(InteractionResponse::Modal(modal))
    }

    pub(crate) fn cancel_selection(
        &self,
        ctx: &InteractionContext,
        owner: &str,
    ) -> FlowResult<InteractionResponse> {
        self.ensure_owner(ctx, owner, NOT_YOUR_ORDER)?;
        self.selections.clear(owner);
        tracing::debug!(user = owner, "Selection cancelled");
        Ok(InteractionResponse::UpdateMessage(MessagePayload::text(
            "Bestellung abgebrochen.",
        )))
    }

    /// Validate the quantity form, persist the order with its outbox row and
    /// notify staff.
    ///
    /// The staff post runs in its own task. If it takes longer than the
    /// configured wait the customer is answered anyway; the task keeps its
    /// outbox claim until it finishes.
    pub(crate) async fn submit_order(
        &self,
        ctx: &InteractionContext,
        owner: &str,
        fields: &[(String, String)],
    ) -> FlowResult<InteractionResponse> {
        self.ensure_owner(ctx, owner, NOT_YOUR_ORDER)?;
        let keys = self
            .selections
            .get(owner)
            .filter(|keys| !keys.is_empty())
            .ok_or_else(|| FlowError::validation(SELECTION_GONE))?;

        let mut items = Vec::with_capacity(keys.len());
        for key in &keys {
            let raw = fields
                .iter()
                .find(|(id, _)| id == key)
                .map(|(_, value)| value.as_str())
                .unwrap_or("");
            let quantity = self
                .catalog
                .check_quantity(key, raw)
                .map_err(|e| FlowError::validation(e.to_string()))?;
            items.push(OrderItem::new(key.as_str(), quantity));
        }

        // Only a valid submission consumes the selection; a typo keeps it for
        // another try. Of two concurrent submissions only one gets it.
        if self.selections.take(owner).is_none() {
            return Err(FlowError::validation(SELECTION_GONE));
        }

        let draft = NewOrder {
            requester_id: owner.to_string(),
            guild_id: ctx.guild_id.clone(),
            items,
        };
        let order = self.rng_scope(|rng| self.store.create_order(&draft, rng))?;
        tracing::info!(
            order = %order.number,
            user = owner,
            bottles = order.total_bottles(),
            "Order created"
        );

        let staff_post = notify::staff_message(&order, &self.catalog);
        let platform = self.platform.clone();
        let store = Arc::clone(&self.store);
        let channel = self.config.staff_channel.clone();
        let number = order.number;
        let posting = tokio::spawn(async move {
            let result = outbox::post_to_staff(&platform, &store, &channel, number, &staff_post).await;
            if let Err(e) = &result {
                tracing::error!(
                    order = %number,
                    channel = %channel,
                    error = %e,
                    "Staff notification failed, left in outbox"
                );
            }
            result.is_ok()
        });

        let reply = match tokio::time::timeout(self.config.staff_post_wait(), posting).await {
            Ok(Ok(true)) => format!(
                "✅ Danke! Deine Bestellung #{} ist eingegangen und wird vom Team geprüft.\n{}",
                order.number,
                notify::item_lines(&order, &self.catalog)
            ),
            Ok(Ok(false)) | Ok(Err(_)) => format!(
                "⚠️ Deine Bestellung #{} wurde gespeichert, aber das Team konnte noch nicht \
                 benachrichtigt werden. Wir versuchen es automatisch erneut.",
                order.number
            ),
            Err(_) => {
                tracing::info!(order = %order.number, "Staff post still running, answering customer");
                format!(
                    "✅ Danke! Deine Bestellung #{} ist eingegangen, das Team wird gleich benachrichtigt.\n{}",
                    order.number,
                    notify::item_lines(&order, &self.catalog)
                )
            }
        };
        Ok(InteractionResponse::ephemeral(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotConfig;
    use crate::store::OrderStore;
    use crate::testing::RecordingPlatform;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use weinbot_sdk::event::Actor;

    fn customer() -> InteractionContext {
        InteractionContext {
            interaction_id: "i-1".into(),
            token: "t-1".into(),
            channel_id: Some("orders".into()),
            guild_id: None,
            user: Actor {
                id: "42".into(),
                name: "kunde".into(),
                roles: vec![],
                permissions: 0,
            },
        }
    }

    #[test]
    fn prompt_caps_choices_at_form_size() {
        let catalog = Catalog::builtin();
        let prompt = selection_prompt("42", &catalog, &[]);
        assert_eq!(prompt.custom_ids(), vec!["sel:42", "ok:42", "cancel:42"]);
        let v = serde_json::to_value(&prompt).unwrap();
        let select = &v["components"][0]["components"][0];
        assert_eq!(select["min_values"], 1);
        assert_eq!(select["max_values"], catalog.len().min(MAX_MODAL_ROWS));
        assert_eq!(v["components"][1]["components"][0]["disabled"], true);
    }

    #[test]
    fn prompt_lists_and_marks_selection() {
        let catalog = Catalog::builtin();
        let selected = vec!["spaetburgunder".to_string(), "riesling".to_string()];
        let prompt = selection_prompt("42", &catalog, &selected);
        let content = prompt.content.clone().unwrap();
        assert!(content.contains("Spätburgunder, Riesling Kabinett"));
        let v = serde_json::to_value(&prompt).unwrap();
        let options = v["components"][0]["components"][0]["options"].as_array().unwrap().clone();
        let marked: Vec<_> = options
            .iter()
            .filter(|o| o["default"] == true)
            .map(|o| o["value"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(marked, vec!["riesling", "spaetburgunder"]);
    }

    #[tokio::test]
    async fn unrecorded_staff_post_still_confirms_the_order() {
        let store = Arc::new(OrderStore::open_memory().unwrap());
        let platform = RecordingPlatform::default();
        let bot = Bot::with_rng(
            BotConfig::default(),
            Catalog::builtin(),
            store.clone(),
            platform.clone(),
            StdRng::seed_from_u64(3),
        );
        store.execute_raw("ALTER TABLE orders DROP COLUMN staff_message_id;");

        bot.select_products(&customer(), "42", vec!["riesling".into()]).unwrap();
        let resp = bot
            .submit_order(&customer(), "42", &[("riesling".into(), "2".into())])
            .await
            .unwrap();
        let content = resp.payload().unwrap().content.clone().unwrap();
        assert!(content.starts_with("✅ Danke! Deine Bestellung #"), "{content}");
        assert_eq!(platform.posts_to("staff").len(), 1);
    }
}
