//! The bot: shared state and the top-level interaction dispatch.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;
use weinbot_sdk::event::{Event, InteractionContext};
use weinbot_sdk::response::InteractionResponse;

use crate::action::Action;
use crate::catalog::Catalog;
use crate::config::BotConfig;
use crate::error::{FlowError, FlowResult};
use crate::platform::Platform;
use crate::router::{self, Input, Route, Trigger, Triggers};
use crate::selection::SelectionCache;
use crate::store::OrderStore;

const GENERIC_FAILURE: &str = "Etwas ist schiefgelaufen. Bitte versuche es später noch einmal.";

pub struct Bot<P: Platform> {
    pub(crate) config: BotConfig,
    pub(crate) catalog: Arc<Catalog>,
    pub(crate) selections: Arc<SelectionCache>,
    pub(crate) store: Arc<OrderStore>,
    pub(crate) platform: P,
    pub(crate) triggers: Triggers,
    rng: Mutex<StdRng>,
}

impl<P: Platform> Bot<P> {
    pub fn new(config: BotConfig, catalog: Catalog, store: Arc<OrderStore>, platform: P) -> Self {
        Self::with_rng(config, catalog, store, platform, StdRng::from_entropy())
    }

    /// Same as [`Bot::new`] with a caller-provided generator (seeded in tests).
    pub fn with_rng(
        config: BotConfig,
        catalog: Catalog,
        store: Arc<OrderStore>,
        platform: P,
        rng: StdRng,
    ) -> Self {
        let selections = Arc::new(SelectionCache::new(config.selection_ttl()));
        let triggers = Triggers::new(config.triggers_case_insensitive);
        Self {
            config,
            catalog: Arc::new(catalog),
            selections,
            store,
            platform,
            triggers,
            rng: Mutex::new(rng),
        }
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn selections(&self) -> &Arc<SelectionCache> {
        &self.selections
    }

    pub fn store(&self) -> &Arc<OrderStore> {
        &self.store
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn triggers(&self) -> &Triggers {
        &self.triggers
    }

    /// Run `f` with the generator locked. The guard never outlives the call,
    /// so no lock is held across an await.
    pub(crate) fn rng_scope<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        f(&mut self.rng.lock())
    }

    /// Handle one interaction. Never fails: errors become user-visible replies.
    pub async fn handle(&self, event: Event) -> InteractionResponse {
        let user = event.context().map(|ctx| ctx.user.id.clone());
        let result = match router::route(event, &self.triggers) {
            Ok(route) => self.dispatch(route).await,
            Err(e) => Err(e.into()),
        };
        match result {
            Ok(response) => response,
            Err(e) if e.is_internal() => {
                tracing::error!(user = ?user, error = %e, "Interaction failed");
                InteractionResponse::ephemeral(GENERIC_FAILURE)
            }
            Err(e) => {
                tracing::info!(user = ?user, reason = %e, "Interaction refused");
                InteractionResponse::ephemeral(e.to_string())
            }
        }
    }

    async fn dispatch(&self, route: Route) -> FlowResult<InteractionResponse> {
        match route {
            Route::Ping => Ok(InteractionResponse::Pong),
            Route::Trigger { ctx, trigger } => match trigger {
                Trigger::Order => self.start_order(&ctx),
                Trigger::CoinFlip => Ok(self.coin_flip(&ctx)),
                Trigger::CoinDuel => Ok(self.coin_duel(&ctx)),
            },
            Route::Action { ctx, action, input } => match (action, input) {
                (Action::Select { owner }, Input::Values(values)) => {
                    self.select_products(&ctx, &owner, values)
                }
                (Action::Select { owner }, _) => self.select_products(&ctx, &owner, Vec::new()),
                (Action::Confirm { owner }, _) => self.confirm_selection(&ctx, &owner),
                (Action::Cancel { owner }, _) => self.cancel_selection(&ctx, &owner),
                (Action::SubmitQuantities { owner }, Input::Fields(fields)) => {
                    self.submit_order(&ctx, &owner, &fields).await
                }
                (Action::Accept { order }, _) => self.accept_order(&ctx, order),
                (Action::Reject { order }, _) => self.reject_order(&ctx, order),
                (Action::RejectReason { order }, Input::Fields(fields)) => {
                    self.reject_with_reason(&ctx, order, &fields)
                }
                (Action::CoinCall { owner, side }, _) => self.coin_call(&ctx, &owner, side),
                (action, input) => Err(FlowError::Internal(anyhow::anyhow!(
                    "unexpected input {input:?} for action {action}"
                ))),
            },
        }
    }

    /// Prompts and forms carry their owner; only that user may use them.
    pub(crate) fn ensure_owner(
        &self,
        ctx: &InteractionContext,
        owner: &str,
        message: &str,
    ) -> FlowResult<()> {
        if ctx.user.id == owner {
            Ok(())
        } else {
            tracing::debug!(user = %ctx.user.id, owner, "Interaction by non-owner");
            Err(FlowError::unauthorized(message))
        }
    }
}
