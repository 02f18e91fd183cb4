//! Coin flips: the classic immediate flip and the two-button duel.

use rand::Rng;
use weinbot_sdk::component::{ActionRow, Button, ButtonStyle, MessagePayload};
use weinbot_sdk::event::InteractionContext;
use weinbot_sdk::response::InteractionResponse;

use crate::action::Action;
use crate::bot::Bot;
use crate::error::FlowResult;
use crate::platform::Platform;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoinSide {
    Heads,
    Tails,
}

impl CoinSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoinSide::Heads => "heads",
            CoinSide::Tails => "tails",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "heads" => Some(CoinSide::Heads),
            "tails" => Some(CoinSide::Tails),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CoinSide::Heads => "Kopf",
            CoinSide::Tails => "Zahl",
        }
    }

    pub fn other(&self) -> Self {
        match self {
            CoinSide::Heads => CoinSide::Tails,
            CoinSide::Tails => CoinSide::Heads,
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.gen_bool(0.5) {
            CoinSide::Heads
        } else {
            CoinSide::Tails
        }
    }
}

/// How the duel decides a win.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Odds {
    /// Independent uniform flip; the call wins when it matches.
    Fair,
    /// The call wins with this chance. Always disclosed to the player.
    Fixed { win_percent: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flip {
    pub outcome: CoinSide,
    pub won: bool,
}

pub fn call_coin<R: Rng + ?Sized>(rng: &mut R, call: CoinSide, odds: Odds) -> Flip {
    match odds {
        Odds::Fair => {
            let outcome = CoinSide::random(rng);
            Flip {
                outcome,
                won: outcome == call,
            }
        }
        Odds::Fixed { win_percent } => {
            let won = rng.gen_range(0..100u8) < win_percent.min(100);
            let outcome = if won { call } else { call.other() };
            Flip { outcome, won }
        }
    }
}

fn duel_buttons(owner: &str, disabled: bool) -> ActionRow {
    let button = |side: CoinSide| {
        Button::new(
            ButtonStyle::Primary,
            side.label(),
            Action::CoinCall {
                owner: owner.to_string(),
                side,
            }
            .encode(),
        )
        .disabled(disabled)
    };
    ActionRow::buttons(vec![button(CoinSide::Heads), button(CoinSide::Tails)])
}

fn odds_notice(odds: Odds) -> Option<String> {
    match odds {
        Odds::Fair => None,
        Odds::Fixed { win_percent } => Some(format!("_Hinweis: Gewinnchance {win_percent} %._")),
    }
}

impl<P: Platform> Bot<P> {
    pub(crate) fn coin_flip(&self, ctx: &InteractionContext) -> InteractionResponse {
        let side = self.rng_scope(|rng| CoinSide::random(rng));
        tracing::debug!(user = %ctx.user.id, side = side.as_str(), "Classic coin flip");
        InteractionResponse::Message(MessagePayload::text(format!(
            "Die Münze wird geworfen…\nErgebnis: **🪙 {}**",
            side.label()
        )))
    }

    pub(crate) fn coin_duel(&self, ctx: &InteractionContext) -> InteractionResponse {
        let mut text = format!("{}, Kopf oder Zahl? Wähle eine Seite.", ctx.user.mention());
        if let Some(notice) = odds_notice(self.config.coin_odds()) {
            text.push('\n');
            text.push_str(&notice);
        }
        InteractionResponse::Message(MessagePayload::text(text).row(duel_buttons(&ctx.user.id, false)))
    }

    /// Locks the buttons now and edits the result in after the configured delay.
    pub(crate) fn coin_call(
        &self,
        ctx: &InteractionContext,
        owner: &str,
        call: CoinSide,
    ) -> FlowResult<InteractionResponse> {
        self.ensure_owner(ctx, owner, "Das ist nicht dein Münzwurf.")?;

        let odds = self.config.coin_odds();
        let flip = self.rng_scope(|rng| call_coin(rng, call, odds));
        tracing::info!(
            user = %ctx.user.id,
            call = call.as_str(),
            outcome = flip.outcome.as_str(),
            won = flip.won,
            "Coin duel"
        );

        let verdict = if flip.won { "Du gewinnst! 🎉" } else { "Du verlierst. 😢" };
        let mut reveal = format!(
            "{} hat **{}** gewählt.\nErgebnis: **🪙 {}**, {verdict}",
            ctx.user.mention(),
            call.label(),
            flip.outcome.label()
        );
        if let Some(notice) = odds_notice(odds) {
            reveal.push('\n');
            reveal.push_str(&notice);
        }
        let reveal = MessagePayload::text(reveal);

        let platform = self.platform.clone();
        let token = ctx.token.clone();
        let delay = self.config.coin_delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = platform.edit_original_response(&token, &reveal).await {
                tracing::warn!(error = %e, "Failed to reveal coin duel result");
            }
        });

        Ok(InteractionResponse::UpdateMessage(
            MessagePayload::text(format!(
                "{} hat **{}** gewählt.\nDie Münze fliegt… 🪙",
                ctx.user.mention(),
                call.label()
            ))
            .row(duel_buttons(owner, true)),
        ))
    }
}
