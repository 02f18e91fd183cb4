//! weinbot: wine orders and coin flips for a Discord guild.
//!
//! Serves the interactions endpoint configured in the Discord developer
//! portal. Triggers (registered as application commands at startup):
//!
//!   /bestellen         start a wine order (order channel only)
//!   /münze, /muenze    flip a coin
//!   /kopfoderzahl      call heads or tails, reveal after a short delay
//!
//! Requires DISCORD_TOKEN, DISCORD_APPLICATION_ID, DISCORD_PUBLIC_KEY,
//! ORDER_CHANNEL_ID and STAFF_CHANNEL_ID (flags or environment).

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use weinbot::bot::Bot;
use weinbot::catalog::Catalog;
use weinbot::config::BotConfig;
use weinbot::outbox;
use weinbot::store::OrderStore;
use weinbot::web::{self, AppState};
use weinbot_sdk::client::RestClient;
use weinbot_sdk::signature::Verifier;

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs in production (WEINBOT_LOG_JSON=1), human-readable otherwise
    let json_logs = std::env::var("WEINBOT_LOG_JSON").unwrap_or_default() == "1";
    let filter = EnvFilter::from_default_env().add_directive("weinbot=info".parse()?);
    if json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = BotConfig::parse();

    let catalog = match &config.catalog {
        Some(path) => Catalog::load(path)
            .with_context(|| format!("loading catalog {}", path.display()))?,
        None => Catalog::builtin(),
    };
    tracing::info!(products = catalog.len(), "Catalog loaded");

    let store = OrderStore::open(&config.db_path)
        .with_context(|| format!("opening database {}", config.db_path.display()))?;
    let store = Arc::new(store);

    let verifier = Verifier::from_hex(&config.public_key).context("DISCORD_PUBLIC_KEY")?;
    let rest = RestClient::new(&config.token, &config.application_id).with_base(&config.api_base);

    let bot = Arc::new(Bot::new(config.clone(), catalog, store, rest.clone()));
    let commands = bot.triggers().command_specs();
    let registered = rest
        .register_commands(config.guild.as_deref(), &commands)
        .await
        .context("registering application commands")?;
    tracing::info!(count = registered, guild = ?config.guild, "Commands registered");

    bot.selections().clone().spawn_sweeper(config.sweep_interval());
    outbox::spawn_relay(bot.clone(), config.outbox_interval());

    let app = web::router(Arc::new(AppState { bot, verifier }));
    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("binding {}", config.listen))?;
    tracing::info!("Interactions endpoint on http://{}/interactions", config.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;
    Ok(())
}
