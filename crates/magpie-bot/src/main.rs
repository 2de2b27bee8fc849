//! Telegram front end for the magpie chat bot.
//!
//! Wires the platform-independent engine to teloxide: converts inbound
//! updates, runs the scheduler and watcher tasks, and serves the
//! health endpoint.

mod health;
mod inbound;
mod jsonstore;
mod stocks;
mod telegram;
mod tenor;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use teloxide::prelude::*;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use magpie_core::config::BotConfig;
use magpie_core::duel::RngDice;
use magpie_core::responses::RngChance;
use magpie_core::scheduler::Scheduler;
use magpie_core::watch::Watcher;
use magpie_core::{BotState, Dispatcher as Engine};

use crate::health::AppState;

/// Magpie Telegram bot CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/magpie.toml")]
    config: String,

    /// Path to the persistent store
    #[arg(long, default_value = "data.json")]
    store: String,

    /// Telegram bot token (overrides config file)
    #[arg(long, env = "MAGPIE_APIKEY")]
    apikey: Option<String>,

    /// Tenor API key (overrides config file)
    #[arg(long, env = "MAGPIE_TENOR_KEY")]
    tenor_key: Option<String>,

    /// Health check server port
    #[arg(long, env = "HEALTH_CHECK_PORT", default_value = "3000")]
    health_port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "magpie_bot=debug,magpie_core=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting magpie bot");

    let args = Args::parse();

    let mut config = BotConfig::from_file(&args.config)?;
    if let Some(apikey) = args.apikey {
        config.apikey = apikey;
    }
    if let Some(tenor_key) = args.tenor_key {
        config.tenor_key = tenor_key;
    }
    if config.apikey.is_empty() {
        anyhow::bail!("no Telegram API key in config file or MAGPIE_APIKEY");
    }

    info!("Configuration loaded successfully");
    info!("Owner account: {}", config.owner);

    // Create Telegram bot
    info!("Initializing Telegram bot...");
    let bot = Bot::new(&config.apikey);

    // Verify bot token
    let me = match bot.get_me().await {
        Ok(me) => me,
        Err(e) => {
            error!("Failed to authenticate bot: {}", e);
            return Err(e.into());
        }
    };
    let bot_username = me.username().to_string();
    let bot_user = magpie_core::types::UserId(me.user.id.0 as i64);
    info!("Bot authenticated as: @{}", bot_username);

    let store = Arc::new(jsonstore::JsonStore::open(&args.store)?);
    let tenor = Arc::new(tenor::TenorClient::connect(&config.tenor_key).await?);
    let stocks = Arc::new(stocks::YahooFinance::new()?);
    let gateway = Arc::new(telegram::TelegramGateway::new(bot.clone()));

    // The scheduler actor owns all delayed jobs.
    let (jobs, scheduler) = Scheduler::new();
    tokio::spawn(scheduler.run());

    let state = Arc::new(BotState::new(
        config.clone(),
        gateway.clone(),
        store,
        tenor,
        stocks,
        Arc::new(RngChance::from_entropy()),
        Arc::new(RngDice::from_entropy()),
        jobs,
        bot_user,
        bot_username.clone(),
    ));
    state.hydrate_rules().await?;
    info!("Stored response rules hydrated");

    // Membership watcher poll loop
    let mut watcher = Watcher::new(
        gateway,
        config.owner_chat(),
        config.watches.count.clone(),
        config.watches.member.clone(),
    );
    for (key, group) in &config.groups {
        if let (Ok(id), Some(target)) = (key.parse::<i64>(), group.notify_watches_to) {
            watcher = watcher.route_reports(magpie_core::types::ChatId(id), target);
        }
    }
    let watcher = Arc::new(watcher);
    tokio::spawn(async move { watcher.run().await });

    // Start health check server
    let health_state = AppState::new(Some(bot_username));
    let health_state_clone = health_state.clone();
    let health_port = args.health_port;
    tokio::spawn(async move {
        if let Err(e) = health::start_health_server(health_state_clone, health_port).await {
            error!("Health check server error: {}", e);
        }
    });

    let engine = Engine::new(state);

    info!("Bot initialized, starting update dispatcher...");

    let message_handler = Update::filter_message().endpoint(on_message);
    let callback_handler = Update::filter_callback_query().endpoint(on_callback);

    let all_handlers = dptree::entry()
        .branch(message_handler)
        .branch(callback_handler);

    Dispatcher::builder(bot, all_handlers)
        .dependencies(dptree::deps![engine, health_state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Magpie bot stopped");
    Ok(())
}

async fn on_message(msg: Message, engine: Engine, health: AppState) -> ResponseResult<()> {
    health.increment_messages_received().await;
    match inbound::convert_message(&msg) {
        Some(incoming) => engine.handle_message(incoming).await,
        None => debug!(chat = msg.chat.id.0, "dropping update without a usable sender"),
    }
    Ok(())
}

async fn on_callback(query: CallbackQuery, engine: Engine, health: AppState) -> ResponseResult<()> {
    health.increment_callbacks_received().await;
    if let Some(press) = inbound::convert_callback(&query) {
        engine.handle_callback(press).await;
    }
    Ok(())
}
