//! Owner commands that manage trigger response rules.

use crate::commands::misc::args;
use crate::error::{BotError, Result};
use crate::events::IncomingMessage;
use crate::rules::{format_rule_listing, ResponseRule};
use crate::state::BotState;
use crate::store::{collections, put_entry, remove_entry};

#[cfg(test)]
#[path = "rules_admin_tests.rs"]
mod rules_admin_tests;

const SETSRES_USAGE: &str =
    "Usage: /setsres <sticker_id> <chance> <cooldown> <response_type> <response_content>";
const SETTRES_USAGE: &str =
    "Usage: /settres <regex> <chance> <cooldown> <response_type> <response_content> ";

fn parse_rule(args: &[String], usage: &'static str) -> Result<(String, ResponseRule)> {
    if args.len() < 5 {
        return Err(BotError::Usage(usage));
    }
    let key = args[0].clone();
    let chance: f64 = args[1].parse().map_err(|_| BotError::Usage(usage))?;
    let cooldown: u64 = args[2].parse().map_err(|_| BotError::Usage(usage))?;
    let kind = args[3].parse().map_err(|_| BotError::Usage(usage))?;
    let content = args[4..].join(" ");
    Ok((
        key,
        ResponseRule {
            chance,
            cooldown,
            kind,
            content,
        },
    ))
}

pub async fn setsres(state: &BotState, msg: &IncomingMessage) -> Result<()> {
    let (sticker, rule) = parse_rule(args(msg), SETSRES_USAGE)?;
    put_entry(
        state.store.as_ref(),
        collections::STICKER_RESPONSE,
        &sticker,
        &rule,
    )
    .await?;
    state.sticker_rules.write().await.insert(sticker, rule);
    state
        .gateway
        .reply_text(msg.chat.id, msg.id, "Entry updated")
        .await?;
    Ok(())
}

pub async fn delsres(state: &BotState, msg: &IncomingMessage) -> Result<()> {
    let Some(sticker) = args(msg).first() else {
        return Err(BotError::Usage("Usage: /delsres <sticker_id>"));
    };
    remove_entry(state.store.as_ref(), collections::STICKER_RESPONSE, sticker).await?;
    state.sticker_rules.write().await.remove(sticker);
    // Deleting an absent entry still confirms.
    state
        .gateway
        .reply_text(msg.chat.id, msg.id, "Entry deleted")
        .await?;
    Ok(())
}

pub async fn lssres(state: &BotState, msg: &IncomingMessage) -> Result<()> {
    let listing = format_rule_listing(&*state.sticker_rules.read().await);
    state
        .gateway
        .reply_text(msg.chat.id, msg.id, &listing)
        .await?;
    Ok(())
}

pub async fn settres(state: &BotState, msg: &IncomingMessage) -> Result<()> {
    let (pattern, rule) = parse_rule(args(msg), SETTRES_USAGE)?;
    // A pattern that does not compile never reaches the store.
    state
        .text_rules
        .register(&pattern, rule.clone())
        .await
        .map_err(|_| BotError::Usage(SETTRES_USAGE))?;
    put_entry(
        state.store.as_ref(),
        collections::TEXT_RESPONSE,
        &pattern,
        &rule,
    )
    .await?;
    state
        .gateway
        .reply_text(msg.chat.id, msg.id, "Entry updated")
        .await?;
    Ok(())
}

pub async fn deltres(state: &BotState, msg: &IncomingMessage) -> Result<()> {
    let Some(pattern) = args(msg).first() else {
        return Err(BotError::Usage("Usage: /deltres <regex>"));
    };
    remove_entry(state.store.as_ref(), collections::TEXT_RESPONSE, pattern).await?;
    state.text_rules.remove(pattern).await;
    state
        .gateway
        .reply_text(msg.chat.id, msg.id, "Entry deleted")
        .await?;
    Ok(())
}

pub async fn lstres(state: &BotState, msg: &IncomingMessage) -> Result<()> {
    let listing = format_rule_listing(&state.text_rules.snapshot().await);
    state
        .gateway
        .reply_text(msg.chat.id, msg.id, &listing)
        .await?;
    Ok(())
}
