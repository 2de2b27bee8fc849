//! Quote submission, retrieval, and removal.

use std::collections::BTreeMap;

use rand::seq::IteratorRandom;

use crate::commands::misc::args;
use crate::commands::moderation;
use crate::error::{BotError, Result};
use crate::events::IncomingMessage;
use crate::quotes::{quote_key, StoredQuote};
use crate::state::{BotState, QuoteSubmission};
use crate::store::{collections, load_typed, remove_entry};
use crate::types::PendingId;

#[cfg(test)]
#[path = "quotes_tests.rs"]
mod quotes_tests;

pub async fn addquote(state: &BotState, msg: &IncomingMessage) -> Result<()> {
    let replied = msg.reply_to.as_ref().ok_or(BotError::Usage(
        "Usage:\n\nReplying to the message you wish to quote.",
    ))?;
    let submission = QuoteSubmission {
        key: quote_key(replied.chat, replied.id),
        quote: StoredQuote {
            chat: replied.chat,
            message: replied.id,
            author: replied.sender.full_name(),
            text: replied.text.clone().unwrap_or_default(),
        },
        origin_chat: msg.chat.id,
        origin_message: msg.id,
    };
    let id = PendingId::new(replied.chat, replied.id);
    state.quote_queue.submit(id, submission.clone()).await?;
    moderation::announce_quote(state, id, &submission).await;
    state
        .gateway
        .reply_text(msg.chat.id, msg.id, "Quote submitted for approval.")
        .await?;
    Ok(())
}

pub async fn quote(state: &BotState, msg: &IncomingMessage) -> Result<()> {
    let quotes: BTreeMap<String, StoredQuote> =
        load_typed(state.store.as_ref(), collections::QUOTES).await?;
    let picked = {
        let mut rng = rand::thread_rng();
        quotes.values().choose(&mut rng).cloned()
    };
    let Some(picked) = picked else {
        return Err(BotError::NotFound("No quotes found"));
    };
    state
        .gateway
        .forward(msg.chat.id, picked.chat, picked.message)
        .await?;
    Ok(())
}

pub async fn rmquote(state: &BotState, msg: &IncomingMessage) -> Result<()> {
    let Some(id) = args(msg).first() else {
        return Err(BotError::Usage("Usage: /rmquote <quote_id>"));
    };
    if !remove_entry(state.store.as_ref(), collections::QUOTES, id).await? {
        return Err(BotError::NotFound("Quote ID not found"));
    }
    state
        .gateway
        .reply_text(msg.chat.id, msg.id, "Quote removed")
        .await?;
    Ok(())
}

pub async fn lsquotes(state: &BotState, msg: &IncomingMessage) -> Result<()> {
    let quotes: BTreeMap<String, StoredQuote> =
        load_typed(state.store.as_ref(), collections::QUOTES).await?;
    state.listings.open(msg.chat.id, quotes).await
}
