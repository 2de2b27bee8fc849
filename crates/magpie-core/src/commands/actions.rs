//! Configured GIF-reaction commands.

use crate::error::{BotError, Result};
use crate::events::IncomingMessage;
use crate::state::BotState;

#[cfg(test)]
#[path = "actions_tests.rs"]
mod actions_tests;

/// Runs the action registered under `name`. Used bare it teases the
/// invoker; used as a reply it aims the GIF and the mention line at the
/// target message instead.
pub async fn run(state: &BotState, msg: &IncomingMessage, name: &str) -> Result<()> {
    let Some(action) = state.config.actions.get(name) else {
        return Err(BotError::NotFound("unknown action"));
    };
    let keyword = if action.anime {
        format!("anime {}", action.keyword)
    } else {
        action.keyword.clone()
    };
    let chat = msg.chat.id;

    let Some(target) = &msg.reply_to else {
        state
            .gifs
            .fetch_and_send(chat, &keyword, Some(msg.id))
            .await?;
        state
            .gateway
            .reply_text(chat, msg.id, &action.reply_text)
            .await?;
        return Ok(());
    };

    state
        .gifs
        .fetch_and_send(chat, &keyword, Some(target.id))
        .await?;
    if target.sender.id == state.bot_user {
        state
            .gateway
            .reply_text(chat, msg.id, &action.self_text)
            .await?;
    } else {
        let text = format!("{} {}", msg.sender.mention(), action.mention_text);
        state.gateway.reply_markdown(chat, target.id, &text).await?;
    }
    Ok(())
}
