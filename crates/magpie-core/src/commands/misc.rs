//! Informational commands with no side effects.

use crate::error::{BotError, Result};
use crate::events::{IncomingMessage, MessageBody};
use crate::state::BotState;

#[cfg(test)]
#[path = "misc_tests.rs"]
mod misc_tests;

const HELP_TEXT: &str = "List of non-action commands:
/start     : Grant permission for individual user
/getgid    : Show GID of current group chat
/getsid    : Show id of sticker
/getuid    : Show your user ID
/settitle  : Set group chat title
/resettitle: Reset group chat title to default
/setpic    : Set group chat picture
/pin       : Pin message
/unpin     : Unpin pinned message
/actions   : Show action commands
/setsres   : Set up sticker response
/delsres   : Delete sticker response
/lssres    : List sticker response
/settres   : Set up text response
/deltres   : Delete text response
/lstres    : List text response
/shows     : Show sticker by id
/ban       : Ban user to send messages for a certain period of time
/banpic    : Ban user to send pictures for a certain period of time
/unban     : Unban user from previous bans
/help      : Show non-action commands";

/// Whitespace-separated arguments of a command message.
pub(crate) fn args(msg: &IncomingMessage) -> &[String] {
    match &msg.body {
        MessageBody::Command { args, .. } => args,
        _ => &[],
    }
}

pub async fn start(state: &BotState, msg: &IncomingMessage) -> Result<()> {
    state
        .gateway
        .reply_text(msg.chat.id, msg.id, "嗨多磨～")
        .await?;
    Ok(())
}

pub async fn getgid(state: &BotState, msg: &IncomingMessage) -> Result<()> {
    let text = format!("Group ID is: {}\n", msg.chat.id);
    state.gateway.reply_text(msg.chat.id, msg.id, &text).await?;
    Ok(())
}

pub async fn getsid(state: &BotState, msg: &IncomingMessage) -> Result<()> {
    let sticker = msg
        .reply_to
        .as_ref()
        .and_then(|replied| replied.sticker.as_deref())
        .ok_or(BotError::Usage("Usage:\nReply to sticker"))?;
    let text = format!("Sticker ID:{sticker}");
    state.gateway.reply_text(msg.chat.id, msg.id, &text).await?;
    Ok(())
}

pub async fn getuid(state: &BotState, msg: &IncomingMessage) -> Result<()> {
    let text = format!("Your User ID:{}", msg.sender.id);
    state.gateway.reply_text(msg.chat.id, msg.id, &text).await?;
    Ok(())
}

pub async fn shows(state: &BotState, msg: &IncomingMessage) -> Result<()> {
    let args = args(msg);
    let Some(sticker) = args.first() else {
        return Err(BotError::Usage("Usage: /shows <sticker_id>"));
    };
    state.gateway.reply_sticker(msg.chat.id, msg.id, sticker).await?;
    Ok(())
}

pub async fn help(state: &BotState, msg: &IncomingMessage) -> Result<()> {
    state
        .gateway
        .reply_text(msg.chat.id, msg.id, HELP_TEXT)
        .await?;
    Ok(())
}

pub async fn actions_list(state: &BotState, msg: &IncomingMessage) -> Result<()> {
    let text = if state.config.actions.is_empty() {
        "No action command defined".to_string()
    } else {
        let lines = state
            .config
            .actions
            .keys()
            .map(|name| format!("/{name}"))
            .collect::<Vec<_>>()
            .join("\n");
        format!("List of action commands:\n{lines}")
    };
    state.gateway.reply_text(msg.chat.id, msg.id, &text).await?;
    Ok(())
}

pub async fn stock(state: &BotState, msg: &IncomingMessage) -> Result<()> {
    let args = args(msg);
    let Some(ticker) = args.first() else {
        return Err(BotError::Usage("Usage: /stock <ticker>"));
    };
    let quote = state.stocks.last_trade(ticker).await?;
    let name = quote.name.replace("&amp;", "&");
    let text = format!(
        "{}({}) 最近交易价格为{:.2}, 最近交易日变动{:.2}({:.1}%)",
        name, quote.symbol, quote.price, quote.change, quote.change_percent
    );
    state.gateway.reply_text(msg.chat.id, msg.id, &text).await?;
    Ok(())
}
