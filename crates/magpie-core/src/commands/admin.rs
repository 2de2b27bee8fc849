//! Group administration: titles, the chat picture, and pinning.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::commands::misc::args;
use crate::durations::parse_duration;
use crate::error::{BotError, Result};
use crate::events::IncomingMessage;
use crate::scheduler::JobKey;
use crate::state::BotState;

#[cfg(test)]
#[path = "admin_tests.rs"]
mod admin_tests;

pub async fn settitle(state: &BotState, msg: &IncomingMessage) -> Result<()> {
    let args = args(msg);
    if args.is_empty() {
        return Err(BotError::Usage("Usage: /settitle <title>\n"));
    }
    let chat = msg.chat.id;
    let old_title = msg.chat.title.clone().unwrap_or_default();
    let prefix = state
        .config
        .group(chat)
        .and_then(|group| group.title_prefix.clone());
    let title = match &prefix {
        Some(prefix) => format!("{} {}", prefix, args.join(" ")),
        None => args.join(" "),
    };
    state.gateway.set_title(chat, &title).await?;

    let Some(delay) = state
        .config
        .group(chat)
        .and_then(|group| group.title_reset_delay)
    else {
        return Ok(());
    };
    // The reset target is the prefix when one is configured, otherwise
    // whatever the chat was called before this command.
    let reset_title = prefix.unwrap_or(old_title);
    let gateway = Arc::clone(&state.gateway);
    let job_title = reset_title.clone();
    state.jobs.schedule_keyed(
        JobKey::TitleReset(chat),
        Duration::from_secs(delay),
        move || async move {
            if let Err(err) = gateway.set_title(chat, &job_title).await {
                warn!(%chat, %err, "failed to reset chat title");
            }
        },
    );
    let text =
        format!("呼姆，这个群设置了默认群名呢……我会在{delay}秒后将群名重置为{reset_title}的……");
    state.gateway.reply_text(chat, msg.id, &text).await?;
    Ok(())
}

pub async fn resettitle(state: &BotState, msg: &IncomingMessage) -> Result<()> {
    let chat = msg.chat.id;
    let Some(prefix) = state
        .config
        .group(chat)
        .and_then(|group| group.title_prefix.clone())
    else {
        return Err(BotError::NotFound("No title prefix setup!"));
    };
    state.gateway.set_title(chat, &prefix).await?;
    state.jobs.cancel_key(JobKey::TitleReset(chat));
    Ok(())
}

pub async fn setpic(state: &BotState, msg: &IncomingMessage) -> Result<()> {
    let replied = msg.reply_to.as_ref().ok_or(BotError::Usage(
        "Usage:\n\nReply this command to the image that you wish to set as the group picture.\n",
    ))?;
    // Sizes come smallest first; the last entry is the full picture.
    let photo = replied
        .photos
        .last()
        .ok_or(BotError::NotFound("Picture not found.\n"))?;
    state.gateway.set_photo(msg.chat.id, photo).await?;
    Ok(())
}

pub async fn pin(state: &BotState, msg: &IncomingMessage) -> Result<()> {
    const USAGE: &str = "Usage:\n\nReplying to the message you wish to pin.\n/pin [time to pin]\n";
    let replied = msg.reply_to.as_ref().ok_or(BotError::Usage(USAGE))?;
    let chat = msg.chat.id;
    let notify = state
        .config
        .group(chat)
        .map(|group| group.force_notify)
        .unwrap_or(false);
    state.gateway.pin(chat, replied.id, notify).await?;

    let Some(arg) = args(msg).first() else {
        return Ok(());
    };
    let delay = parse_duration(arg).ok_or(BotError::Usage(USAGE))?;
    let gateway = Arc::clone(&state.gateway);
    state
        .jobs
        .schedule_keyed(JobKey::Unpin(chat), delay, move || async move {
            if let Err(err) = gateway.unpin(chat).await {
                warn!(%chat, %err, "failed to unpin on schedule");
            }
        });
    Ok(())
}

pub async fn unpin(state: &BotState, msg: &IncomingMessage) -> Result<()> {
    let chat = msg.chat.id;
    state.gateway.unpin(chat).await?;
    state.jobs.cancel_key(JobKey::Unpin(chat));
    Ok(())
}
