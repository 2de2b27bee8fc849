//! Channel post submission.

use crate::commands::moderation;
use crate::error::{BotError, Result};
use crate::events::IncomingMessage;
use crate::state::{BotState, PostSubmission};
use crate::types::PendingId;

#[cfg(test)]
#[path = "posts_tests.rs"]
mod posts_tests;

pub async fn post(state: &BotState, msg: &IncomingMessage) -> Result<()> {
    let replied = msg.reply_to.as_ref().ok_or(BotError::Usage(
        "Usage:\n\nReplying to the message you wish to post.",
    ))?;
    let channel = state
        .config
        .group(msg.chat.id)
        .and_then(|group| group.channel)
        .ok_or(BotError::NotFound("No channel configured"))?;
    let submission = PostSubmission {
        source_chat: replied.chat,
        message: replied.id,
        channel,
        origin_chat: msg.chat.id,
        origin_message: msg.id,
    };
    let id = PendingId::new(replied.chat, replied.id);
    state.post_queue.submit(id, submission.clone()).await?;
    moderation::announce_post(state, id, &submission).await;
    state
        .gateway
        .reply_text(msg.chat.id, msg.id, "Post submitted for approval.")
        .await?;
    Ok(())
}
