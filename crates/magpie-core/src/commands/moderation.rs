//! Moderator prompts and decision handling for submitted items.

use tracing::warn;

use crate::approvals::{callback_data, ApprovalKind, Decision, Prompt};
use crate::error::Result;
use crate::events::CallbackPress;
use crate::gateway::{Button, Keyboard};
use crate::state::{BotState, PostSubmission, QuoteSubmission};
use crate::store::{collections, put_entry};
use crate::types::{ChatId, MessageId, PendingId, UserRef};

#[cfg(test)]
#[path = "moderation_tests.rs"]
mod moderation_tests;

fn verdict_keyboard(kind: ApprovalKind, id: PendingId) -> Keyboard {
    vec![vec![
        Button::new("Approve", callback_data(Decision::Approve, kind, id)),
        Button::new("Decline", callback_data(Decision::Decline, kind, id)),
    ]]
}

/// Sends every moderator a preview of the submitted quote with decision
/// buttons. One unreachable moderator does not block the rest.
pub async fn announce_quote(state: &BotState, id: PendingId, submission: &QuoteSubmission) {
    let preview = format!(
        "Quote submission {}:\nBy {}:\n{}",
        submission.key, submission.quote.author, submission.quote.text
    );
    for chat in state.config.moderator_chats() {
        match state
            .gateway
            .send_buttons(chat, &preview, verdict_keyboard(ApprovalKind::Quote, id))
            .await
        {
            Ok(message) => {
                state
                    .quote_queue
                    .record_prompt(id, Prompt { chat, message })
                    .await;
            }
            Err(err) => warn!(%chat, %err, "failed to send quote prompt to moderator"),
        }
    }
}

/// Forwards the post candidate to every moderator, followed by the
/// decision prompt.
pub async fn announce_post(state: &BotState, id: PendingId, submission: &PostSubmission) {
    let prompt_text = format!("Post submission {id}:");
    for chat in state.config.moderator_chats() {
        if let Err(err) = state
            .gateway
            .forward(chat, submission.source_chat, submission.message)
            .await
        {
            warn!(%chat, %err, "failed to forward post candidate to moderator");
            continue;
        }
        match state
            .gateway
            .send_buttons(chat, &prompt_text, verdict_keyboard(ApprovalKind::Post, id))
            .await
        {
            Ok(message) => {
                state
                    .post_queue
                    .record_prompt(id, Prompt { chat, message })
                    .await;
            }
            Err(err) => warn!(%chat, %err, "failed to send post prompt to moderator"),
        }
    }
}

/// Applies one moderator's decision. The queue removal decides races;
/// the loser of a double press gets `NotFound` back.
pub async fn resolve(
    state: &BotState,
    press: &CallbackPress,
    decision: Decision,
    kind: ApprovalKind,
    id: PendingId,
) -> Result<()> {
    // Prompts only go to moderator chats, so anything else is forged data.
    if !state.config.is_moderator(press.presser.id) {
        warn!(presser = %press.presser.id, "verdict press from a non-moderator");
        return Ok(());
    }
    match kind {
        ApprovalKind::Quote => {
            let pending = state.quote_queue.resolve(id, decision).await?;
            let submission = &pending.payload;
            if decision == Decision::Approve {
                put_entry(
                    state.store.as_ref(),
                    collections::QUOTES,
                    &submission.key,
                    &submission.quote,
                )
                .await?;
            }
            let verdict = match decision {
                Decision::Approve => "Quote approved.",
                Decision::Decline => "Quote declined.",
            };
            notify_submitter(state, submission.origin_chat, submission.origin_message, verdict)
                .await;
            close_prompts(state, &pending.prompts, decision, &press.presser).await;
        }
        ApprovalKind::Post => {
            let pending = state.post_queue.resolve(id, decision).await?;
            let submission = &pending.payload;
            if decision == Decision::Approve {
                state
                    .gateway
                    .forward(submission.channel, submission.source_chat, submission.message)
                    .await?;
            }
            let verdict = match decision {
                Decision::Approve => "Post approved.",
                Decision::Decline => "Post declined.",
            };
            notify_submitter(state, submission.origin_chat, submission.origin_message, verdict)
                .await;
            close_prompts(state, &pending.prompts, decision, &press.presser).await;
        }
    }
    Ok(())
}

async fn notify_submitter(state: &BotState, chat: ChatId, message: MessageId, verdict: &str) {
    if let Err(err) = state.gateway.reply_text(chat, message, verdict).await {
        warn!(%chat, %err, "failed to notify submitter of the verdict");
    }
}

/// Rewrites every moderator prompt so nobody acts on a settled item.
async fn close_prompts(
    state: &BotState,
    prompts: &[Prompt],
    decision: Decision,
    resolver: &UserRef,
) {
    let verb = match decision {
        Decision::Approve => "Approved",
        Decision::Decline => "Declined",
    };
    let text = format!("{} by {}", verb, resolver.full_name());
    for prompt in prompts {
        if let Err(err) = state
            .gateway
            .edit_text(prompt.chat, prompt.message, &text)
            .await
        {
            warn!(chat = %prompt.chat, %err, "failed to close moderator prompt");
        }
    }
}
