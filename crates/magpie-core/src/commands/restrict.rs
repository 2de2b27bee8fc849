//! The jail: muting members, picture bans, and releases.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::commands::misc::args;
use crate::dispatch::{STICKER_JAIL, STICKER_REFUSE, STICKER_RELEASE};
use crate::durations::parse_duration;
use crate::error::{BotError, Refusal, Result};
use crate::events::IncomingMessage;
use crate::gateway::MemberPermissions;
use crate::scheduler::JobKey;
use crate::state::BotState;
use crate::types::{ChatId, MemberStatus, UserRef};

#[cfg(test)]
#[path = "restrict_tests.rs"]
mod restrict_tests;

pub async fn ban(state: &BotState, msg: &IncomingMessage) -> Result<()> {
    restrict_target(
        state,
        msg,
        "Usage:\n\nReplying to the user you wish to ban.\n/ban [Ban Time]\n",
        MemberPermissions::none(),
        "跟我乖乖到小黑屋里走一趟吧",
    )
    .await
}

pub async fn banpic(state: &BotState, msg: &IncomingMessage) -> Result<()> {
    restrict_target(
        state,
        msg,
        "Usage:\n\nReplying to the user you wish to ban.\n/banpic [Ban Time]\n",
        MemberPermissions::text_only(),
        "把头伸过来，我给你加个不能发图的buff",
    )
    .await
}

async fn restrict_target(
    state: &BotState,
    msg: &IncomingMessage,
    usage: &'static str,
    perms: MemberPermissions,
    sentence: &str,
) -> Result<()> {
    let replied = msg.reply_to.as_ref().ok_or(BotError::Usage(usage))?;
    let chat = msg.chat.id;
    // Fresh lookup; the replied message may predate a status change.
    let member = state.gateway.member(chat, replied.sender.id).await?;
    if member.is_admin() {
        return Err(BotError::Permission(Refusal {
            message: "呃呃，我没有处理管理员的权限啊！",
            sticker: Some(STICKER_REFUSE),
            sticker_as_reply: false,
        }));
    }
    let target = member.user;
    state.gateway.restrict(chat, target.id, perms, None).await?;
    state
        .gateway
        .reply_markdown(chat, msg.id, &format!("{} {}", target.mention(), sentence))
        .await?;
    state.gateway.send_sticker(chat, STICKER_JAIL).await?;

    let Some(arg) = args(msg).first() else {
        return Ok(());
    };
    let delay = parse_duration(arg).ok_or(BotError::Usage(usage))?;
    schedule_release(state, chat, target, delay);
    Ok(())
}

/// Lifts the restriction after `delay` and announces the release. A
/// later ban of the same member replaces the pending release.
fn schedule_release(state: &BotState, chat: ChatId, target: UserRef, delay: Duration) {
    let gateway = Arc::clone(&state.gateway);
    state
        .jobs
        .schedule_keyed(JobKey::Unban(chat, target.id), delay, move || async move {
            if let Err(err) = gateway
                .restrict(chat, target.id, MemberPermissions::all(), None)
                .await
            {
                warn!(%chat, user = %target.id, %err, "failed to lift restriction");
                return;
            }
            let text = format!("{} 刑满释放了！", target.mention());
            if let Err(err) = gateway.send_markdown(chat, &text).await {
                warn!(%chat, %err, "failed to announce release");
            }
            if let Err(err) = gateway.send_sticker(chat, STICKER_RELEASE).await {
                warn!(%chat, %err, "failed to send release sticker");
            }
        });
}

pub async fn unban(state: &BotState, msg: &IncomingMessage) -> Result<()> {
    let replied = msg.reply_to.as_ref().ok_or(BotError::Usage(
        "Usage:\n\nReplying to the user you wish to unban.\n/unban\n",
    ))?;
    let chat = msg.chat.id;
    let member = state.gateway.member(chat, replied.sender.id).await?;
    if member.status != MemberStatus::Restricted {
        return Err(BotError::Permission(Refusal {
            message: "呃呃，他就不在小黑屋里面啊",
            sticker: Some(STICKER_REFUSE),
            sticker_as_reply: false,
        }));
    }
    let target = member.user;
    state
        .gateway
        .restrict(chat, target.id, MemberPermissions::all(), None)
        .await?;
    state
        .gateway
        .reply_markdown(
            chat,
            msg.id,
            &format!("{} 从小黑屋里放出来了！", target.mention()),
        )
        .await?;
    state.gateway.send_sticker(chat, STICKER_RELEASE).await?;
    state.jobs.cancel_key(JobKey::Unban(chat, target.id));
    Ok(())
}
