//! Fallthrough handling for messages no command or rule consumed.

use tracing::warn;

use crate::events::IncomingMessage;
use crate::state::BotState;
use crate::store::{collections, put_entry};

#[cfg(test)]
#[path = "passive_tests.rs"]
mod passive_tests;

/// Records the sender's username -> id pair when the group opts in with
/// `log_uid`. Never replies; a store failure only logs.
pub async fn log_user_id(state: &BotState, msg: &IncomingMessage) {
    let logging = state
        .config
        .group(msg.chat.id)
        .map(|group| group.log_uid)
        .unwrap_or(false);
    if !logging {
        return;
    }
    let Some(username) = msg.sender.username.as_deref() else {
        return;
    };
    if let Err(err) = put_entry(
        state.store.as_ref(),
        collections::USER_IDS,
        username,
        &msg.sender.id,
    )
    .await
    {
        warn!(chat = %msg.chat.id, username, %err, "failed to record user id");
    }
}
