//! The /duel challenge command. Everything after the challenge runs in
//! the arena, driven by button presses and scheduler rounds.

use crate::commands::misc::args;
use crate::error::{BotError, Result};
use crate::events::IncomingMessage;
use crate::state::BotState;

#[cfg(test)]
#[path = "duel_tests.rs"]
mod duel_tests;

pub async fn challenge(state: &BotState, msg: &IncomingMessage) -> Result<()> {
    let replied = msg.reply_to.as_ref().ok_or(BotError::Usage(
        "Usage:\n\nReplying to the user you wish to duel.\n/duel [lethal]\n",
    ))?;
    let lethal = args(msg).first().map(|arg| arg == "lethal").unwrap_or(false);
    state
        .arena
        .propose(
            msg.chat.id,
            msg.sender.clone(),
            replied.sender.clone(),
            lethal,
        )
        .await?;
    Ok(())
}
