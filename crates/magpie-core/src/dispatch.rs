//! Update routing: commands, configured actions, trigger rules, and
//! button presses.
//!
//! Commands live in an explicit registration table. Each entry names
//! its guard chain; guards run in order before the handler body, and
//! the first failing one produces the reply. A message consumed by a
//! command or trigger rule never reaches the passive id logger.

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, error, warn};

use crate::approvals;
use crate::commands::{
    actions, admin, duel as duel_commands, misc, moderation, passive, posts,
    quotes as quote_commands, restrict, rules_admin,
};
use crate::duel;
use crate::error::{BotError, Refusal, Result};
use crate::events::{CallbackPress, IncomingMessage, MessageBody};
use crate::quotes;
use crate::state::BotState;

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod dispatch_tests;

/// Sticker sent when a non-owner uses an owner command.
pub const STICKER_REFUSE: &str = "CAADBQADJwEAAgsiPA5l3hNO8JyiPAI";
/// Sticker sent with restriction refusals and ban confirmations.
pub const STICKER_JAIL: &str = "CAADBQADJwIAAgsiPA7OflnL6kErDgI";
/// Sticker sent when a restriction is lifted.
pub const STICKER_RELEASE: &str = "CAADBQADbAEAAgsiPA5ZwMJd8rkuxgI";

/// Access checks evaluated before a command handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// The chat must be a group or supergroup.
    GroupOnly,
    /// The sender must be the configured owner.
    OwnerOnly,
    /// The sender must be the chat creator or hold the restrict right.
    RestrictCapable,
}

type Handler = fn(Arc<BotState>, IncomingMessage) -> BoxFuture<'static, Result<()>>;

struct CommandSpec {
    name: &'static str,
    guards: &'static [Guard],
    run: Handler,
}

static COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "start",
        guards: &[],
        run: |state, msg| Box::pin(async move { misc::start(&state, &msg).await }),
    },
    CommandSpec {
        name: "getgid",
        guards: &[Guard::GroupOnly],
        run: |state, msg| Box::pin(async move { misc::getgid(&state, &msg).await }),
    },
    CommandSpec {
        name: "settitle",
        guards: &[Guard::GroupOnly],
        run: |state, msg| Box::pin(async move { admin::settitle(&state, &msg).await }),
    },
    CommandSpec {
        name: "resettitle",
        guards: &[Guard::GroupOnly],
        run: |state, msg| Box::pin(async move { admin::resettitle(&state, &msg).await }),
    },
    CommandSpec {
        name: "setpic",
        guards: &[Guard::GroupOnly],
        run: |state, msg| Box::pin(async move { admin::setpic(&state, &msg).await }),
    },
    CommandSpec {
        name: "pin",
        guards: &[Guard::GroupOnly],
        run: |state, msg| Box::pin(async move { admin::pin(&state, &msg).await }),
    },
    CommandSpec {
        name: "unpin",
        guards: &[Guard::GroupOnly],
        run: |state, msg| Box::pin(async move { admin::unpin(&state, &msg).await }),
    },
    CommandSpec {
        name: "help",
        guards: &[],
        run: |state, msg| Box::pin(async move { misc::help(&state, &msg).await }),
    },
    CommandSpec {
        name: "actions",
        guards: &[],
        run: |state, msg| Box::pin(async move { misc::actions_list(&state, &msg).await }),
    },
    CommandSpec {
        name: "getsid",
        guards: &[],
        run: |state, msg| Box::pin(async move { misc::getsid(&state, &msg).await }),
    },
    CommandSpec {
        name: "getuid",
        guards: &[],
        run: |state, msg| Box::pin(async move { misc::getuid(&state, &msg).await }),
    },
    CommandSpec {
        name: "addquote",
        guards: &[],
        run: |state, msg| Box::pin(async move { quote_commands::addquote(&state, &msg).await }),
    },
    CommandSpec {
        name: "quote",
        guards: &[],
        run: |state, msg| Box::pin(async move { quote_commands::quote(&state, &msg).await }),
    },
    CommandSpec {
        name: "lsquotes",
        guards: &[],
        run: |state, msg| Box::pin(async move { quote_commands::lsquotes(&state, &msg).await }),
    },
    CommandSpec {
        name: "rmquote",
        guards: &[],
        run: |state, msg| Box::pin(async move { quote_commands::rmquote(&state, &msg).await }),
    },
    CommandSpec {
        name: "setsres",
        guards: &[Guard::OwnerOnly],
        run: |state, msg| Box::pin(async move { rules_admin::setsres(&state, &msg).await }),
    },
    CommandSpec {
        name: "delsres",
        guards: &[Guard::OwnerOnly],
        run: |state, msg| Box::pin(async move { rules_admin::delsres(&state, &msg).await }),
    },
    CommandSpec {
        name: "lssres",
        guards: &[Guard::OwnerOnly],
        run: |state, msg| Box::pin(async move { rules_admin::lssres(&state, &msg).await }),
    },
    CommandSpec {
        name: "settres",
        guards: &[Guard::OwnerOnly],
        run: |state, msg| Box::pin(async move { rules_admin::settres(&state, &msg).await }),
    },
    CommandSpec {
        name: "deltres",
        guards: &[Guard::OwnerOnly],
        run: |state, msg| Box::pin(async move { rules_admin::deltres(&state, &msg).await }),
    },
    CommandSpec {
        name: "ban",
        guards: &[Guard::GroupOnly, Guard::RestrictCapable],
        run: |state, msg| Box::pin(async move { restrict::ban(&state, &msg).await }),
    },
    CommandSpec {
        name: "banpic",
        guards: &[Guard::GroupOnly, Guard::RestrictCapable],
        run: |state, msg| Box::pin(async move { restrict::banpic(&state, &msg).await }),
    },
    CommandSpec {
        name: "unban",
        guards: &[Guard::GroupOnly, Guard::RestrictCapable],
        run: |state, msg| Box::pin(async move { restrict::unban(&state, &msg).await }),
    },
    CommandSpec {
        name: "lstres",
        guards: &[Guard::OwnerOnly],
        run: |state, msg| Box::pin(async move { rules_admin::lstres(&state, &msg).await }),
    },
    CommandSpec {
        name: "shows",
        guards: &[],
        run: |state, msg| Box::pin(async move { misc::shows(&state, &msg).await }),
    },
    CommandSpec {
        name: "stock",
        guards: &[],
        run: |state, msg| Box::pin(async move { misc::stock(&state, &msg).await }),
    },
    CommandSpec {
        name: "post",
        guards: &[Guard::GroupOnly],
        run: |state, msg| Box::pin(async move { posts::post(&state, &msg).await }),
    },
    CommandSpec {
        name: "duel",
        guards: &[Guard::GroupOnly],
        run: |state, msg| Box::pin(async move { duel_commands::challenge(&state, &msg).await }),
    },
];

/// Routes inbound updates to handlers and maps handler errors to
/// replies.
#[derive(Clone)]
pub struct Dispatcher {
    state: Arc<BotState>,
}

impl Dispatcher {
    pub fn new(state: Arc<BotState>) -> Self {
        Self { state }
    }

    /// Routes one message. Never fails; everything user-visible goes
    /// through the error boundary.
    pub async fn handle_message(&self, msg: IncomingMessage) {
        match &msg.body {
            MessageBody::Command { name, .. } => {
                let Some(name) = self.resolve_command(name) else {
                    return;
                };
                if let Some(spec) = COMMANDS.iter().find(|spec| spec.name == name) {
                    debug!(command = %name, chat = %msg.chat.id, "command dispatched");
                    let outcome = match self.check_guards(spec.guards, &msg).await {
                        Ok(()) => (spec.run)(Arc::clone(&self.state), msg.clone()).await,
                        Err(err) => Err(err),
                    };
                    self.report(&msg, outcome).await;
                    debug!(command = %name, chat = %msg.chat.id, "command finished");
                } else if self.state.config.actions.contains_key(&name) {
                    debug!(command = %name, chat = %msg.chat.id, "action dispatched");
                    let outcome = actions::run(&self.state, &msg, &name).await;
                    self.report(&msg, outcome).await;
                } else {
                    // Unknown commands fall through to the id logger only.
                    passive::log_user_id(&self.state, &msg).await;
                }
            }
            MessageBody::Text(text) => match self.state.text_rules.first_match(text).await {
                Some(rule) => {
                    let outcome = self.state.engine.respond(msg.chat.id, msg.id, &rule).await;
                    self.report(&msg, outcome).await;
                }
                None => passive::log_user_id(&self.state, &msg).await,
            },
            MessageBody::Sticker { file_id } => {
                // Stickers are logged before the rule lookup.
                passive::log_user_id(&self.state, &msg).await;
                let rule = self.state.sticker_rules.read().await.get(file_id).cloned();
                if let Some(rule) = rule {
                    let outcome = self.state.engine.respond(msg.chat.id, msg.id, &rule).await;
                    self.report(&msg, outcome).await;
                }
            }
            MessageBody::Other => passive::log_user_id(&self.state, &msg).await,
        }
    }

    /// Routes one button press. The data prefix picks the subsystem;
    /// unrecognized data is dropped.
    pub async fn handle_callback(&self, press: CallbackPress) {
        debug!(chat = %press.chat, data = %press.data, "callback dispatched");
        let outcome = if let Some(direction) = quotes::parse_callback(&press.data) {
            self.state
                .listings
                .turn(press.chat, press.message, direction)
                .await
        } else if let Some((decision, kind, id)) = approvals::parse_callback(&press.data) {
            moderation::resolve(&self.state, &press, decision, kind, id).await
        } else if let Some((action, id)) = duel::parse_callback(&press.data) {
            match action {
                duel::DuelAction::Accept => self.state.arena.accept(id, &press.presser).await,
                duel::DuelAction::Decline => self.state.arena.decline(id, &press.presser).await,
            }
        } else {
            warn!(data = %press.data, "unrecognized callback data");
            Ok(())
        };
        self.report_callback(&press, outcome).await;
    }

    /// Strips an optional `@botname` suffix. `None` when the command
    /// is addressed to a different bot.
    fn resolve_command(&self, raw: &str) -> Option<String> {
        match raw.split_once('@') {
            None => Some(raw.to_string()),
            Some((name, bot)) if bot.eq_ignore_ascii_case(&self.state.bot_username) => {
                Some(name.to_string())
            }
            Some(_) => None,
        }
    }

    async fn check_guards(&self, guards: &[Guard], msg: &IncomingMessage) -> Result<()> {
        for guard in guards {
            match guard {
                Guard::GroupOnly => {
                    if !msg.chat.is_group() {
                        return Err(BotError::Usage("Current chat is not a group\n"));
                    }
                }
                Guard::OwnerOnly => {
                    if !self.state.config.is_owner(msg.sender.id) {
                        return Err(BotError::Permission(Refusal {
                            message: "呃……这个我只能听我家主人说了算",
                            sticker: Some(STICKER_REFUSE),
                            sticker_as_reply: true,
                        }));
                    }
                }
                Guard::RestrictCapable => {
                    let member = self
                        .state
                        .gateway
                        .member(msg.chat.id, msg.sender.id)
                        .await?;
                    if !member.may_restrict() {
                        return Err(BotError::Permission(Refusal {
                            message: "你没有管理小黑屋的权限哦",
                            sticker: Some(STICKER_JAIL),
                            sticker_as_reply: false,
                        }));
                    }
                }
            }
        }
        Ok(())
    }

    /// Maps a handler error to its user-visible reply. Delivery
    /// failures are logged, not retried.
    async fn report(&self, msg: &IncomingMessage, outcome: Result<()>) {
        let Err(err) = outcome else { return };
        if let Err(send_err) = self.deliver(msg, &err).await {
            error!(chat = %msg.chat.id, %send_err, "failed to deliver error reply");
        }
    }

    async fn deliver(&self, msg: &IncomingMessage, err: &BotError) -> Result<()> {
        let gateway = self.state.gateway.as_ref();
        let chat = msg.chat.id;
        match err {
            BotError::Usage(text) | BotError::NotFound(text) | BotError::Duplicate(text) => {
                gateway.reply_text(chat, msg.id, text).await?;
            }
            BotError::Permission(refusal) => {
                gateway.reply_text(chat, msg.id, refusal.message).await?;
                if let Some(sticker) = refusal.sticker {
                    if refusal.sticker_as_reply {
                        gateway.reply_sticker(chat, msg.id, sticker).await?;
                    } else {
                        gateway.send_sticker(chat, sticker).await?;
                    }
                }
            }
            BotError::NoResults(_) => {
                gateway.reply_text(chat, msg.id, &err.to_string()).await?;
            }
            BotError::Store(_) | BotError::Gateway(_) | BotError::Search(_)
            | BotError::Stock(_) => {
                error!(%chat, %err, "handler failed");
                gateway
                    .reply_text(chat, msg.id, &format!("Exception: {err}"))
                    .await?;
            }
        }
        Ok(())
    }

    /// Callback errors go to the chat holding the pressed message;
    /// there is no invoking message to reply to.
    async fn report_callback(&self, press: &CallbackPress, outcome: Result<()>) {
        let Err(err) = outcome else { return };
        let text = match &err {
            BotError::Store(_) | BotError::Gateway(_) | BotError::Search(_)
            | BotError::Stock(_) => {
                error!(chat = %press.chat, %err, "callback handler failed");
                format!("Exception: {err}")
            }
            other => other.to_string(),
        };
        if let Err(send_err) = self.state.gateway.send_text(press.chat, &text).await {
            error!(chat = %press.chat, %send_err, "failed to deliver callback error");
        }
    }
}
