//! Conversion from teloxide updates to engine events.
//!
//! Messages without a sender (channel posts, anonymous admins) are
//! dropped here; every handler downstream assumes a concrete user.

use teloxide::types::{CallbackQuery, Message};

use magpie_core::events::{CallbackPress, IncomingMessage, MessageBody, RepliedMessage};
use magpie_core::types::{ChatId, ChatKind, ChatRef, MessageId, UserId, UserRef};

#[cfg(test)]
#[path = "inbound_tests.rs"]
mod inbound_tests;

pub fn convert_message(msg: &Message) -> Option<IncomingMessage> {
    let sender = msg.from.as_ref().map(user_ref)?;
    Some(IncomingMessage {
        chat: chat_ref(&msg.chat),
        sender,
        id: MessageId(msg.id.0),
        body: message_body(msg),
        reply_to: msg.reply_to_message().and_then(replied),
    })
}

pub fn convert_callback(query: &CallbackQuery) -> Option<CallbackPress> {
    let data = query.data.clone()?;
    let message = query.message.as_ref()?;
    Some(CallbackPress {
        chat: ChatId(message.chat().id.0),
        message: MessageId(message.id().0),
        presser: user_ref(&query.from),
        data,
    })
}

fn message_body(msg: &Message) -> MessageBody {
    if let Some(text) = msg.text() {
        return match parse_command(text) {
            Some((name, args)) => MessageBody::Command { name, args },
            None => MessageBody::Text(text.to_string()),
        };
    }
    if let Some(sticker) = msg.sticker() {
        return MessageBody::Sticker {
            file_id: sticker.file.id.clone(),
        };
    }
    MessageBody::Other
}

/// Splits `/name arg arg` into a lowercased command name and its
/// arguments. Any `@botname` suffix stays attached; the engine decides
/// whether the command is addressed to this bot.
pub(crate) fn parse_command(text: &str) -> Option<(String, Vec<String>)> {
    let mut parts = text.split_whitespace();
    let first = parts.next()?;
    let name = first.strip_prefix('/')?;
    if name.is_empty() {
        return None;
    }
    let args = parts.map(str::to_string).collect();
    Some((name.to_lowercase(), args))
}

fn replied(msg: &Message) -> Option<RepliedMessage> {
    let sender = msg.from.as_ref().map(user_ref)?;
    let photos = msg
        .photo()
        .map(|sizes| sizes.iter().map(|p| p.file.id.clone()).collect())
        .unwrap_or_default();
    Some(RepliedMessage {
        chat: ChatId(msg.chat.id.0),
        id: MessageId(msg.id.0),
        sender,
        text: msg.text().map(str::to_string),
        sticker: msg.sticker().map(|s| s.file.id.clone()),
        photos,
    })
}

fn chat_ref(chat: &teloxide::types::Chat) -> ChatRef {
    use teloxide::types::{ChatKind as TgChatKind, PublicChatKind};

    let kind = match chat.kind {
        TgChatKind::Public(ref public) => match public.kind {
            PublicChatKind::Channel(_) => ChatKind::Channel,
            PublicChatKind::Group(_) => ChatKind::Group,
            PublicChatKind::Supergroup(_) => ChatKind::Supergroup,
        },
        TgChatKind::Private(_) => ChatKind::Private,
    };
    ChatRef {
        id: ChatId(chat.id.0),
        kind,
        title: chat.title().map(str::to_string),
    }
}

pub(crate) fn user_ref(user: &teloxide::types::User) -> UserRef {
    UserRef {
        id: UserId(user.id.0 as i64),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
    }
}
