//! Inbound events after conversion from the transport layer.

use crate::types::{ChatId, ChatRef, MessageId, UserRef};

/// A message received from a chat.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub chat: ChatRef,
    pub sender: UserRef,
    pub id: MessageId,
    pub body: MessageBody,
    pub reply_to: Option<RepliedMessage>,
}

#[derive(Debug, Clone)]
pub enum MessageBody {
    /// A slash command with its whitespace-separated arguments.
    Command { name: String, args: Vec<String> },
    Text(String),
    Sticker { file_id: String },
    /// Anything the dispatcher has no specific handling for.
    Other,
}

/// The message an incoming message replies to, reduced to the pieces
/// handlers inspect.
#[derive(Debug, Clone)]
pub struct RepliedMessage {
    pub chat: ChatId,
    pub id: MessageId,
    pub sender: UserRef,
    pub text: Option<String>,
    pub sticker: Option<String>,
    /// Photo size variants, smallest first.
    pub photos: Vec<String>,
}

/// An inline keyboard button press.
#[derive(Debug, Clone)]
pub struct CallbackPress {
    /// Chat holding the message the keyboard is attached to.
    pub chat: ChatId,
    pub message: MessageId,
    pub presser: UserRef,
    pub data: String,
}
