//! Transport seam between the engine and the chat platform.
//!
//! Handlers never talk to the Telegram API directly. They go through
//! [`Gateway`], which keeps the engine testable and keeps transport
//! failures inside [`BotError::Gateway`](crate::error::BotError::Gateway).

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;
use crate::types::{ChatId, MemberInfo, MessageId, UserId};

/// One inline keyboard button. `data` comes back verbatim in the
/// callback press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub data: String,
}

impl Button {
    pub fn new(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            data: data.into(),
        }
    }
}

/// Rows of inline buttons attached to a message.
pub type Keyboard = Vec<Vec<Button>>;

/// What a restricted member may still do. Anything not listed here
/// (invites, pins, info edits) is always withheld while restricted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberPermissions {
    pub send_messages: bool,
    pub send_media: bool,
    pub send_polls: bool,
    pub send_other: bool,
}

impl MemberPermissions {
    /// Full mute.
    pub const fn none() -> Self {
        Self {
            send_messages: false,
            send_media: false,
            send_polls: false,
            send_other: false,
        }
    }

    /// Plain text only; media, polls and stickers stay blocked.
    pub const fn text_only() -> Self {
        Self {
            send_messages: true,
            send_media: false,
            send_polls: false,
            send_other: false,
        }
    }

    /// Everything back on. Restricting with this lifts a restriction.
    pub const fn all() -> Self {
        Self {
            send_messages: true,
            send_media: true,
            send_polls: true,
            send_other: true,
        }
    }
}

/// Outbound chat operations the engine relies on.
///
/// Send methods return the id of the created message so callers can
/// edit or pin it later.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<MessageId>;

    async fn send_markdown(&self, chat: ChatId, text: &str) -> Result<MessageId>;

    async fn reply_text(&self, chat: ChatId, to: MessageId, text: &str) -> Result<MessageId>;

    async fn reply_markdown(&self, chat: ChatId, to: MessageId, text: &str) -> Result<MessageId>;

    async fn send_sticker(&self, chat: ChatId, file_id: &str) -> Result<MessageId>;

    async fn reply_sticker(&self, chat: ChatId, to: MessageId, file_id: &str)
        -> Result<MessageId>;

    async fn send_animation(
        &self,
        chat: ChatId,
        url: &str,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId>;

    /// Shows the chat an upload-in-progress indicator.
    async fn notify_uploading(&self, chat: ChatId) -> Result<()>;

    async fn send_buttons(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Keyboard,
    ) -> Result<MessageId>;

    /// Replaces the text of an existing message. The inline keyboard,
    /// if any, is removed.
    async fn edit_text(&self, chat: ChatId, message: MessageId, text: &str) -> Result<()>;

    /// Replaces both the text and the inline keyboard of a message.
    async fn edit_buttons(
        &self,
        chat: ChatId,
        message: MessageId,
        text: &str,
        keyboard: Keyboard,
    ) -> Result<()>;

    async fn forward(&self, to: ChatId, from: ChatId, message: MessageId) -> Result<MessageId>;

    async fn pin(&self, chat: ChatId, message: MessageId, notify: bool) -> Result<()>;

    /// Unpins the most recently pinned message.
    async fn unpin(&self, chat: ChatId) -> Result<()>;

    async fn set_title(&self, chat: ChatId, title: &str) -> Result<()>;

    /// Downloads the photo behind `file_id` and installs it as the
    /// chat picture.
    async fn set_photo(&self, chat: ChatId, file_id: &str) -> Result<()>;

    /// Applies `perms` to a member, optionally only for `until`. With
    /// no deadline the restriction stays until changed again.
    async fn restrict(
        &self,
        chat: ChatId,
        user: UserId,
        perms: MemberPermissions,
        until: Option<Duration>,
    ) -> Result<()>;

    /// Removes a member from the chat.
    async fn kick(&self, chat: ChatId, user: UserId) -> Result<()>;

    async fn member(&self, chat: ChatId, user: UserId) -> Result<MemberInfo>;

    async fn member_count(&self, chat: ChatId) -> Result<u32>;

    async fn chat_title(&self, chat: ChatId) -> Result<String>;
}

/// Animated GIF search. Returns direct media URLs, best match first.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search_gifs(&self, keyword: &str) -> Result<Vec<String>>;
}

/// Latest trade data for one ticker symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct StockQuote {
    pub name: String,
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
}

#[async_trait]
pub trait StockProvider: Send + Sync {
    async fn last_trade(&self, ticker: &str) -> Result<StockQuote>;
}
