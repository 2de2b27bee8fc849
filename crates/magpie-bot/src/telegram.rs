//! Bot API transport behind [`Gateway`].
//!
//! A thin request-building layer over teloxide. Every failure is
//! flattened into [`BotError::Gateway`] so the engine sees one error
//! shape regardless of what went wrong on the wire.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use teloxide::net::Download;
use teloxide::prelude::Requester;
use teloxide::types::{
    ChatAction, ChatMemberKind, ChatPermissions, InlineKeyboardButton, InlineKeyboardButtonKind,
    InlineKeyboardMarkup, InputFile, ParseMode, ReplyParameters,
};
use teloxide::Bot;

use magpie_core::error::{BotError, Result};
use magpie_core::gateway::{Gateway, Keyboard, MemberPermissions};
use magpie_core::types::{ChatId, MemberInfo, MemberStatus, MessageId, UserId};

use crate::inbound;

pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn gateway_err(err: impl std::fmt::Display) -> BotError {
    BotError::Gateway(err.to_string())
}

fn tg_chat(chat: ChatId) -> teloxide::types::ChatId {
    teloxide::types::ChatId(chat.0)
}

fn tg_message(id: MessageId) -> teloxide::types::MessageId {
    teloxide::types::MessageId(id.0)
}

fn tg_user(user: UserId) -> teloxide::types::UserId {
    teloxide::types::UserId(user.0 as u64)
}

fn inline_keyboard(keyboard: Keyboard) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = keyboard
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|button| {
                    InlineKeyboardButton::new(
                        button.text,
                        InlineKeyboardButtonKind::CallbackData(button.data),
                    )
                })
                .collect()
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

/// Expands the four permission switches into the Bot API bitfield.
/// Previews travel with the "other" switch, matching how restrictions
/// were toggled before polls grew their own flag.
fn chat_permissions(perms: MemberPermissions) -> ChatPermissions {
    let mut result = ChatPermissions::empty();
    if perms.send_messages {
        result |= ChatPermissions::SEND_MESSAGES;
    }
    if perms.send_media {
        result |= ChatPermissions::SEND_AUDIOS
            | ChatPermissions::SEND_DOCUMENTS
            | ChatPermissions::SEND_PHOTOS
            | ChatPermissions::SEND_VIDEOS
            | ChatPermissions::SEND_VIDEO_NOTES
            | ChatPermissions::SEND_VOICE_NOTES;
    }
    if perms.send_polls {
        result |= ChatPermissions::SEND_POLLS;
    }
    if perms.send_other {
        result |= ChatPermissions::SEND_OTHER_MESSAGES | ChatPermissions::ADD_WEB_PAGE_PREVIEWS;
    }
    result
}

fn convert_member(member: &teloxide::types::ChatMember) -> MemberInfo {
    let (status, can_restrict) = match &member.kind {
        ChatMemberKind::Owner(_) => (MemberStatus::Creator, true),
        ChatMemberKind::Administrator(admin) => {
            (MemberStatus::Administrator, admin.can_restrict_members)
        }
        ChatMemberKind::Member => (MemberStatus::Member, false),
        ChatMemberKind::Restricted(_) => (MemberStatus::Restricted, false),
        ChatMemberKind::Left => (MemberStatus::Left, false),
        ChatMemberKind::Banned(_) => (MemberStatus::Banned, false),
    };
    MemberInfo {
        user: inbound::user_ref(&member.user),
        status,
        can_restrict,
    }
}

#[async_trait]
impl Gateway for TelegramGateway {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<MessageId> {
        let sent = self
            .bot
            .send_message(tg_chat(chat), text)
            .await
            .map_err(gateway_err)?;
        Ok(MessageId(sent.id.0))
    }

    async fn send_markdown(&self, chat: ChatId, text: &str) -> Result<MessageId> {
        let mut req = self.bot.send_message(tg_chat(chat), text);
        req.parse_mode = Some(ParseMode::Markdown);
        let sent = req.await.map_err(gateway_err)?;
        Ok(MessageId(sent.id.0))
    }

    async fn reply_text(&self, chat: ChatId, to: MessageId, text: &str) -> Result<MessageId> {
        let mut req = self.bot.send_message(tg_chat(chat), text);
        req.reply_parameters = Some(ReplyParameters::new(tg_message(to)));
        let sent = req.await.map_err(gateway_err)?;
        Ok(MessageId(sent.id.0))
    }

    async fn reply_markdown(&self, chat: ChatId, to: MessageId, text: &str) -> Result<MessageId> {
        let mut req = self.bot.send_message(tg_chat(chat), text);
        req.parse_mode = Some(ParseMode::Markdown);
        req.reply_parameters = Some(ReplyParameters::new(tg_message(to)));
        let sent = req.await.map_err(gateway_err)?;
        Ok(MessageId(sent.id.0))
    }

    async fn send_sticker(&self, chat: ChatId, file_id: &str) -> Result<MessageId> {
        let sent = self
            .bot
            .send_sticker(tg_chat(chat), InputFile::file_id(file_id))
            .await
            .map_err(gateway_err)?;
        Ok(MessageId(sent.id.0))
    }

    async fn reply_sticker(
        &self,
        chat: ChatId,
        to: MessageId,
        file_id: &str,
    ) -> Result<MessageId> {
        let mut req = self
            .bot
            .send_sticker(tg_chat(chat), InputFile::file_id(file_id));
        req.reply_parameters = Some(ReplyParameters::new(tg_message(to)));
        let sent = req.await.map_err(gateway_err)?;
        Ok(MessageId(sent.id.0))
    }

    async fn send_animation(
        &self,
        chat: ChatId,
        url: &str,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId> {
        let parsed = url::Url::parse(url).map_err(gateway_err)?;
        let mut req = self.bot.send_animation(tg_chat(chat), InputFile::url(parsed));
        if let Some(to) = reply_to {
            req.reply_parameters = Some(ReplyParameters::new(tg_message(to)));
        }
        let sent = req.await.map_err(gateway_err)?;
        Ok(MessageId(sent.id.0))
    }

    async fn notify_uploading(&self, chat: ChatId) -> Result<()> {
        self.bot
            .send_chat_action(tg_chat(chat), ChatAction::UploadPhoto)
            .await
            .map_err(gateway_err)?;
        Ok(())
    }

    async fn send_buttons(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Keyboard,
    ) -> Result<MessageId> {
        let mut req = self.bot.send_message(tg_chat(chat), text);
        req.reply_markup = Some(teloxide::types::ReplyMarkup::InlineKeyboard(
            inline_keyboard(keyboard),
        ));
        let sent = req.await.map_err(gateway_err)?;
        Ok(MessageId(sent.id.0))
    }

    async fn edit_text(&self, chat: ChatId, message: MessageId, text: &str) -> Result<()> {
        self.bot
            .edit_message_text(tg_chat(chat), tg_message(message), text)
            .await
            .map_err(gateway_err)?;
        Ok(())
    }

    async fn edit_buttons(
        &self,
        chat: ChatId,
        message: MessageId,
        text: &str,
        keyboard: Keyboard,
    ) -> Result<()> {
        let mut req = self
            .bot
            .edit_message_text(tg_chat(chat), tg_message(message), text);
        req.reply_markup = Some(inline_keyboard(keyboard));
        req.await.map_err(gateway_err)?;
        Ok(())
    }

    async fn forward(&self, to: ChatId, from: ChatId, message: MessageId) -> Result<MessageId> {
        let sent = self
            .bot
            .forward_message(tg_chat(to), tg_chat(from), tg_message(message))
            .await
            .map_err(gateway_err)?;
        Ok(MessageId(sent.id.0))
    }

    async fn pin(&self, chat: ChatId, message: MessageId, notify: bool) -> Result<()> {
        let mut req = self.bot.pin_chat_message(tg_chat(chat), tg_message(message));
        req.disable_notification = Some(!notify);
        req.await.map_err(gateway_err)?;
        Ok(())
    }

    async fn unpin(&self, chat: ChatId) -> Result<()> {
        self.bot
            .unpin_chat_message(tg_chat(chat))
            .await
            .map_err(gateway_err)?;
        Ok(())
    }

    async fn set_title(&self, chat: ChatId, title: &str) -> Result<()> {
        self.bot
            .set_chat_title(tg_chat(chat), title)
            .await
            .map_err(gateway_err)?;
        Ok(())
    }

    async fn set_photo(&self, chat: ChatId, file_id: &str) -> Result<()> {
        // setChatPhoto refuses file ids, so the bytes take a round trip
        // through this process.
        let file = self.bot.get_file(file_id).await.map_err(gateway_err)?;
        let mut bytes: Vec<u8> = Vec::new();
        self.bot
            .download_file(&file.path, &mut bytes)
            .await
            .map_err(gateway_err)?;
        self.bot
            .set_chat_photo(tg_chat(chat), InputFile::memory(bytes))
            .await
            .map_err(gateway_err)?;
        Ok(())
    }

    async fn restrict(
        &self,
        chat: ChatId,
        user: UserId,
        perms: MemberPermissions,
        until: Option<Duration>,
    ) -> Result<()> {
        let mut req =
            self.bot
                .restrict_chat_member(tg_chat(chat), tg_user(user), chat_permissions(perms));
        if let Some(until) = until {
            let deadline = Utc::now().timestamp() + until.as_secs() as i64;
            if let Some(date) = DateTime::<Utc>::from_timestamp(deadline, 0) {
                req.until_date = Some(date);
            }
        }
        req.await.map_err(gateway_err)?;
        Ok(())
    }

    async fn kick(&self, chat: ChatId, user: UserId) -> Result<()> {
        self.bot
            .ban_chat_member(tg_chat(chat), tg_user(user))
            .await
            .map_err(gateway_err)?;
        Ok(())
    }

    async fn member(&self, chat: ChatId, user: UserId) -> Result<MemberInfo> {
        let member = self
            .bot
            .get_chat_member(tg_chat(chat), tg_user(user))
            .await
            .map_err(gateway_err)?;
        Ok(convert_member(&member))
    }

    async fn member_count(&self, chat: ChatId) -> Result<u32> {
        self.bot
            .get_chat_member_count(tg_chat(chat))
            .await
            .map_err(gateway_err)
    }

    async fn chat_title(&self, chat: ChatId) -> Result<String> {
        let info = self.bot.get_chat(tg_chat(chat)).await.map_err(gateway_err)?;
        Ok(info.title().unwrap_or_default().to_string())
    }
}
