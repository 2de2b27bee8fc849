//! Identifier newtypes and the small reference structs handlers pass
//! around.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Telegram chat identifier. Groups and supergroups are negative;
/// supergroups carry a `-100` prefix.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ChatId {
    fn from(id: i64) -> Self {
        ChatId(id)
    }
}

/// Telegram user identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        UserId(id)
    }
}

/// Message identifier, unique within its chat.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct MessageId(pub i32);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for MessageId {
    fn from(id: i32) -> Self {
        MessageId(id)
    }
}

/// Identifier of a duel session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DuelId(pub u64);

impl fmt::Display for DuelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chat classification as reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

/// The chat a message arrived from.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRef {
    pub id: ChatId,
    pub kind: ChatKind,
    pub title: Option<String>,
}

impl ChatRef {
    pub fn is_group(&self) -> bool {
        matches!(self.kind, ChatKind::Group | ChatKind::Supergroup)
    }
}

/// The user behind a message or button press.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRef {
    pub id: UserId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl UserRef {
    /// "first last", or just the first name when no last name is set.
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }

    /// Markdown mention link. A missing last name renders as an empty
    /// segment, so the label always has two parts.
    pub fn mention(&self) -> String {
        format!(
            "[{} {}](tg://user?id={})",
            self.first_name,
            self.last_name.as_deref().unwrap_or(""),
            self.id
        )
    }
}

/// Membership status within a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Banned,
}

/// What the gateway knows about one member of one chat.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberInfo {
    pub user: UserRef,
    pub status: MemberStatus,
    pub can_restrict: bool,
}

impl MemberInfo {
    /// Creators hold every admin right implicitly.
    pub fn may_restrict(&self) -> bool {
        self.status == MemberStatus::Creator || self.can_restrict
    }

    pub fn is_admin(&self) -> bool {
        matches!(
            self.status,
            MemberStatus::Creator | MemberStatus::Administrator
        )
    }
}

/// Identity of an item in the approval queue, derived from the chat and
/// message it was submitted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingId {
    pub chat: ChatId,
    pub message: MessageId,
}

impl PendingId {
    pub fn new(chat: ChatId, message: MessageId) -> Self {
        PendingId { chat, message }
    }

    /// Parses the `"{chat}_{message}"` form. The chat id may itself carry a
    /// leading minus, so the split happens at the last underscore.
    pub fn parse(s: &str) -> Option<Self> {
        let (chat, message) = s.rsplit_once('_')?;
        Some(PendingId {
            chat: ChatId(chat.parse().ok()?),
            message: MessageId(message.parse().ok()?),
        })
    }
}

impl fmt::Display for PendingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.chat, self.message)
    }
}
