//! Bot configuration.
//!
//! One TOML file carries the secrets, the per-group settings, the watch
//! lists, and the action command table. The two secrets may come from
//! the environment instead, which wins over the file so deployments can
//! keep keys out of the config.

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::types::{ChatId, UserId};
use crate::watch::{CountWatch, MemberWatch};

/// Environment override for the Telegram bot token.
pub const ENV_APIKEY: &str = "MAGPIE_APIKEY";
/// Environment override for the Tenor search key.
pub const ENV_TENOR_KEY: &str = "MAGPIE_TENOR_KEY";

/// Root of the configuration file. Only `owner` is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    /// Telegram bot token.
    #[serde(default)]
    pub apikey: String,
    /// Tenor API key for GIF search.
    #[serde(default)]
    pub tenor_key: String,
    /// The owner's account id. Owner-only commands answer to this
    /// account and watch reports land in its private chat.
    pub owner: i64,
    /// Extra accounts allowed to approve or decline submissions.
    #[serde(default)]
    pub moderators: Vec<i64>,
    /// Per-group settings, keyed by the chat id rendered as a string.
    #[serde(default)]
    pub groups: HashMap<String, GroupConfig>,
    #[serde(default)]
    pub watches: WatchesConfig,
    /// GIF-reaction commands, keyed by command name. Ordered so the
    /// /actions listing is stable.
    #[serde(default)]
    pub actions: BTreeMap<String, ActionConfig>,
}

/// Settings for one group. Table keys under `[groups]` are chat ids
/// rendered as strings, minus sign included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    /// Glued onto titles set with /settitle, and the title a delayed
    /// reset falls back to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_prefix: Option<String>,
    /// Seconds before a /settitle change reverts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_reset_delay: Option<u64>,
    /// Pin with notification even when the pinner does not ask for it.
    pub force_notify: bool,
    /// Channel that approved /post submissions forward to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<ChatId>,
    /// Record message senders' usernames against their ids.
    pub log_uid: bool,
    /// Watch reports about this group go here instead of to the owner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_watches_to: Option<ChatId>,
}

/// One GIF-reaction command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionConfig {
    /// Search keyword for the GIF.
    pub keyword: String,
    /// Reply when the command is used bare.
    pub reply_text: String,
    /// Follows the invoker's mention when the command targets someone.
    pub mention_text: String,
    /// Reply when the command targets the bot itself.
    pub self_text: String,
    /// Prefix the search keyword with "anime ".
    #[serde(default = "default_true")]
    pub anime: bool,
}

/// The configured watch lists the poll loop iterates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchesConfig {
    pub count: Vec<CountWatch>,
    pub member: Vec<MemberWatch>,
}

impl BotConfig {
    /// Loads and parses the TOML file, then lets the environment
    /// override the secrets.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config: BotConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Replaces the secrets with the lookup's non-empty answers for
    /// [`ENV_APIKEY`] and [`ENV_TENOR_KEY`].
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = var(ENV_APIKEY).filter(|v| !v.is_empty()) {
            self.apikey = key;
        }
        if let Some(key) = var(ENV_TENOR_KEY).filter(|v| !v.is_empty()) {
            self.tenor_key = key;
        }
    }

    pub fn owner_user(&self) -> UserId {
        UserId(self.owner)
    }

    /// The owner's private chat. Telegram gives a direct chat the same
    /// id as the user.
    pub fn owner_chat(&self) -> ChatId {
        ChatId(self.owner)
    }

    pub fn is_owner(&self, user: UserId) -> bool {
        self.owner == user.0
    }

    /// The owner always moderates; `moderators` adds to that.
    pub fn is_moderator(&self, user: UserId) -> bool {
        self.is_owner(user) || self.moderators.contains(&user.0)
    }

    /// Private chats of everyone who may resolve submissions, the owner
    /// first, without repeats.
    pub fn moderator_chats(&self) -> Vec<ChatId> {
        let mut chats = vec![self.owner_chat()];
        for id in &self.moderators {
            let chat = ChatId(*id);
            if !chats.contains(&chat) {
                chats.push(chat);
            }
        }
        chats
    }

    /// Settings for `chat`, when the file has a section for it.
    pub fn group(&self, chat: ChatId) -> Option<&GroupConfig> {
        self.groups.get(&chat.to_string())
    }
}

fn default_true() -> bool {
    true
}
