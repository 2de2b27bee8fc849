//! Stored quotes and the paginated browser behind /lsquotes.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::Result;
use crate::gateway::{Button, Gateway, Keyboard};
use crate::types::{ChatId, MessageId};

#[cfg(test)]
#[path = "quotes_tests.rs"]
mod quotes_tests;

pub const CB_PREVIOUS: &str = "lsquotes_previous";
pub const CB_NEXT: &str = "lsquotes_next";

const PAGE_SIZE: usize = 3;
const MAX_SESSIONS: usize = 10;

const TEXT_NO_QUOTES: &str = "No quotes found";
const TEXT_SESSION_GONE: &str =
    "Session not found, maybe expired, please /lsquotes again to start a new one.";

/// One quote as persisted in the `quotes` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredQuote {
    pub chat: ChatId,
    pub message: MessageId,
    pub author: String,
    pub text: String,
}

/// Store key for a quote, `"{chat}_{message}"`.
pub fn quote_key(chat: ChatId, message: MessageId) -> String {
    format!("{chat}_{message}")
}

/// Permalink line for a supergroup quote key. Keys without the
/// supergroup prefix render no link.
pub fn quote_link(key: &str) -> String {
    match key.split_once('_') {
        Some((gid, mid)) if gid.starts_with("-100") => {
            format!("t.me/c/{}/{}\n", &gid[4..], mid)
        }
        _ => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMove {
    Previous,
    Next,
}

/// Maps page-turn button data to a direction.
pub fn parse_callback(data: &str) -> Option<PageMove> {
    match data {
        CB_PREVIOUS => Some(PageMove::Previous),
        CB_NEXT => Some(PageMove::Next),
        _ => None,
    }
}

fn page_keyboard() -> Keyboard {
    vec![
        vec![Button::new("Previous Page", CB_PREVIOUS)],
        vec![Button::new("Next Page", CB_NEXT)],
    ]
}

fn render_page(keys: &[String], data: &HashMap<String, StoredQuote>, cursor: usize) -> String {
    let end = (cursor + PAGE_SIZE).min(keys.len());
    let body = keys[cursor..end]
        .iter()
        .filter_map(|key| {
            data.get(key).map(|quote| {
                format!(
                    "ID:{}\n{}By {}:\n{}",
                    key,
                    quote_link(key),
                    quote.author,
                    quote.text
                )
            })
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    // The header's upper bound grows twice as fast as the cursor.
    format!(
        "Quotes {}-{}, total {}\n\n{}",
        cursor + 1,
        cursor + cursor + PAGE_SIZE,
        keys.len(),
        body
    )
}

struct ListingSession {
    keys: Vec<String>,
    data: HashMap<String, StoredQuote>,
    cursor: usize,
}

/// Active quote browsers, one per chat. Sessions snapshot the
/// collection when opened, so later edits do not shift pages.
pub struct ListingTable {
    gateway: Arc<dyn Gateway>,
    sessions: Mutex<HashMap<ChatId, ListingSession>>,
}

impl ListingTable {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Posts page one over a snapshot and registers the session. Ten
    /// live sessions flush the whole table before the insert.
    pub async fn open(&self, chat: ChatId, quotes: BTreeMap<String, StoredQuote>) -> Result<()> {
        if quotes.is_empty() {
            self.gateway.send_text(chat, TEXT_NO_QUOTES).await?;
            return Ok(());
        }

        let keys: Vec<String> = quotes.keys().cloned().collect();
        let data: HashMap<String, StoredQuote> = quotes.into_iter().collect();
        let text = render_page(&keys, &data, 0);
        self.gateway
            .send_buttons(chat, &text, page_keyboard())
            .await?;

        let mut sessions = self.sessions.lock().await;
        if sessions.len() >= MAX_SESSIONS {
            sessions.clear();
        }
        sessions.insert(
            chat,
            ListingSession {
                keys,
                data,
                cursor: 0,
            },
        );
        Ok(())
    }

    /// Moves the cursor and edits the pressed message in place.
    /// Out-of-range presses do nothing; a missing session turns the
    /// pressed message into an expiry notice.
    pub async fn turn(&self, chat: ChatId, message: MessageId, direction: PageMove) -> Result<()> {
        let update = {
            let mut sessions = self.sessions.lock().await;
            match sessions.get_mut(&chat) {
                None => None,
                Some(session) => {
                    let cursor = match direction {
                        PageMove::Previous if session.cursor >= PAGE_SIZE => {
                            session.cursor - PAGE_SIZE
                        }
                        PageMove::Next if session.cursor + PAGE_SIZE < session.keys.len() => {
                            session.cursor + PAGE_SIZE
                        }
                        _ => return Ok(()),
                    };
                    session.cursor = cursor;
                    Some(render_page(&session.keys, &session.data, cursor))
                }
            }
        };

        match update {
            Some(text) => {
                self.gateway
                    .edit_buttons(chat, message, &text, page_keyboard())
                    .await
            }
            None => self.gateway.edit_text(chat, message, TEXT_SESSION_GONE).await,
        }
    }
}
