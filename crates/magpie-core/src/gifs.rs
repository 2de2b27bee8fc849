//! GIF delivery with per-chat duplicate suppression.
//!
//! Search results are queued per `(chat, keyword)` and drained one send
//! at a time, so repeated triggers walk through fresh material instead
//! of replaying the top hit.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{BotError, Result};
use crate::gateway::{Gateway, SearchProvider};
use crate::types::{ChatId, MessageId};

#[cfg(test)]
#[path = "gifs_tests.rs"]
mod gifs_tests;

/// A URL sent to a chat stays blocked from re-sending for this long.
const SENT_TTL: Duration = Duration::from_secs(1800);
/// Unconsumed search results are discarded this long after the query.
const QUEUE_TTL: Duration = Duration::from_secs(600);

pub struct GifCache {
    gateway: Arc<dyn Gateway>,
    search: Arc<dyn SearchProvider>,
    inner: Mutex<CacheInner>,
}

#[derive(Default)]
struct CacheInner {
    sent: HashMap<ChatId, HashMap<String, Instant>>,
    queues: HashMap<(ChatId, String), ResultQueue>,
}

struct ResultQueue {
    urls: VecDeque<String>,
    fetched_at: Instant,
}

impl GifCache {
    pub fn new(gateway: Arc<dyn Gateway>, search: Arc<dyn SearchProvider>) -> Self {
        Self {
            gateway,
            search,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Sends the next GIF for `keyword` that this chat has not seen
    /// recently. Queries the provider when the local queue runs dry;
    /// two fresh queries without a usable result abort with
    /// [`BotError::NoResults`].
    pub async fn fetch_and_send(
        &self,
        chat: ChatId,
        keyword: &str,
        reply_to: Option<MessageId>,
    ) -> Result<()> {
        let mut fresh_queries = 0;
        let url = loop {
            if let Some(url) = self.take_unsent(chat, keyword).await {
                break url;
            }
            if fresh_queries == 2 {
                debug!(%chat, keyword, "no usable gif after two queries");
                return Err(BotError::NoResults(keyword.to_string()));
            }
            let urls = self.search.search_gifs(keyword).await?;
            fresh_queries += 1;
            self.install_queue(chat, keyword, urls).await;
        };

        self.gateway.notify_uploading(chat).await?;
        self.gateway.send_animation(chat, &url, reply_to).await?;
        Ok(())
    }

    /// Pops queue entries until one outside the chat's sent set turns
    /// up, marking it sent. Expired sent entries and stale queues are
    /// pruned on the way.
    async fn take_unsent(&self, chat: ChatId, keyword: &str) -> Option<String> {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        let CacheInner { sent, queues } = &mut *inner;

        let sent = sent.entry(chat).or_default();
        sent.retain(|_, sent_at| now.duration_since(*sent_at) < SENT_TTL);

        match queues.entry((chat, keyword.to_string())) {
            Entry::Vacant(_) => None,
            Entry::Occupied(mut queue) => {
                if now.duration_since(queue.get().fetched_at) >= QUEUE_TTL {
                    queue.remove();
                    return None;
                }
                while let Some(url) = queue.get_mut().urls.pop_front() {
                    if !sent.contains_key(&url) {
                        sent.insert(url.clone(), now);
                        return Some(url);
                    }
                }
                None
            }
        }
    }

    async fn install_queue(&self, chat: ChatId, keyword: &str, urls: Vec<String>) {
        let mut inner = self.inner.lock().await;
        inner.queues.insert(
            (chat, keyword.to_string()),
            ResultQueue {
                urls: urls.into(),
                fetched_at: Instant::now(),
            },
        );
    }
}
