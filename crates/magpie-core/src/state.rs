//! Shared bot state handed to every handler.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::warn;

use crate::approvals::ApprovalQueue;
use crate::config::BotConfig;
use crate::duel::{DiceRoller, DuelArena};
use crate::error::Result;
use crate::gateway::{Gateway, SearchProvider, StockProvider};
use crate::gifs::GifCache;
use crate::quotes::{ListingTable, StoredQuote};
use crate::responses::{ChanceSource, ResponseEngine, TextRuleRegistry};
use crate::rules::ResponseRule;
use crate::scheduler::JobQueue;
use crate::store::{collections, load_typed, Store};
use crate::types::{ChatId, MessageId, UserId};

/// A quote waiting on moderator review.
#[derive(Debug, Clone)]
pub struct QuoteSubmission {
    pub key: String,
    pub quote: StoredQuote,
    /// Where /addquote was issued, so the verdict can be replied there.
    pub origin_chat: ChatId,
    pub origin_message: MessageId,
}

/// A channel post waiting on moderator review.
#[derive(Debug, Clone)]
pub struct PostSubmission {
    pub source_chat: ChatId,
    pub message: MessageId,
    pub channel: ChatId,
    pub origin_chat: ChatId,
    pub origin_message: MessageId,
}

/// Everything the handlers share, built once at startup and passed
/// around behind an `Arc`.
pub struct BotState {
    pub config: BotConfig,
    pub gateway: Arc<dyn Gateway>,
    pub store: Arc<dyn Store>,
    pub stocks: Arc<dyn StockProvider>,
    pub jobs: JobQueue,
    pub gifs: Arc<GifCache>,
    pub engine: ResponseEngine,
    pub text_rules: TextRuleRegistry,
    /// Sticker file id -> response rule, mirrored from the store.
    pub sticker_rules: RwLock<BTreeMap<String, ResponseRule>>,
    pub listings: ListingTable,
    pub quote_queue: ApprovalQueue<QuoteSubmission>,
    pub post_queue: ApprovalQueue<PostSubmission>,
    pub arena: DuelArena,
    pub bot_user: UserId,
    pub bot_username: String,
}

impl BotState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: BotConfig,
        gateway: Arc<dyn Gateway>,
        store: Arc<dyn Store>,
        search: Arc<dyn SearchProvider>,
        stocks: Arc<dyn StockProvider>,
        chance: Arc<dyn ChanceSource>,
        dice: Arc<dyn DiceRoller>,
        jobs: JobQueue,
        bot_user: UserId,
        bot_username: impl Into<String>,
    ) -> Self {
        let gifs = Arc::new(GifCache::new(Arc::clone(&gateway), search));
        let engine = ResponseEngine::new(
            Arc::clone(&gateway),
            Arc::clone(&gifs),
            chance,
            jobs.clone(),
        );
        let arena = DuelArena::new(Arc::clone(&gateway), dice, jobs.clone());
        let listings = ListingTable::new(Arc::clone(&gateway));
        Self {
            config,
            gateway,
            store,
            stocks,
            jobs,
            gifs,
            engine,
            text_rules: TextRuleRegistry::new(),
            sticker_rules: RwLock::new(BTreeMap::new()),
            listings,
            quote_queue: ApprovalQueue::new(),
            post_queue: ApprovalQueue::new(),
            arena,
            bot_user,
            bot_username: bot_username.into(),
        }
    }

    /// Loads persisted response rules into the live registries. Stored
    /// text patterns that no longer compile are skipped with a warning.
    pub async fn hydrate_rules(&self) -> Result<()> {
        let stickers: BTreeMap<String, ResponseRule> =
            load_typed(self.store.as_ref(), collections::STICKER_RESPONSE).await?;
        *self.sticker_rules.write().await = stickers;

        let texts: BTreeMap<String, ResponseRule> =
            load_typed(self.store.as_ref(), collections::TEXT_RESPONSE).await?;
        for (pattern, rule) in texts {
            if let Err(err) = self.text_rules.register(&pattern, rule).await {
                warn!(pattern = %pattern, %err, "skipping stored text rule that no longer compiles");
            }
        }
        Ok(())
    }
}
