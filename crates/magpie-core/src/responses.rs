//! Chance and cooldown gated dispatch of configured responses.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error::Result;
use crate::gateway::Gateway;
use crate::gifs::GifCache;
use crate::rules::{ResponseKind, ResponseRule, Signature};
use crate::scheduler::JobQueue;
use crate::types::{ChatId, MessageId};

#[cfg(test)]
#[path = "responses_tests.rs"]
mod responses_tests;

/// Uniform `[0, 1)` draws. Injected so tests can pin outcomes.
pub trait ChanceSource: Send + Sync {
    fn draw(&self) -> f64;
}

pub struct RngChance {
    rng: std::sync::Mutex<StdRng>,
}

impl RngChance {
    pub fn from_entropy() -> Self {
        Self {
            rng: std::sync::Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: std::sync::Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl ChanceSource for RngChance {
    fn draw(&self) -> f64 {
        self.rng.lock().unwrap().gen_range(0.0..1.0)
    }
}

/// Runs a configured rule through its cooldown and chance gates before
/// dispatching by kind.
///
/// The cooldown keys on the rule's `(kind, content)` signature, so two
/// trigger keys sharing a payload share its cooldown window. The window
/// is armed before the chance draw: a response dropped by chance still
/// starts its cooldown.
pub struct ResponseEngine {
    gateway: Arc<dyn Gateway>,
    gifs: Arc<GifCache>,
    chance: Arc<dyn ChanceSource>,
    jobs: JobQueue,
    cooldowns: Arc<Mutex<HashSet<Signature>>>,
}

impl ResponseEngine {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        gifs: Arc<GifCache>,
        chance: Arc<dyn ChanceSource>,
        jobs: JobQueue,
    ) -> Self {
        Self {
            gateway,
            gifs,
            chance,
            jobs,
            cooldowns: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub async fn respond(
        &self,
        chat: ChatId,
        reply_to: MessageId,
        rule: &ResponseRule,
    ) -> Result<()> {
        let signature = rule.signature();
        {
            let mut cooldowns = self.cooldowns.lock().await;
            if cooldowns.contains(&signature) {
                debug!(%chat, content = %rule.content, "response on cooldown");
                return Ok(());
            }
            if rule.cooldown > 0 {
                cooldowns.insert(signature.clone());
                let set = Arc::clone(&self.cooldowns);
                self.jobs
                    .schedule(Duration::from_secs(rule.cooldown), move || async move {
                        set.lock().await.remove(&signature);
                    });
            }
        }

        if rule.chance < 1.0 && self.chance.draw() > rule.chance {
            debug!(%chat, content = %rule.content, "response dropped by chance");
            return Ok(());
        }

        match rule.kind {
            ResponseKind::Text => {
                self.gateway
                    .reply_markdown(chat, reply_to, &rule.content)
                    .await?;
            }
            ResponseKind::Sticker => {
                self.gateway
                    .reply_sticker(chat, reply_to, &rule.content)
                    .await?;
            }
            ResponseKind::Gif => {
                self.gifs
                    .fetch_and_send(chat, &rule.content, Some(reply_to))
                    .await?;
            }
        }
        Ok(())
    }
}

struct CompiledRule {
    pattern: String,
    regex: Regex,
}

#[derive(Default)]
struct RegistryInner {
    order: Vec<CompiledRule>,
    rules: HashMap<String, ResponseRule>,
}

/// Text trigger patterns in registration order. Matching uses search
/// semantics (anywhere in the message) and stops at the first hit;
/// re-registering a pattern moves it to the end of the order.
#[derive(Default)]
pub struct TextRuleRegistry {
    inner: RwLock<RegistryInner>,
}

impl TextRuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(
        &self,
        pattern: &str,
        rule: ResponseRule,
    ) -> std::result::Result<(), regex::Error> {
        let regex = Regex::new(pattern)?;
        let mut inner = self.inner.write().await;
        inner.order.retain(|compiled| compiled.pattern != pattern);
        inner.order.push(CompiledRule {
            pattern: pattern.to_string(),
            regex,
        });
        inner.rules.insert(pattern.to_string(), rule);
        Ok(())
    }

    pub async fn remove(&self, pattern: &str) {
        let mut inner = self.inner.write().await;
        inner.order.retain(|compiled| compiled.pattern != pattern);
        inner.rules.remove(pattern);
    }

    pub async fn first_match(&self, text: &str) -> Option<ResponseRule> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .find(|compiled| compiled.regex.is_match(text))
            .and_then(|compiled| inner.rules.get(&compiled.pattern).cloned())
    }

    /// Every registered rule keyed by pattern, for the listing command.
    pub async fn snapshot(&self) -> BTreeMap<String, ResponseRule> {
        let inner = self.inner.read().await;
        inner
            .rules
            .iter()
            .map(|(pattern, rule)| (pattern.clone(), rule.clone()))
            .collect()
    }
}
