//! Exactly-once moderation decisions for submitted items.
//!
//! Quotes and posts run through two instances of the same queue,
//! differing only in the payload the winning resolver gets back.

use std::collections::{HashMap, HashSet};

use tokio::sync::Mutex;

use crate::error::{BotError, Result};
use crate::types::{ChatId, MessageId, PendingId};

#[cfg(test)]
#[path = "approvals_tests.rs"]
mod approvals_tests;

pub const CB_APPROVE: &str = "apv_ok";
pub const CB_DECLINE: &str = "apv_no";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalKind {
    Quote,
    Post,
}

impl ApprovalKind {
    pub fn tag(self) -> &'static str {
        match self {
            ApprovalKind::Quote => "q",
            ApprovalKind::Post => "p",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Decline,
}

/// One moderator's prompt message, kept so it can be edited after the
/// item is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prompt {
    pub chat: ChatId,
    pub message: MessageId,
}

/// A submitted item waiting on a decision.
#[derive(Debug, Clone)]
pub struct Pending<T> {
    pub payload: T,
    pub prompts: Vec<Prompt>,
}

#[derive(Debug)]
struct Inner<T> {
    pending: HashMap<PendingId, Pending<T>>,
    approved: HashSet<PendingId>,
}

/// Pending-item registry with first-resolver-wins semantics.
///
/// Approved ids are remembered and block resubmission; declined ids
/// may be submitted again.
#[derive(Debug)]
pub struct ApprovalQueue<T> {
    inner: Mutex<Inner<T>>,
}

impl<T> ApprovalQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                pending: HashMap::new(),
                approved: HashSet::new(),
            }),
        }
    }

    /// Registers a pending item. `Duplicate` when the id is already
    /// pending or was approved earlier.
    pub async fn submit(&self, id: PendingId, payload: T) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.pending.contains_key(&id) || inner.approved.contains(&id) {
            return Err(BotError::Duplicate("Already submitted or approved."));
        }
        inner.pending.insert(
            id,
            Pending {
                payload,
                prompts: Vec::new(),
            },
        );
        Ok(())
    }

    /// Attaches one moderator's prompt message to the pending item.
    /// A no-op once the item has been resolved.
    pub async fn record_prompt(&self, id: PendingId, prompt: Prompt) {
        if let Some(pending) = self.inner.lock().await.pending.get_mut(&id) {
            pending.prompts.push(prompt);
        }
    }

    /// Takes the pending item. The removal under the lock decides the
    /// race: exactly one caller gets the item back, every later call
    /// gets `NotFound`.
    pub async fn resolve(&self, id: PendingId, decision: Decision) -> Result<Pending<T>> {
        let mut inner = self.inner.lock().await;
        let pending = inner
            .pending
            .remove(&id)
            .ok_or(BotError::NotFound("already processed by another moderator"))?;
        if decision == Decision::Approve {
            inner.approved.insert(id);
        }
        Ok(pending)
    }
}

impl<T> Default for ApprovalQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders approve/decline button data, e.g. `apv_ok:q:-1001_42`.
pub fn callback_data(decision: Decision, kind: ApprovalKind, id: PendingId) -> String {
    let verb = match decision {
        Decision::Approve => CB_APPROVE,
        Decision::Decline => CB_DECLINE,
    };
    format!("{verb}:{}:{id}", kind.tag())
}

/// Parses button data produced by [`callback_data`].
pub fn parse_callback(data: &str) -> Option<(Decision, ApprovalKind, PendingId)> {
    let (verb, rest) = data.split_once(':')?;
    let decision = match verb {
        CB_APPROVE => Decision::Approve,
        CB_DECLINE => Decision::Decline,
        _ => return None,
    };
    let (tag, id) = rest.split_once(':')?;
    let kind = match tag {
        "q" => ApprovalKind::Quote,
        "p" => ApprovalKind::Post,
        _ => return None,
    };
    Some((decision, kind, PendingId::parse(id)?))
}
