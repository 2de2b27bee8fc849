//! Periodic membership watches.
//!
//! Every poll cycle compares the gateway's view of a group against the
//! previous snapshot and reports departures to the owner, and
//! optionally the group itself. Detection is edge-triggered; snapshots
//! advance only when a cycle completes without a gateway error, so a
//! flaky poll never swallows a departure.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::error::Result;
use crate::gateway::Gateway;
use crate::types::{ChatId, MemberStatus, UserId};

#[cfg(test)]
#[path = "watch_tests.rs"]
mod watch_tests;

const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Watch on a group's member count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountWatch {
    pub group: ChatId,
    /// Announce departures in the group itself, not just to the owner.
    #[serde(default)]
    pub notify: bool,
}

/// Watch on one member's standing in a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberWatch {
    pub group: ChatId,
    pub user: UserId,
    #[serde(default)]
    pub notify: bool,
    /// Extra line appended to the group announcement.
    #[serde(default)]
    pub message: Option<String>,
    /// Member to kick from the group once the watched user leaves.
    #[serde(default)]
    pub kick: Option<UserId>,
}

#[derive(Default)]
struct Snapshots {
    counts: HashMap<ChatId, u32>,
    statuses: HashMap<(ChatId, UserId), MemberStatus>,
}

pub struct Watcher {
    gateway: Arc<dyn Gateway>,
    owner: ChatId,
    routes: HashMap<ChatId, ChatId>,
    counts: Vec<CountWatch>,
    members: Vec<MemberWatch>,
    snapshots: Mutex<Snapshots>,
}

impl Watcher {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        owner: ChatId,
        counts: Vec<CountWatch>,
        members: Vec<MemberWatch>,
    ) -> Self {
        Self {
            gateway,
            owner,
            routes: HashMap::new(),
            counts,
            members,
            snapshots: Mutex::new(Snapshots::default()),
        }
    }

    /// Sends departure reports about `group` to `target` instead of to
    /// the owner.
    pub fn route_reports(mut self, group: ChatId, target: ChatId) -> Self {
        self.routes.insert(group, target);
        self
    }

    fn report_target(&self, group: ChatId) -> ChatId {
        self.routes.get(&group).copied().unwrap_or(self.owner)
    }

    /// Polls forever. Meant to run as its own task.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(POLL_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }

    /// One pass over every configured watch. A failing entry is logged
    /// and skipped; the rest of the pass continues.
    pub async fn poll_once(&self) {
        for watch in &self.counts {
            if let Err(err) = self.poll_count(watch).await {
                warn!(group = %watch.group, %err, "count watch poll failed");
            }
        }
        for watch in &self.members {
            if let Err(err) = self.poll_member(watch).await {
                warn!(group = %watch.group, user = %watch.user, %err, "member watch poll failed");
            }
        }
    }

    async fn poll_count(&self, watch: &CountWatch) -> Result<()> {
        let count = self.gateway.member_count(watch.group).await?;
        let previous = self
            .snapshots
            .lock()
            .await
            .counts
            .get(&watch.group)
            .copied();

        if let Some(previous) = previous {
            if count < previous {
                let gone = previous - count;
                debug!(group = %watch.group, gone, "member count dropped");
                let title = self.gateway.chat_title(watch.group).await?;
                self.gateway
                    .send_text(
                        self.report_target(watch.group),
                        &format!("{gone} member(s) have left group {title}"),
                    )
                    .await?;
                if watch.notify {
                    self.gateway
                        .send_text(watch.group, &format!("{gone} member(s) have left"))
                        .await?;
                }
            }
        }

        self.snapshots.lock().await.counts.insert(watch.group, count);
        Ok(())
    }

    async fn poll_member(&self, watch: &MemberWatch) -> Result<()> {
        let info = self.gateway.member(watch.group, watch.user).await?;
        let key = (watch.group, watch.user);
        let previous = self.snapshots.lock().await.statuses.get(&key).copied();

        let left_now = info.status == MemberStatus::Left;
        let was_present = previous.is_some_and(|status| status != MemberStatus::Left);
        if left_now && was_present {
            let name = info.user.full_name();
            debug!(group = %watch.group, user = %watch.user, "watched member left");
            let title = self.gateway.chat_title(watch.group).await?;
            self.gateway
                .send_text(
                    self.report_target(watch.group),
                    &format!("{name} have left group {title}"),
                )
                .await?;
            if watch.notify {
                self.gateway
                    .send_text(watch.group, &format!("{name} have left"))
                    .await?;
                if let Some(message) = &watch.message {
                    self.gateway.send_text(watch.group, message).await?;
                }
            }
            if let Some(target) = watch.kick {
                self.gateway.kick(watch.group, target).await?;
            }
        }

        self.snapshots.lock().await.statuses.insert(key, info.status);
        Ok(())
    }
}
