//! Turn-based duels between two chat members.
//!
//! A challenge starts as a button prompt. Once the target accepts, the
//! scheduler drives one round every five seconds until someone's HP
//! runs out. Everything terminal (declined, expired, concluded) leaves
//! the session map, so stale button presses resolve to `NotFound`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{BotError, Refusal, Result};
use crate::gateway::{Button, Gateway, MemberPermissions};
use crate::scheduler::{JobKey, JobQueue};
use crate::types::{ChatId, DuelId, MessageId, UserId, UserRef};

#[cfg(test)]
#[path = "duel_tests.rs"]
mod duel_tests;

pub const CB_ACCEPT: &str = "duel_ok";
pub const CB_DECLINE: &str = "duel_no";

/// This account always rolls the maximum, checked at roll time.
pub const MAX_ROLL_USER: UserId = UserId(777000);

const ROLL_MAX: u32 = 100;
const START_HP: i32 = 100;
const ROUND_INTERVAL: Duration = Duration::from_secs(5);
const CHALLENGE_TTL: Duration = Duration::from_secs(300);
const LOSER_RESTRICTION: Duration = Duration::from_secs(600);
const LETHAL_COOLDOWN: Duration = Duration::from_secs(12 * 3600);

const TEXT_ONLY_TARGET: &str = "只有被挑战的人才能接受决斗哦";
const TEXT_NOT_PARTY: &str = "你不是这场决斗的当事人哦";
const TEXT_VOID: &str = "challenger on cooldown, this duel is void";
const TEXT_GONE: &str = "这场决斗已经不存在了……";
const TEXT_EXPIRED: &str = "决斗邀请已过期。";

/// Round report lines by damage magnitude. Upper bounds are cumulative
/// and deliberately uneven; the table ships as authored.
const FLAVOR_BANDS: &[(i32, &str)] = &[
    (2, "轻轻拍了对方一下"),
    (6, "挥出一记勾拳"),
    (13, "飞起一脚踹了过去"),
    (25, "抡起板凳砸了下去"),
    (45, "使出了佛山无影脚"),
    (70, "祭出了亢龙有悔"),
    (98, "发动了天地同寿"),
    (99, "触发了必杀一击"),
];

const FLAVOR_EVEN: &str = "两人拳脚相撞，不分上下。";

fn flavor_for(magnitude: i32) -> &'static str {
    for (bound, line) in FLAVOR_BANDS {
        if magnitude <= *bound {
            return line;
        }
    }
    FLAVOR_EVEN
}

/// Uniform integer rolls in `[1, 100]`. Injected so tests can script
/// rounds.
pub trait DiceRoller: Send + Sync {
    fn roll(&self) -> u32;
}

pub struct RngDice {
    rng: std::sync::Mutex<StdRng>,
}

impl RngDice {
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

impl DiceRoller for RngDice {
    fn roll(&self) -> u32 {
        self.rng.lock().unwrap().gen_range(1..=ROLL_MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuelAction {
    Accept,
    Decline,
}

/// Parses duel button data, e.g. `duel_ok:3`.
pub fn parse_callback(data: &str) -> Option<(DuelAction, DuelId)> {
    let (verb, id) = data.split_once(':')?;
    let action = match verb {
        CB_ACCEPT => DuelAction::Accept,
        CB_DECLINE => DuelAction::Decline,
        _ => return None,
    };
    Some((action, DuelId(id.parse().ok()?)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DuelState {
    Proposed,
    Running,
}

#[derive(Debug, Clone)]
struct DuelSession {
    chat: ChatId,
    challenger: UserRef,
    target: UserRef,
    lethal: bool,
    state: DuelState,
    challenge_message: MessageId,
    challenger_hp: i32,
    target_hp: i32,
    round: u32,
}

#[derive(Default)]
struct ArenaInner {
    sessions: HashMap<DuelId, DuelSession>,
    cooldowns: HashSet<(ChatId, UserId)>,
    next_id: u64,
}

#[derive(Clone)]
pub struct DuelArena {
    gateway: Arc<dyn Gateway>,
    dice: Arc<dyn DiceRoller>,
    jobs: JobQueue,
    inner: Arc<Mutex<ArenaInner>>,
}

impl DuelArena {
    pub fn new(gateway: Arc<dyn Gateway>, dice: Arc<dyn DiceRoller>, jobs: JobQueue) -> Self {
        Self {
            gateway,
            dice,
            jobs,
            inner: Arc::new(Mutex::new(ArenaInner::default())),
        }
    }

    /// Posts a challenge with accept/decline buttons and arms its
    /// expiry timer.
    pub async fn propose(
        &self,
        chat: ChatId,
        challenger: UserRef,
        target: UserRef,
        lethal: bool,
    ) -> Result<DuelId> {
        let id = {
            let mut inner = self.inner.lock().await;
            inner.next_id += 1;
            DuelId(inner.next_id)
        };

        let text = if lethal {
            format!(
                "{} 向 {} 发起了生死决斗！",
                challenger.full_name(),
                target.full_name()
            )
        } else {
            format!(
                "{} 向 {} 发起了决斗！",
                challenger.full_name(),
                target.full_name()
            )
        };
        let keyboard = vec![vec![
            Button::new("应战", format!("{CB_ACCEPT}:{id}")),
            Button::new("拒绝", format!("{CB_DECLINE}:{id}")),
        ]];
        let message = self.gateway.send_buttons(chat, &text, keyboard).await?;

        self.inner.lock().await.sessions.insert(
            id,
            DuelSession {
                chat,
                challenger,
                target,
                lethal,
                state: DuelState::Proposed,
                challenge_message: message,
                challenger_hp: START_HP,
                target_hp: START_HP,
                round: 0,
            },
        );

        let arena = self.clone();
        self.jobs
            .schedule_keyed(JobKey::DuelExpiry(id), CHALLENGE_TTL, move || async move {
                arena.expire(id).await;
            });
        debug!(duel = %id, %chat, lethal, "duel proposed");
        Ok(id)
    }

    /// Starts the duel. Only the target may accept; a lethal challenge
    /// from a cooling-down challenger is voided instead.
    pub async fn accept(&self, id: DuelId, presser: &UserRef) -> Result<()> {
        enum Plan {
            Void {
                chat: ChatId,
                message: MessageId,
            },
            Begin {
                chat: ChatId,
                message: MessageId,
                target_name: String,
            },
        }

        let plan = {
            let mut inner = self.inner.lock().await;
            let (chat, message, challenger, lethal, target_name) = {
                let session = inner.sessions.get(&id).ok_or(BotError::NotFound(TEXT_GONE))?;
                if presser.id == session.challenger.id {
                    return Err(BotError::Permission(Refusal::text(TEXT_ONLY_TARGET)));
                }
                if presser.id != session.target.id {
                    return Err(BotError::Permission(Refusal::text(TEXT_NOT_PARTY)));
                }
                if session.state == DuelState::Running {
                    return Ok(());
                }
                (
                    session.chat,
                    session.challenge_message,
                    session.challenger.id,
                    session.lethal,
                    session.target.full_name(),
                )
            };

            if lethal && inner.cooldowns.contains(&(chat, challenger)) {
                inner.sessions.remove(&id);
                Plan::Void { chat, message }
            } else {
                if let Some(session) = inner.sessions.get_mut(&id) {
                    session.state = DuelState::Running;
                }
                Plan::Begin {
                    chat,
                    message,
                    target_name,
                }
            }
        };

        self.jobs.cancel_key(JobKey::DuelExpiry(id));
        match plan {
            Plan::Void { chat, message } => {
                debug!(duel = %id, "lethal duel voided by challenger cooldown");
                self.gateway.edit_text(chat, message, TEXT_VOID).await?;
            }
            Plan::Begin {
                chat,
                message,
                target_name,
            } => {
                let text = format!("{target_name} 应战了！决斗开始，双方HP为100。");
                self.gateway.edit_text(chat, message, &text).await?;
                let arena = self.clone();
                self.jobs
                    .schedule_keyed(JobKey::DuelRound(id), ROUND_INTERVAL, move || async move {
                        arena.run_round(id).await;
                    });
            }
        }
        Ok(())
    }

    /// Cancels a proposed duel. Either party may decline.
    pub async fn decline(&self, id: DuelId, presser: &UserRef) -> Result<()> {
        let (chat, message) = {
            let mut inner = self.inner.lock().await;
            let session = inner.sessions.get(&id).ok_or(BotError::NotFound(TEXT_GONE))?;
            if presser.id != session.challenger.id && presser.id != session.target.id {
                return Err(BotError::Permission(Refusal::text(TEXT_NOT_PARTY)));
            }
            if session.state == DuelState::Running {
                return Ok(());
            }
            let place = (session.chat, session.challenge_message);
            inner.sessions.remove(&id);
            place
        };

        self.jobs.cancel_key(JobKey::DuelExpiry(id));
        let text = format!("{} 拒绝了这场决斗。", presser.full_name());
        self.gateway.edit_text(chat, message, &text).await?;
        Ok(())
    }

    async fn expire(&self, id: DuelId) {
        let removed = {
            let mut inner = self.inner.lock().await;
            let proposed = inner
                .sessions
                .get(&id)
                .is_some_and(|session| session.state == DuelState::Proposed);
            if proposed {
                inner.sessions.remove(&id)
            } else {
                None
            }
        };

        if let Some(session) = removed {
            debug!(duel = %id, "challenge expired unaccepted");
            if let Err(err) = self
                .gateway
                .edit_text(session.chat, session.challenge_message, TEXT_EXPIRED)
                .await
            {
                warn!(duel = %id, %err, "failed to edit expired challenge");
            }
        }
    }

    fn roll_for(&self, user: UserId) -> u32 {
        if user == MAX_ROLL_USER {
            ROLL_MAX
        } else {
            self.dice.roll()
        }
    }

    // Boxed rather than `async fn`: the round reschedules itself, and a
    // recursive opaque future cannot satisfy the scheduler's `Send` bound.
    fn run_round(&self, id: DuelId) -> BoxFuture<'_, ()> {
        async move {
            let (chat, report, finished) = {
                let mut inner = self.inner.lock().await;
                let Some(session) = inner.sessions.get_mut(&id) else {
                    return;
                };
                session.round += 1;
                let c_roll = self.roll_for(session.challenger.id);
                let t_roll = self.roll_for(session.target.id);
                let damage = c_roll as i32 - t_roll as i32;
                if damage > 0 {
                    session.target_hp -= damage;
                } else if damage < 0 {
                    session.challenger_hp += damage;
                }

                let c_name = session.challenger.full_name();
                let t_name = session.target.full_name();
                let mut report = format!(
                    "第{}回合：{} 掷出 {}，{} 掷出 {}。\n",
                    session.round, c_name, c_roll, t_name, t_roll
                );
                if damage == 0 {
                    report.push_str(FLAVOR_EVEN);
                } else {
                    let (attacker, magnitude) = if damage > 0 {
                        (c_name.as_str(), damage)
                    } else {
                        (t_name.as_str(), -damage)
                    };
                    report.push_str(&format!(
                        "{}{}，造成 {} 点伤害！",
                        attacker,
                        flavor_for(magnitude),
                        magnitude
                    ));
                }
                report.push_str(&format!(
                    "\n{}：{} HP | {}：{} HP",
                    c_name, session.challenger_hp, t_name, session.target_hp
                ));

                let chat = session.chat;
                let concluded = session.challenger_hp <= 0 || session.target_hp <= 0;
                let finished = if concluded {
                    inner.sessions.remove(&id)
                } else {
                    None
                };
                if let Some(done) = &finished {
                    if done.lethal {
                        inner.cooldowns.insert((done.chat, done.challenger.id));
                    }
                }
                (chat, report, finished)
            };

            if let Err(err) = self.gateway.send_text(chat, &report).await {
                warn!(%chat, duel = %id, %err, "failed to send round report");
            }

            match finished {
                Some(session) => self.conclude(id, session).await,
                None => {
                    let arena = self.clone();
                    self.jobs.schedule_keyed(
                        JobKey::DuelRound(id),
                        ROUND_INTERVAL,
                        move || async move {
                            arena.run_round(id).await;
                        },
                    );
                }
            }
        }
        .boxed()
    }

    async fn conclude(&self, id: DuelId, session: DuelSession) {
        let loser = if session.challenger_hp <= 0 {
            &session.challenger
        } else {
            &session.target
        };
        let line = format!("{} 倒下了！决斗结束。", loser.full_name());
        if let Err(err) = self.gateway.send_text(session.chat, &line).await {
            warn!(chat = %session.chat, duel = %id, %err, "failed to announce duel result");
        }

        if session.lethal {
            if let Err(err) = self
                .gateway
                .restrict(
                    session.chat,
                    loser.id,
                    MemberPermissions::none(),
                    Some(LOSER_RESTRICTION),
                )
                .await
            {
                warn!(chat = %session.chat, duel = %id, %err, "failed to restrict duel loser");
            }
            let inner = Arc::clone(&self.inner);
            let token = (session.chat, session.challenger.id);
            self.jobs.schedule_keyed(
                JobKey::LethalCooldown(session.chat, session.challenger.id),
                LETHAL_COOLDOWN,
                move || async move {
                    inner.lock().await.cooldowns.remove(&token);
                },
            );
        }
        debug!(duel = %id, "duel concluded");
    }
}
