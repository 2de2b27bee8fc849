//! Delayed job execution.
//!
//! A single actor task owns the pending-job heap and runs callbacks one at
//! a time. Handles talk to it over an unbounded channel, so scheduling and
//! cancelling work from inside a running callback without blocking the
//! actor. Commands are drained before due jobs fire; a cancel that reaches
//! the channel before the deadline is guaranteed to win.

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod scheduler_tests;

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use std::future::Future;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::types::{ChatId, DuelId, UserId};

/// Work handed to the scheduler. Built once, run at most once.
pub type Job = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send + 'static>;

/// Identity of one scheduled job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobHandle(u64);

/// Keys for jobs where a new schedule replaces the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKey {
    TitleReset(ChatId),
    Unpin(ChatId),
    Unban(ChatId, UserId),
    DuelExpiry(DuelId),
    DuelRound(DuelId),
    LethalCooldown(ChatId, UserId),
}

enum Command {
    Schedule {
        id: u64,
        due: Instant,
        key: Option<JobKey>,
        job: Job,
    },
    Cancel(u64),
    CancelKey(JobKey),
    Shutdown,
}

/// Cloneable front end to the scheduler actor.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<Command>,
    next_id: Arc<AtomicU64>,
}

impl JobQueue {
    /// Schedules `job` to run after `delay`, counted from now.
    pub fn schedule<F, Fut>(&self, delay: Duration, job: F) -> JobHandle
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.submit(delay, None, job)
    }

    /// Schedules `job` under `key`, replacing any pending job with the same
    /// key.
    pub fn schedule_keyed<F, Fut>(&self, key: JobKey, delay: Duration, job: F) -> JobHandle
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.submit(delay, Some(key), job)
    }

    fn submit<F, Fut>(&self, delay: Duration, key: Option<JobKey>, job: F) -> JobHandle
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let due = Instant::now() + delay;
        let job: Job = Box::new(move || Box::pin(job()) as BoxFuture<'static, ()>);
        if self
            .tx
            .send(Command::Schedule { id, due, key, job })
            .is_err()
        {
            warn!(job_id = id, "scheduler is gone, dropping job");
        }
        JobHandle(id)
    }

    /// Cancels a pending job. A job that already ran is unaffected.
    pub fn cancel(&self, handle: JobHandle) {
        let _ = self.tx.send(Command::Cancel(handle.0));
    }

    /// Cancels the pending job under `key`, if any.
    pub fn cancel_key(&self, key: JobKey) {
        let _ = self.tx.send(Command::CancelKey(key));
    }

    /// Stops the actor once the current callback finishes.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }
}

struct Entry {
    due: Instant,
    id: u64,
    key: Option<JobKey>,
    job: Job,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // BinaryHeap is a max-heap; invert so the earliest entry surfaces, with
    // ties broken by schedule order.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other.due.cmp(&self.due).then(other.id.cmp(&self.id))
    }
}

/// The actor owning pending jobs. Build with [`Scheduler::new`], then drive
/// [`Scheduler::run`] on its own task.
pub struct Scheduler {
    rx: mpsc::UnboundedReceiver<Command>,
    heap: BinaryHeap<Entry>,
    live: HashSet<u64>,
    keys: HashMap<JobKey, u64>,
}

impl Scheduler {
    pub fn new() -> (JobQueue, Scheduler) {
        let (tx, rx) = mpsc::unbounded_channel();
        let queue = JobQueue {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
        };
        let actor = Scheduler {
            rx,
            heap: BinaryHeap::new(),
            live: HashSet::new(),
            keys: HashMap::new(),
        };
        (queue, actor)
    }

    pub async fn run(mut self) {
        debug!("scheduler running");
        loop {
            let due = self.heap.peek().map(|entry| entry.due);
            tokio::select! {
                biased;
                cmd = self.rx.recv() => match cmd {
                    Some(Command::Schedule { id, due, key, job }) => self.insert(id, due, key, job),
                    Some(Command::Cancel(id)) => {
                        if self.live.remove(&id) {
                            trace!(job_id = id, "cancelled job");
                        }
                    }
                    Some(Command::CancelKey(key)) => {
                        if let Some(id) = self.keys.remove(&key) {
                            self.live.remove(&id);
                            trace!(job_id = id, ?key, "cancelled keyed job");
                        }
                    }
                    Some(Command::Shutdown) | None => break,
                },
                _ = tokio::time::sleep_until(due.unwrap_or_else(Instant::now)), if due.is_some() => {
                    self.fire_due().await;
                }
            }
        }
        debug!(pending = self.heap.len(), "scheduler stopped");
    }

    fn insert(&mut self, id: u64, due: Instant, key: Option<JobKey>, job: Job) {
        if let Some(key) = key {
            if let Some(old) = self.keys.insert(key, id) {
                self.live.remove(&old);
                trace!(job_id = old, ?key, "replaced keyed job");
            }
        }
        self.live.insert(id);
        self.heap.push(Entry { due, id, key, job });
    }

    async fn fire_due(&mut self) {
        let now = Instant::now();
        while self
            .heap
            .peek()
            .map(|entry| entry.due <= now)
            .unwrap_or(false)
        {
            let Some(entry) = self.heap.pop() else { break };
            if let Some(key) = entry.key {
                if self.keys.get(&key) == Some(&entry.id) {
                    self.keys.remove(&key);
                }
            }
            if !self.live.remove(&entry.id) {
                trace!(job_id = entry.id, "skipping cancelled job");
                continue;
            }
            trace!(job_id = entry.id, "running job");
            (entry.job)().await;
        }
    }
}
