//! Interval-driven publishing of queued posts
//!
//! ```text
//! Idle --start--> Running --last post--> Idle (Completed event)
//!                    |
//!                    +------stop------> Idle (no Completed event)
//! ```
//!
//! A run walks a snapshot of the post ids that were pending when it started.
//! The first post goes out immediately, then one per interval. At each tick
//! the post is re-read from the live queue and only sent if it is still
//! pending; the cursor advances either way. Results are reported through
//! [`PublishEvent`]s and the receiver decides the post's final status.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use super::error::{SchedulerError, SchedulerResult};
use crate::metrics;
use crate::models::{PostStatus, PublishPost, PublishResult, SocialAccount};
use crate::publisher::Publisher;
use crate::storage::{SharedQueue, SuccessPolicy};

/// Notifications emitted by a scheduled run
#[derive(Debug, Clone, PartialEq)]
pub enum PublishEvent {
    /// A post was sent to every account
    Published {
        post_id: Uuid,
        results: Vec<PublishResult>,
    },
    /// The snapshot is exhausted; never sent after `stop()`
    Completed,
}

/// Outcome of one post in [`PublishScheduler::publish_now`]
#[derive(Debug, Clone)]
pub struct PublishNowReport {
    pub post_id: Uuid,
    pub status: PostStatus,
    pub results: Vec<PublishResult>,
}

struct ActiveRun {
    id: u64,
    stop_tx: watch::Sender<bool>,
}

type RunSlot = Arc<Mutex<Option<ActiveRun>>>;

fn lock_slot(slot: &RunSlot) -> MutexGuard<'_, Option<ActiveRun>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Publishes queued posts on a fixed interval; at most one run at a time
pub struct PublishScheduler {
    publisher: Arc<dyn Publisher>,
    policy: SuccessPolicy,
    active: RunSlot,
    next_run_id: AtomicU64,
}

impl PublishScheduler {
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self {
            publisher,
            policy: SuccessPolicy::Any,
            active: Arc::new(Mutex::new(None)),
            next_run_id: AtomicU64::new(1),
        }
    }

    /// Policy used by [`Self::publish_now`], and by a scheduled run whose
    /// event receiver was dropped
    pub fn with_policy(mut self, policy: SuccessPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn is_running(&self) -> bool {
        lock_slot(&self.active).is_some()
    }

    /// Start a scheduled run over the currently pending posts.
    ///
    /// Fails with [`SchedulerError::AlreadyRunning`] and changes nothing if a
    /// run is active.
    pub async fn start(
        &self,
        queue: SharedQueue,
        accounts: Vec<SocialAccount>,
        interval: Duration,
    ) -> SchedulerResult<mpsc::UnboundedReceiver<PublishEvent>> {
        if interval.is_zero() {
            return Err(SchedulerError::invalid_interval(interval));
        }
        if accounts.is_empty() {
            return Err(SchedulerError::NoAccounts);
        }
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        let snapshot = queue.read().await.pending_ids();

        let (stop_tx, stop_rx) = watch::channel(false);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let run_id = self.next_run_id.fetch_add(1, Ordering::Relaxed);

        {
            let mut slot = lock_slot(&self.active);
            if slot.is_some() {
                return Err(SchedulerError::AlreadyRunning);
            }
            *slot = Some(ActiveRun {
                id: run_id,
                stop_tx,
            });
        }

        tracing::info!(
            run = run_id,
            posts = snapshot.len(),
            accounts = accounts.len(),
            interval_secs = interval.as_secs(),
            "Scheduled publishing started"
        );

        let run = ScheduledRun {
            id: run_id,
            publisher: Arc::clone(&self.publisher),
            queue,
            accounts,
            snapshot,
            interval,
            policy: self.policy,
            stop_rx,
            events_tx,
            slot: Arc::clone(&self.active),
        };
        tokio::spawn(run.execute());

        Ok(events_rx)
    }

    /// Stop the active run. A publish already in progress finishes; no
    /// further posts are sent and no `Completed` event fires.
    pub fn stop(&self) -> bool {
        let Some(run) = lock_slot(&self.active).take() else {
            return false;
        };
        // Receiver already gone means the task has exited
        let _ = run.stop_tx.send(true);
        tracing::info!(run = run.id, "Scheduled publishing stopped");
        true
    }

    /// Publish every pending post right away, bypassing the schedule.
    ///
    /// Each post is marked `publishing`, sent to all accounts in order and
    /// resolved with the scheduler's [`SuccessPolicy`].
    pub async fn publish_now(
        &self,
        queue: &SharedQueue,
        accounts: &[SocialAccount],
    ) -> SchedulerResult<Vec<PublishNowReport>> {
        if accounts.is_empty() {
            return Err(SchedulerError::NoAccounts);
        }

        let ids = {
            let mut guard = queue.write().await;
            let ids = guard.pending_ids();
            for id in &ids {
                guard.set_status(*id, PostStatus::Publishing);
            }
            ids
        };
        tracing::info!(posts = ids.len(), "Publishing all pending posts now");

        let mut reports = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(post) = queue.read().await.get(id).cloned() else {
                tracing::debug!(post = %id, "Post removed before publishing");
                continue;
            };

            let results = publish_to_all(self.publisher.as_ref(), accounts, &post).await;
            let status = queue.write().await.apply_results(id, &results, self.policy);
            let Some(status) = status else {
                tracing::warn!(post = %id, "Post removed while publishing, results dropped");
                continue;
            };
            metrics::record_post_resolved(status.as_str());

            reports.push(PublishNowReport {
                post_id: id,
                status,
                results,
            });
        }

        Ok(reports)
    }
}

impl Drop for PublishScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Send a post to each account in order
pub async fn publish_to_all(
    publisher: &dyn Publisher,
    accounts: &[SocialAccount],
    post: &PublishPost,
) -> Vec<PublishResult> {
    let mut results = Vec::with_capacity(accounts.len());
    for account in accounts {
        results.push(publisher.publish(account, post).await);
    }
    results
}

// ============================================================================
// Run task
// ============================================================================

struct ScheduledRun {
    id: u64,
    publisher: Arc<dyn Publisher>,
    queue: SharedQueue,
    accounts: Vec<SocialAccount>,
    snapshot: Vec<Uuid>,
    interval: Duration,
    policy: SuccessPolicy,
    stop_rx: watch::Receiver<bool>,
    events_tx: mpsc::UnboundedSender<PublishEvent>,
    slot: RunSlot,
}

impl ScheduledRun {
    async fn execute(mut self) {
        let completed = self.tick_loop().await;

        if completed && !*self.stop_rx.borrow() {
            tracing::info!(run = self.id, "Scheduled publishing completed");
            let _ = self.events_tx.send(PublishEvent::Completed);
        }

        let mut slot = lock_slot(&self.slot);
        if slot.as_ref().is_some_and(|run| run.id == self.id) {
            *slot = None;
        }
    }

    /// Returns true when the snapshot was exhausted
    async fn tick_loop(&mut self) -> bool {
        // First tick fires immediately
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut cursor = 0;
        while cursor < self.snapshot.len() {
            tokio::select! {
                biased;
                _ = self.stop_rx.changed() => return false,
                _ = ticker.tick() => {}
            }

            let post_id = self.snapshot[cursor];
            cursor += 1;

            // Claimed under the write lock so publish_now cannot send it too
            let post = self.queue.write().await.claim(post_id);
            let Some(post) = post else {
                tracing::debug!(run = self.id, post = %post_id, "Post no longer pending, skipping");
                continue;
            };

            tracing::info!(
                run = self.id,
                post = %post_id,
                position = cursor,
                total = self.snapshot.len(),
                "Publishing scheduled post"
            );
            let results = publish_to_all(self.publisher.as_ref(), &self.accounts, &post).await;

            let event = PublishEvent::Published { post_id, results };
            if let Err(mpsc::error::SendError(event)) = self.events_tx.send(event) {
                // Nobody left to resolve the post; do it here so it does not
                // stay in `publishing`
                if let PublishEvent::Published { post_id, results } = event {
                    self.queue
                        .write()
                        .await
                        .apply_results(post_id, &results, self.policy);
                }
                tracing::warn!(run = self.id, "Event receiver dropped, ending run");
                return false;
            }
        }
        true
    }
}
