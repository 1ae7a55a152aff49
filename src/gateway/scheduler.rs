//! Reminder delivery loop: one pass over the store every minute.

use super::delivery::TopicRouter;
use chrono::{DateTime, FixedOffset, TimeDelta, Timelike, Utc};
use nudge_core::{
    error::NudgeError,
    reminder::{Reminder, ReminderKey},
};
use nudge_memory::ReminderStore;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Fixed tick period.
pub const TICK_PERIOD: Duration = Duration::from_secs(60);

/// What a tick does with one reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    /// Inside the lead window: notify, then delete.
    Deliver,
    /// Fire time reached or passed: delete without notifying.
    Expire,
    /// Not yet in the lead window.
    Wait,
}

/// Decide what to do with a reminder firing at `fire_at`.
pub fn classify(fire_at: DateTime<FixedOffset>, now: DateTime<Utc>, lead: TimeDelta) -> TickAction {
    let until = fire_at.with_timezone(&Utc) - now;
    if until <= TimeDelta::zero() {
        TickAction::Expire
    } else if until <= lead {
        TickAction::Deliver
    } else {
        TickAction::Wait
    }
}

/// Outcome counters of one tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub delivered: usize,
    pub expired: usize,
    pub failed: usize,
    pub pending: usize,
}

impl TickReport {
    fn is_quiet(&self) -> bool {
        self.delivered == 0 && self.expired == 0 && self.failed == 0
    }
}

/// Notification body for a due reminder.
pub fn notification_text(reminder: &Reminder, now: DateTime<Utc>) -> String {
    let secs = (reminder.fire_at.with_timezone(&Utc) - now).num_seconds().max(0);
    let minutes = (secs + 59) / 60;
    format!(
        "🔔 Напоминание: через {minutes} минут - {}",
        reminder.action
    )
}

/// Time left until the next wall-clock minute boundary.
fn until_next_minute(now: DateTime<Utc>) -> Duration {
    let into = Duration::from_secs(u64::from(now.second()))
        + Duration::from_nanos(u64::from(now.nanosecond() % 1_000_000_000));
    TICK_PERIOD.saturating_sub(into)
}

pub struct Scheduler {
    store: ReminderStore,
    router: TopicRouter,
    lead: TimeDelta,
    delivery_timeout: Duration,
    shutdown: watch::Receiver<bool>,
}

impl Scheduler {
    pub fn new(
        store: ReminderStore,
        router: TopicRouter,
        lead: TimeDelta,
        delivery_timeout: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            router,
            lead,
            delivery_timeout,
            shutdown,
        }
    }

    fn stopping(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Run ticks on minute boundaries until shutdown is signalled.
    pub async fn run(self) {
        let start = Instant::now() + until_next_minute(Utc::now());
        let mut ticker = interval_at(start, TICK_PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut shutdown = self.shutdown.clone();

        info!(
            "scheduler started | lead: {} min | delivery timeout: {}s",
            self.lead.num_minutes(),
            self.delivery_timeout.as_secs()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.tick(Utc::now()).await;
                    if report.is_quiet() {
                        debug!("tick: {} pending", report.pending);
                    } else {
                        info!(
                            "tick: {} delivered, {} expired, {} failed, {} pending",
                            report.delivered, report.expired, report.failed, report.pending
                        );
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("scheduler stopped");
    }

    /// One pass over a fresh snapshot of the store.
    pub async fn tick(&self, now: DateTime<Utc>) -> TickReport {
        let snapshot = self.store.snapshot().await;
        self.process(snapshot, now).await
    }

    async fn process(
        &self,
        snapshot: Vec<(ReminderKey, Reminder)>,
        now: DateTime<Utc>,
    ) -> TickReport {
        let mut report = TickReport::default();

        for (key, reminder) in snapshot {
            if self.stopping() {
                debug!("tick interrupted by shutdown");
                break;
            }

            let action = classify(reminder.fire_at, now, self.lead);
            if action == TickAction::Wait {
                report.pending += 1;
                continue;
            }

            // Removed since the snapshot was taken.
            if self.store.get(&key).await.is_none() {
                continue;
            }

            match action {
                TickAction::Expire => {
                    info!("reminder {key} expired at {}, dropping", reminder.fire_at);
                    if let Err(e) = self.store.delete(&key).await {
                        warn!("failed to persist removal of {key}: {e}");
                    }
                    report.expired += 1;
                }
                TickAction::Deliver => {
                    let text = notification_text(&reminder, now);
                    match self.deliver(reminder.chat_id, &text).await {
                        Ok(()) => {
                            info!("reminder {key} delivered to chat {}", reminder.chat_id);
                            if let Err(e) = self.store.delete(&key).await {
                                warn!("failed to persist removal of {key}: {e}");
                            }
                            report.delivered += 1;
                        }
                        Err(e) => {
                            error!("delivery of {key} failed, retrying next tick: {e}");
                            report.failed += 1;
                        }
                    }
                }
                TickAction::Wait => {}
            }
        }

        report
    }

    async fn deliver(&self, chat_id: i64, text: &str) -> Result<(), NudgeError> {
        match timeout(self.delivery_timeout, self.router.deliver(chat_id, text)).await {
            Ok(result) => result,
            Err(_) => Err(NudgeError::Delivery(format!(
                "timed out after {}s",
                self.delivery_timeout.as_secs_f32()
            ))),
        }
    }
}
