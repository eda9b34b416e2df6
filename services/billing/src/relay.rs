//! Outbox relay: drains pending outbox rows to the broker on a fixed period.
//!
//! At most one tick runs at a time per relay. A tick that fires while the
//! previous one is still running is skipped, not queued. Within a tick,
//! events are published one at a time in FIFO order, and a failure on one
//! event never stops the rest of the batch.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use crate::domain::repository::{EventBroker, OutboxRepository};
use crate::domain::types::{
    BrokerEvent, OUTBOX_BATCH_SIZE, OUTBOX_MAX_RETRIES, OUTBOX_POLL_INTERVAL_MS, OutboxEvent,
};

#[derive(Debug, Clone, Copy)]
pub struct RelaySettings {
    pub poll_interval: Duration,
    pub batch_size: u64,
    pub max_retries: i32,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(OUTBOX_POLL_INTERVAL_MS),
            batch_size: OUTBOX_BATCH_SIZE,
            max_retries: OUTBOX_MAX_RETRIES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RelayState {
    Idle = 0,
    Running = 1,
}

impl RelayState {
    fn from_u8(raw: u8) -> Self {
        if raw == Self::Running as u8 {
            Self::Running
        } else {
            Self::Idle
        }
    }
}

/// Counts for one completed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub fetched: usize,
    pub published: usize,
    /// Publish attempts that failed, abandoned ones included.
    pub failed: usize,
    /// Failures that used up the event's last retry.
    pub abandoned: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Another tick was still running.
    Skipped,
    Completed(TickReport),
    /// The pending scan itself failed; nothing was published.
    Failed,
}

enum Delivery {
    Published,
    Failed,
    Abandoned,
}

/// Restores `Idle` when the tick ends, including on panic.
struct RunningGuard<'a>(&'a AtomicU8);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(RelayState::Idle as u8, Ordering::Release);
    }
}

pub struct OutboxRelay<R, B> {
    outbox: R,
    broker: B,
    settings: RelaySettings,
    state: AtomicU8,
}

impl<R, B> OutboxRelay<R, B>
where
    R: OutboxRepository,
    B: EventBroker,
{
    pub fn new(outbox: R, broker: B, settings: RelaySettings) -> Self {
        Self {
            outbox,
            broker,
            settings,
            state: AtomicU8::new(RelayState::Idle as u8),
        }
    }

    pub fn state(&self) -> RelayState {
        RelayState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn settings(&self) -> RelaySettings {
        self.settings
    }

    fn acquire(&self) -> Option<RunningGuard<'_>> {
        self.state
            .compare_exchange(
                RelayState::Idle as u8,
                RelayState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .ok()
            .map(|_| RunningGuard(&self.state))
    }

    /// Run one tick unless another is in flight.
    pub async fn try_tick(&self) -> TickOutcome {
        let Some(_guard) = self.acquire() else {
            tracing::debug!("previous relay tick still running; skipping");
            return TickOutcome::Skipped;
        };
        self.tick().await
    }

    async fn tick(&self) -> TickOutcome {
        let pending = match self
            .outbox
            .list_pending(self.settings.max_retries, self.settings.batch_size)
            .await
        {
            Ok(pending) => pending,
            Err(e) => {
                tracing::error!(error = %e, "failed to list pending outbox events");
                return TickOutcome::Failed;
            }
        };

        let mut report = TickReport {
            fetched: pending.len(),
            ..TickReport::default()
        };
        if pending.is_empty() {
            return TickOutcome::Completed(report);
        }
        tracing::info!(count = pending.len(), "relaying pending outbox events");

        for event in &pending {
            match self.relay_one(event).await {
                Delivery::Published => report.published += 1,
                Delivery::Failed => report.failed += 1,
                Delivery::Abandoned => {
                    report.failed += 1;
                    report.abandoned += 1;
                }
            }
        }

        TickOutcome::Completed(report)
    }

    async fn relay_one(&self, event: &OutboxEvent) -> Delivery {
        let message = BrokerEvent::from(event);
        match self.broker.publish(&message).await {
            Ok(()) => {
                // Still counts as published: the row stays pending and is sent
                // again next tick, which the consumer ledger absorbs.
                if let Err(e) = self.outbox.mark_published(event.id).await {
                    tracing::error!(
                        event_id = %event.id,
                        error = %e,
                        "published but failed to mark outbox event"
                    );
                } else {
                    tracing::info!(
                        event_id = %event.id,
                        event_kind = %event.kind,
                        "outbox event published"
                    );
                }
                Delivery::Published
            }
            Err(publish_err) => {
                let reason = publish_err.to_string();
                tracing::error!(
                    event_id = %event.id,
                    event_kind = %event.kind,
                    error = %reason,
                    "failed to publish outbox event"
                );
                let updated = match self.outbox.record_failure(event.id, &reason).await {
                    Ok(updated) => updated,
                    Err(e) => {
                        tracing::error!(
                            event_id = %event.id,
                            error = %e,
                            "failed to record outbox publish failure"
                        );
                        return Delivery::Failed;
                    }
                };
                if updated.failure_count >= self.settings.max_retries {
                    tracing::warn!(
                        event_id = %updated.id,
                        event_kind = %updated.kind,
                        order_id = %updated.order_id,
                        failure_count = updated.failure_count,
                        last_error = %reason,
                        "outbox event abandoned after exhausting retries"
                    );
                    Delivery::Abandoned
                } else {
                    Delivery::Failed
                }
            }
        }
    }
}

impl<R, B> OutboxRelay<R, B>
where
    R: OutboxRepository + 'static,
    B: EventBroker + 'static,
{
    /// Tick every `poll_interval` until `shutdown` flips to `true` or its
    /// sender is dropped. Each tick runs on its own task; ticks still in
    /// flight at shutdown are awaited before returning.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            poll_interval_ms = self.settings.poll_interval.as_millis() as u64,
            batch_size = self.settings.batch_size,
            max_retries = self.settings.max_retries,
            "outbox relay started"
        );

        let mut interval = tokio::time::interval(self.settings.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks: JoinSet<TickOutcome> = JoinSet::new();

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let relay = Arc::clone(&self);
                    ticks.spawn(async move { relay.try_tick().await });
                }
                Some(joined) = ticks.join_next(), if !ticks.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "relay tick task failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        while let Some(joined) = ticks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "relay tick task failed");
            }
        }
        tracing::info!("outbox relay stopped");
    }
}
