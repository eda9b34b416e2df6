//! In-process event broker.
//!
//! Delivery is synchronous: `publish` awaits every subscriber of the event's
//! kind before resolving. Nothing is persisted and nothing is redelivered; a
//! subscriber error is logged and dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::repository::{EventBroker, EventHandler};
use crate::domain::types::{BrokerEvent, EventKind};
use crate::error::PublishError;

/// Fail the first N publish attempts, then succeed and disarm.
#[derive(Debug, Default)]
struct FailureSimulation {
    failures_before_success: u32,
    current_failure_count: u32,
}

impl FailureSimulation {
    fn armed(&self) -> bool {
        self.failures_before_success > 0
    }

    /// One publish attempt. `Err` while failures remain; the attempt that
    /// exhausts the budget resets the simulation.
    fn attempt(&mut self) -> Result<(), PublishError> {
        if !self.armed() {
            return Ok(());
        }
        if self.current_failure_count < self.failures_before_success {
            self.current_failure_count += 1;
            return Err(PublishError::Simulated {
                attempt: self.current_failure_count,
                configured: self.failures_before_success,
            });
        }
        tracing::info!(
            simulated_failures = self.current_failure_count,
            "broker recovered after simulated failures"
        );
        *self = Self::default();
        Ok(())
    }

    fn status(&self) -> FailureSimulationStatus {
        FailureSimulationStatus {
            simulate_failure: self.armed(),
            failures_before_success: self.failures_before_success,
            current_failure_count: self.current_failure_count,
            remaining_failures: self
                .failures_before_success
                .saturating_sub(self.current_failure_count),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureSimulationStatus {
    pub simulate_failure: bool,
    pub failures_before_success: u32,
    pub current_failure_count: u32,
    pub remaining_failures: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerStats {
    /// Kinds with at least one subscriber, in declaration order.
    pub event_kinds: Vec<EventKind>,
    pub total_subscribers: usize,
    pub failure_simulation: FailureSimulationStatus,
}

type Subscribers = HashMap<EventKind, Vec<Arc<dyn EventHandler>>>;

/// Builds the dispatch table once; the broker cannot gain subscribers later.
#[derive(Default)]
pub struct InMemoryBrokerBuilder {
    subscribers: Subscribers,
    failures_before_success: u32,
}

impl InMemoryBrokerBuilder {
    pub fn subscribe(mut self, kind: EventKind, handler: Arc<dyn EventHandler>) -> Self {
        tracing::info!(event_kind = %kind, "subscriber registered");
        self.subscribers.entry(kind).or_default().push(handler);
        self
    }

    /// Arm failure injection from the start.
    pub fn failures_before_success(mut self, n: u32) -> Self {
        self.failures_before_success = n;
        self
    }

    pub fn build(self) -> InMemoryBroker {
        InMemoryBroker {
            subscribers: self.subscribers,
            simulation: Mutex::new(FailureSimulation {
                failures_before_success: self.failures_before_success,
                current_failure_count: 0,
            }),
        }
    }
}

pub struct InMemoryBroker {
    subscribers: Subscribers,
    simulation: Mutex<FailureSimulation>,
}

impl InMemoryBroker {
    pub fn builder() -> InMemoryBrokerBuilder {
        InMemoryBrokerBuilder::default()
    }

    pub fn configure_failure_simulation(&self, failures_before_success: u32) {
        let mut sim = self.lock_simulation();
        *sim = FailureSimulation {
            failures_before_success,
            current_failure_count: 0,
        };
        if sim.armed() {
            tracing::warn!(failures_before_success, "broker failure simulation armed");
        }
    }

    pub fn reset_failure_simulation(&self) {
        *self.lock_simulation() = FailureSimulation::default();
        tracing::info!("broker failure simulation reset");
    }

    pub fn failure_simulation_status(&self) -> FailureSimulationStatus {
        self.lock_simulation().status()
    }

    pub fn stats(&self) -> BrokerStats {
        let event_kinds: Vec<EventKind> = EventKind::ALL
            .into_iter()
            .filter(|kind| self.subscribers.get(kind).is_some_and(|h| !h.is_empty()))
            .collect();
        BrokerStats {
            event_kinds,
            total_subscribers: self.subscribers.values().map(Vec::len).sum(),
            failure_simulation: self.failure_simulation_status(),
        }
    }

    fn lock_simulation(&self) -> std::sync::MutexGuard<'_, FailureSimulation> {
        self.simulation.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl EventBroker for InMemoryBroker {
    async fn publish(&self, event: &BrokerEvent) -> Result<(), PublishError> {
        tracing::info!(
            event_id = %event.event_id,
            event_kind = %event.event_kind,
            "publishing event"
        );

        // Guard dropped before any await.
        let attempt = self.lock_simulation().attempt();
        if let Err(e) = attempt {
            tracing::error!(event_id = %event.event_id, error = %e, "publish rejected");
            return Err(e);
        }

        let handlers = self
            .subscribers
            .get(&event.event_kind)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for handler in handlers {
            if let Err(e) = handler.handle(event).await {
                let chain = format!("{e:#}");
                tracing::error!(
                    event_id = %event.event_id,
                    event_kind = %event.event_kind,
                    error = %chain,
                    "subscriber failed; event dropped"
                );
            }
        }

        tracing::info!(event_id = %event.event_id, "event published");
        Ok(())
    }
}
