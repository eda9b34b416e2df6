//! Ports used by the outbox relay and the broker.
//!
//! These are object-safe (`async_trait`) so the relay can run on a spawned
//! task and the broker can hold heterogeneous subscribers.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::types::{BrokerEvent, OutboxEvent};
use crate::error::{BillingServiceError, PublishError};

/// Outbox operations the relay needs. Each call is its own scope; the relay
/// never mutates a row together with anything else.
#[async_trait]
pub trait OutboxRepository: Send + Sync {
    /// Unpublished rows with `failure_count < max_retries`, oldest first,
    /// at most `limit`.
    async fn list_pending(
        &self,
        max_retries: i32,
        limit: u64,
    ) -> Result<Vec<OutboxEvent>, BillingServiceError>;

    /// Set `published_at`. Repeating the call is a no-op.
    async fn mark_published(&self, id: Uuid) -> Result<(), BillingServiceError>;

    /// Increment `failure_count`, store `error` as `last_error`, and return
    /// the updated row.
    async fn record_failure(
        &self,
        id: Uuid,
        error: &str,
    ) -> Result<OutboxEvent, BillingServiceError>;
}

/// Publishing side of the message channel.
#[async_trait]
pub trait EventBroker: Send + Sync {
    /// Resolves once the event has been handed off.
    async fn publish(&self, event: &BrokerEvent) -> Result<(), PublishError>;
}

/// Subscriber invoked once per delivered event of the kind it is registered for.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &BrokerEvent) -> anyhow::Result<()>;
}

#[async_trait]
impl<T> OutboxRepository for Arc<T>
where
    T: OutboxRepository + ?Sized,
{
    async fn list_pending(
        &self,
        max_retries: i32,
        limit: u64,
    ) -> Result<Vec<OutboxEvent>, BillingServiceError> {
        (**self).list_pending(max_retries, limit).await
    }

    async fn mark_published(&self, id: Uuid) -> Result<(), BillingServiceError> {
        (**self).mark_published(id).await
    }

    async fn record_failure(
        &self,
        id: Uuid,
        error: &str,
    ) -> Result<OutboxEvent, BillingServiceError> {
        (**self).record_failure(id, error).await
    }
}

#[async_trait]
impl<T> EventBroker for Arc<T>
where
    T: EventBroker + ?Sized,
{
    async fn publish(&self, event: &BrokerEvent) -> Result<(), PublishError> {
        (**self).publish(event).await
    }
}
