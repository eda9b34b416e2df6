//! sea-orm stores for the billing tables.
//!
//! Store functions are free functions generic over [`ConnectionTrait`] and
//! return raw [`DbErr`]: the caller decides whether they run on the pool or
//! inside a unit of work, and how errors are reported.

pub mod invoices;
pub mod orders;
pub mod outbox;
pub mod processed_events;

use anyhow::Context as _;
use async_trait::async_trait;
use sea_orm::{DatabaseConnection, DbErr, SqlErr};
use uuid::Uuid;

use crate::domain::repository::OutboxRepository;
use crate::domain::types::{OutboxEvent, UnknownVariant};
use crate::error::BillingServiceError;

/// Which uniqueness rule a failed insert tripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniqueViolation {
    /// `processed_events` primary key: the event was already handled.
    ProcessedEvent,
    /// `invoices.order_id`: the order already has an invoice.
    Invoice,
    Other(String),
}

/// Classify `err` as a unique-constraint violation, if it is one.
///
/// PostgreSQL names the constraint (`processed_events_pkey`,
/// `uq_invoices_order_id`), SQLite names the column
/// (`processed_events.event_id`, `invoices.order_id`); both contain the table.
pub fn unique_violation(err: &DbErr) -> Option<UniqueViolation> {
    match err.sql_err()? {
        SqlErr::UniqueConstraintViolation(message) => Some(if message.contains("processed_events") {
            UniqueViolation::ProcessedEvent
        } else if message.contains("invoices") {
            UniqueViolation::Invoice
        } else {
            UniqueViolation::Other(message)
        }),
        _ => None,
    }
}

pub(crate) fn corrupt_column(err: UnknownVariant) -> DbErr {
    DbErr::Type(err.to_string())
}

// ── Outbox repository ─────────────────────────────────────────────────────────

/// [`OutboxRepository`] over the pool. Every call is its own implicit scope.
#[derive(Clone)]
pub struct DbOutboxRepository {
    pub db: DatabaseConnection,
}

impl DbOutboxRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OutboxRepository for DbOutboxRepository {
    async fn list_pending(
        &self,
        max_retries: i32,
        limit: u64,
    ) -> Result<Vec<OutboxEvent>, BillingServiceError> {
        let events = outbox::list_pending(&self.db, max_retries, limit)
            .await
            .context("list pending outbox events")?;
        Ok(events)
    }

    async fn mark_published(&self, id: Uuid) -> Result<(), BillingServiceError> {
        outbox::mark_published(&self.db, id)
            .await
            .context("mark outbox event published")?;
        Ok(())
    }

    async fn record_failure(
        &self,
        id: Uuid,
        error: &str,
    ) -> Result<OutboxEvent, BillingServiceError> {
        let event = outbox::record_failure(&self.db, id, error)
            .await
            .context("record outbox publish failure")?;
        Ok(event)
    }
}
