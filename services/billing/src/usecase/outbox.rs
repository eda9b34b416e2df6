use anyhow::Context as _;
use paydesk_core::uow::UnitOfWork;
use uuid::Uuid;

use crate::domain::types::{EventKind, OutboxEvent, OutboxStats};
use crate::error::BillingServiceError;
use crate::infra::db::outbox;

pub struct GetOutboxEventUseCase {
    pub uow: UnitOfWork,
}

impl GetOutboxEventUseCase {
    pub async fn execute(&self, id: Uuid) -> Result<OutboxEvent, BillingServiceError> {
        outbox::get(self.uow.connection(), id)
            .await
            .context("find outbox event")?
            .ok_or(BillingServiceError::OutboxEventNotFound)
    }
}

pub struct OutboxStatsUseCase {
    pub uow: UnitOfWork,
    /// Rows at or above this failure count are reported as abandoned.
    pub max_retries: i32,
}

impl OutboxStatsUseCase {
    pub async fn execute(&self) -> Result<OutboxStats, BillingServiceError> {
        let conn = self.uow.connection();
        let unpublished_count = outbox::count_unpublished(conn)
            .await
            .context("count unpublished outbox events")?;
        let abandoned_count = outbox::count_abandoned(conn, self.max_retries)
            .await
            .context("count abandoned outbox events")?;
        let order_created_count = outbox::count_by_kind(conn, EventKind::OrderCreated)
            .await
            .context("count ORDER_CREATED events")?;
        let order_paid_count = outbox::count_by_kind(conn, EventKind::OrderPaid)
            .await
            .context("count ORDER_PAID events")?;
        Ok(OutboxStats {
            unpublished_count,
            abandoned_count,
            order_created_count,
            order_paid_count,
        })
    }
}
