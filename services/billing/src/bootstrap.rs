//! Startup wiring shared by the binary and the tests.

use std::sync::Arc;

use paydesk_core::uow::UnitOfWork;

use crate::domain::repository::OutboxRepository;
use crate::domain::types::EventKind;
use crate::infra::broker::InMemoryBroker;
use crate::relay::{OutboxRelay, RelaySettings};
use crate::usecase::invoice::IssueInvoiceUseCase;

/// Dispatch table: ORDER_PAID → invoice issuer. ORDER_CREATED has no
/// subscriber.
pub fn build_broker(uow: UnitOfWork, failures_before_success: u32) -> InMemoryBroker {
    InMemoryBroker::builder()
        .subscribe(EventKind::OrderPaid, Arc::new(IssueInvoiceUseCase { uow }))
        .failures_before_success(failures_before_success)
        .build()
}

/// The relay shares the broker with the HTTP state.
pub fn build_relay<R>(
    outbox: R,
    broker: Arc<InMemoryBroker>,
    settings: RelaySettings,
) -> Arc<OutboxRelay<R, Arc<InMemoryBroker>>>
where
    R: OutboxRepository,
{
    Arc::new(OutboxRelay::new(outbox, broker, settings))
}
