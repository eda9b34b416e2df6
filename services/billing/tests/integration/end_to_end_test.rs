use std::sync::Arc;

use paydesk_core::uow::UnitOfWork;

use paydesk_billing::bootstrap::{build_broker, build_relay};
use paydesk_billing::domain::types::{EventKind, OrderStatus};
use paydesk_billing::infra::db::{DbOutboxRepository, outbox};
use paydesk_billing::relay::{RelaySettings, TickOutcome};
use paydesk_billing::usecase::invoice::{GetInvoiceUseCase, InvoiceStatsUseCase};
use paydesk_billing::usecase::order::{CreateOrderInput, CreateOrderUseCase, PayOrderUseCase};
use paydesk_billing::usecase::outbox::OutboxStatsUseCase;
use paydesk_testing::db::TestDb;

#[tokio::test]
async fn should_issue_one_invoice_for_a_paid_order() {
    let db = TestDb::migrated().await;
    let uow = UnitOfWork::new(db.clone());
    let broker = Arc::new(build_broker(uow.clone(), 0));
    let relay = build_relay(
        DbOutboxRepository::new(db.clone()),
        Arc::clone(&broker),
        RelaySettings::default(),
    );

    let order = CreateOrderUseCase { uow: uow.clone() }
        .execute(CreateOrderInput {
            amount: 15_000,
            status: None,
        })
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);

    let paid = PayOrderUseCase { uow: uow.clone() }
        .execute(order.id)
        .await
        .unwrap();
    assert_eq!(paid.order.status, OrderStatus::Paid);

    let rows = outbox::list_by_order(&db, order.id).await.unwrap();
    let order_paid: Vec<_> = rows
        .iter()
        .filter(|e| e.kind == EventKind::OrderPaid)
        .collect();
    assert_eq!(order_paid.len(), 1);
    assert_eq!(order_paid[0].amount, 15_000);
    assert!(order_paid[0].published_at.is_none());

    let outcome = relay.try_tick().await;
    assert!(
        matches!(outcome, TickOutcome::Completed(r) if r.published == 2),
        "ORDER_CREATED and ORDER_PAID should both go out: {outcome:?}"
    );

    let published = outbox::get(&db, paid.event.id).await.unwrap().unwrap();
    assert!(published.published_at.is_some());

    let invoice = GetInvoiceUseCase { uow: uow.clone() }
        .execute_by_order(order.id)
        .await
        .unwrap();
    assert_eq!(invoice.amount, 15_000);

    let stats = InvoiceStatsUseCase { uow: uow.clone() }
        .execute()
        .await
        .unwrap();
    assert_eq!(stats.total_invoices, 1);
    assert_eq!(stats.total_processed_events, 1);

    let outbox_stats = OutboxStatsUseCase {
        uow,
        max_retries: RelaySettings::default().max_retries,
    }
    .execute()
    .await
    .unwrap();
    assert_eq!(outbox_stats.unpublished_count, 0);
    assert_eq!(outbox_stats.abandoned_count, 0);
    assert_eq!(outbox_stats.order_created_count, 1);
    assert_eq!(outbox_stats.order_paid_count, 1);

    // Nothing left to relay.
    let idle = relay.try_tick().await;
    assert!(matches!(idle, TickOutcome::Completed(r) if r.fetched == 0));
}
