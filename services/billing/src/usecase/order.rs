use anyhow::Context as _;
use chrono::Utc;
use paydesk_core::uow::UnitOfWork;
use uuid::Uuid;

use crate::domain::types::{EventKind, NewOutboxEvent, Order, OrderStatus, PayOrderResult};
use crate::error::BillingServiceError;
use crate::infra::db::{orders, outbox};

pub struct CreateOrderInput {
    pub amount: i64,
    pub status: Option<OrderStatus>,
}

pub struct CreateOrderUseCase {
    pub uow: UnitOfWork,
}

impl CreateOrderUseCase {
    pub async fn execute(&self, input: CreateOrderInput) -> Result<Order, BillingServiceError> {
        if input.amount <= 0 {
            return Err(BillingServiceError::InvalidAmount);
        }
        let amount = input.amount;
        let status = input.status.unwrap_or(OrderStatus::Pending);

        // Order row + ORDER_CREATED outbox row in one transaction.
        let order = self
            .uow
            .transaction::<_, Order, BillingServiceError>(move |txn| {
                Box::pin(async move {
                    let order = orders::insert(txn, amount, status)
                        .await
                        .context("insert order")?;
                    outbox::append(
                        txn,
                        NewOutboxEvent {
                            kind: EventKind::OrderCreated,
                            order_id: order.id,
                            amount: order.amount,
                        },
                    )
                    .await
                    .context("append ORDER_CREATED")?;
                    Ok(order)
                })
            })
            .await?;

        tracing::info!(order_id = %order.id, amount = order.amount, "order created");
        Ok(order)
    }
}

pub struct ListOrdersUseCase {
    pub uow: UnitOfWork,
}

impl ListOrdersUseCase {
    pub async fn execute(&self) -> Result<Vec<Order>, BillingServiceError> {
        let orders = orders::list(self.uow.connection())
            .await
            .context("list orders")?;
        Ok(orders)
    }
}

pub struct GetOrderUseCase {
    pub uow: UnitOfWork,
}

impl GetOrderUseCase {
    pub async fn execute(&self, id: Uuid) -> Result<Order, BillingServiceError> {
        orders::find_by_id(self.uow.connection(), id)
            .await
            .context("find order")?
            .ok_or(BillingServiceError::OrderNotFound)
    }
}

pub struct PayOrderUseCase {
    pub uow: UnitOfWork,
}

impl PayOrderUseCase {
    pub async fn execute(&self, id: Uuid) -> Result<PayOrderResult, BillingServiceError> {
        // 1. Order must exist → 404
        let order = orders::find_by_id(self.uow.connection(), id)
            .await
            .context("find order")?
            .ok_or(BillingServiceError::OrderNotFound)?;

        // 2. PAID is terminal → 400
        if !order.status.can_transition_to(OrderStatus::Paid) {
            return Err(BillingServiceError::InvalidStateTransition);
        }

        // 3. Status transition + ORDER_PAID outbox row in one transaction. The
        //    update is conditional on PENDING, so a concurrent payment that
        //    won in between leaves this one with zero rows and no event.
        let result = self
            .uow
            .transaction::<_, PayOrderResult, BillingServiceError>(move |txn| {
                Box::pin(async move {
                    let now = Utc::now();
                    if !orders::mark_paid(txn, id, now).await.context("mark order paid")? {
                        return Err(BillingServiceError::InvalidStateTransition);
                    }
                    let event = outbox::append(
                        txn,
                        NewOutboxEvent {
                            kind: EventKind::OrderPaid,
                            order_id: order.id,
                            amount: order.amount,
                        },
                    )
                    .await
                    .context("append ORDER_PAID")?;
                    let order = Order {
                        status: OrderStatus::Paid,
                        updated_at: now,
                        ..order
                    };
                    Ok(PayOrderResult { order, event })
                })
            })
            .await?;

        tracing::info!(
            order_id = %id,
            event_id = %result.event.id,
            "order paid"
        );
        Ok(result)
    }
}
