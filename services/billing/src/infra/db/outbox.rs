use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use paydesk_billing_schema::outbox_events;

use crate::domain::types::{EventKind, NewOutboxEvent, OutboxEvent};

use super::corrupt_column;

/// Append an unpublished row stamped with the current time.
pub async fn append<C: ConnectionTrait>(
    conn: &C,
    event: NewOutboxEvent,
) -> Result<OutboxEvent, DbErr> {
    append_at(conn, event, Utc::now()).await
}

/// Append an unpublished row with an explicit `occurred_at`.
pub async fn append_at<C: ConnectionTrait>(
    conn: &C,
    event: NewOutboxEvent,
    occurred_at: DateTime<Utc>,
) -> Result<OutboxEvent, DbErr> {
    let model = outbox_events::ActiveModel {
        id: Set(Uuid::now_v7()),
        kind: Set(event.kind.as_str().to_owned()),
        order_id: Set(event.order_id),
        amount: Set(event.amount),
        occurred_at: Set(occurred_at),
        published_at: Set(None),
        failure_count: Set(0),
        last_error: Set(None),
    }
    .insert(conn)
    .await?;
    outbox_from_model(model)
}

/// Unpublished rows still inside the retry budget, oldest first. Ties on
/// `occurred_at` break on id.
pub async fn list_pending<C: ConnectionTrait>(
    conn: &C,
    max_retries: i32,
    limit: u64,
) -> Result<Vec<OutboxEvent>, DbErr> {
    outbox_events::Entity::find()
        .filter(outbox_events::Column::PublishedAt.is_null())
        .filter(outbox_events::Column::FailureCount.lt(max_retries))
        .order_by_asc(outbox_events::Column::OccurredAt)
        .order_by_asc(outbox_events::Column::Id)
        .limit(limit)
        .all(conn)
        .await?
        .into_iter()
        .map(outbox_from_model)
        .collect()
}

/// Stamp `published_at` once. Returns `false` if the row was already
/// published or does not exist.
pub async fn mark_published<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<bool, DbErr> {
    let result = outbox_events::Entity::update_many()
        .col_expr(outbox_events::Column::PublishedAt, Expr::value(Utc::now()))
        .filter(outbox_events::Column::Id.eq(id))
        .filter(outbox_events::Column::PublishedAt.is_null())
        .exec(conn)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Bump `failure_count` and overwrite `last_error`, then return the row.
pub async fn record_failure<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    error: &str,
) -> Result<OutboxEvent, DbErr> {
    let result = outbox_events::Entity::update_many()
        .col_expr(
            outbox_events::Column::FailureCount,
            Expr::col(outbox_events::Column::FailureCount).add(1),
        )
        .col_expr(outbox_events::Column::LastError, Expr::value(error))
        .filter(outbox_events::Column::Id.eq(id))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(DbErr::RecordNotFound(format!("outbox event {id}")));
    }
    get(conn, id)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("outbox event {id}")))
}

pub async fn get<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<Option<OutboxEvent>, DbErr> {
    outbox_events::Entity::find_by_id(id)
        .one(conn)
        .await?
        .map(outbox_from_model)
        .transpose()
}

/// Every row for one order, oldest first.
pub async fn list_by_order<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<Vec<OutboxEvent>, DbErr> {
    outbox_events::Entity::find()
        .filter(outbox_events::Column::OrderId.eq(order_id))
        .order_by_asc(outbox_events::Column::OccurredAt)
        .order_by_asc(outbox_events::Column::Id)
        .all(conn)
        .await?
        .into_iter()
        .map(outbox_from_model)
        .collect()
}

/// Rows with `published_at IS NULL`, abandoned ones included.
pub async fn count_unpublished<C: ConnectionTrait>(conn: &C) -> Result<u64, DbErr> {
    outbox_events::Entity::find()
        .filter(outbox_events::Column::PublishedAt.is_null())
        .count(conn)
        .await
}

pub async fn count_abandoned<C: ConnectionTrait>(conn: &C, max_retries: i32) -> Result<u64, DbErr> {
    outbox_events::Entity::find()
        .filter(outbox_events::Column::PublishedAt.is_null())
        .filter(outbox_events::Column::FailureCount.gte(max_retries))
        .count(conn)
        .await
}

pub async fn count_by_kind<C: ConnectionTrait>(conn: &C, kind: EventKind) -> Result<u64, DbErr> {
    outbox_events::Entity::find()
        .filter(outbox_events::Column::Kind.eq(kind.as_str()))
        .count(conn)
        .await
}

fn outbox_from_model(model: outbox_events::Model) -> Result<OutboxEvent, DbErr> {
    Ok(OutboxEvent {
        id: model.id,
        kind: model.kind.parse().map_err(corrupt_column)?,
        order_id: model.order_id,
        amount: model.amount,
        occurred_at: model.occurred_at,
        published_at: model.published_at,
        failure_count: model.failure_count,
        last_error: model.last_error,
    })
}
