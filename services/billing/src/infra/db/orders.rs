use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use paydesk_billing_schema::orders;

use crate::domain::types::{Order, OrderStatus};

use super::corrupt_column;

/// Insert an order with a fresh v7 id.
pub async fn insert<C: ConnectionTrait>(
    conn: &C,
    amount: i64,
    status: OrderStatus,
) -> Result<Order, DbErr> {
    let now = Utc::now();
    let model = orders::ActiveModel {
        id: Set(Uuid::now_v7()),
        amount: Set(amount),
        status: Set(status.as_str().to_owned()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?;
    order_from_model(model)
}

pub async fn find_by_id<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<Option<Order>, DbErr> {
    orders::Entity::find_by_id(id)
        .one(conn)
        .await?
        .map(order_from_model)
        .transpose()
}

/// Newest first.
pub async fn list<C: ConnectionTrait>(conn: &C) -> Result<Vec<Order>, DbErr> {
    orders::Entity::find()
        .order_by_desc(orders::Column::CreatedAt)
        .order_by_desc(orders::Column::Id)
        .all(conn)
        .await?
        .into_iter()
        .map(order_from_model)
        .collect()
}

/// PENDING → PAID, guarded on the current status. Returns `false` when the
/// row was missing or no longer PENDING, in which case nothing changed.
pub async fn mark_paid<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    at: DateTime<Utc>,
) -> Result<bool, DbErr> {
    let result = orders::Entity::update_many()
        .col_expr(orders::Column::Status, Expr::value(OrderStatus::Paid.as_str()))
        .col_expr(orders::Column::UpdatedAt, Expr::value(at))
        .filter(orders::Column::Id.eq(id))
        .filter(orders::Column::Status.eq(OrderStatus::Pending.as_str()))
        .exec(conn)
        .await?;
    Ok(result.rows_affected == 1)
}

pub async fn count<C: ConnectionTrait>(conn: &C) -> Result<u64, DbErr> {
    orders::Entity::find().count(conn).await
}

pub async fn count_by_status<C: ConnectionTrait>(
    conn: &C,
    status: OrderStatus,
) -> Result<u64, DbErr> {
    orders::Entity::find()
        .filter(orders::Column::Status.eq(status.as_str()))
        .count(conn)
        .await
}

fn order_from_model(model: orders::Model) -> Result<Order, DbErr> {
    Ok(Order {
        id: model.id,
        amount: model.amount,
        status: model.status.parse().map_err(corrupt_column)?,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}
