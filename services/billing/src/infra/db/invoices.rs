use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use paydesk_billing_schema::invoices;

use crate::domain::types::Invoice;

pub async fn insert<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    amount: i64,
) -> Result<Invoice, DbErr> {
    let model = invoices::ActiveModel {
        id: Set(Uuid::now_v7()),
        order_id: Set(order_id),
        amount: Set(amount),
        issued_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?;
    Ok(invoice_from_model(model))
}

pub async fn find_by_id<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<Option<Invoice>, DbErr> {
    let model = invoices::Entity::find_by_id(id).one(conn).await?;
    Ok(model.map(invoice_from_model))
}

pub async fn find_by_order_id<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<Option<Invoice>, DbErr> {
    let model = invoices::Entity::find()
        .filter(invoices::Column::OrderId.eq(order_id))
        .one(conn)
        .await?;
    Ok(model.map(invoice_from_model))
}

/// Newest first.
pub async fn list<C: ConnectionTrait>(conn: &C) -> Result<Vec<Invoice>, DbErr> {
    let models = invoices::Entity::find()
        .order_by_desc(invoices::Column::IssuedAt)
        .order_by_desc(invoices::Column::Id)
        .all(conn)
        .await?;
    Ok(models.into_iter().map(invoice_from_model).collect())
}

pub async fn count<C: ConnectionTrait>(conn: &C) -> Result<u64, DbErr> {
    invoices::Entity::find().count(conn).await
}

fn invoice_from_model(model: invoices::Model) -> Invoice {
    Invoice {
        id: model.id,
        order_id: model.order_id,
        amount: model.amount,
        issued_at: model.issued_at,
    }
}
