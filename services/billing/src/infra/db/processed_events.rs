use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryOrder,
};
use uuid::Uuid;

use paydesk_billing_schema::processed_events;

use crate::domain::types::{EventKind, ProcessedEvent};

use super::corrupt_column;

/// Record `event_id` as handled. Fails with a unique violation if it
/// already is.
pub async fn insert<C: ConnectionTrait>(
    conn: &C,
    event_id: Uuid,
    kind: EventKind,
) -> Result<ProcessedEvent, DbErr> {
    let model = processed_events::ActiveModel {
        event_id: Set(event_id),
        kind: Set(kind.as_str().to_owned()),
        processed_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?;
    processed_from_model(model)
}

pub async fn exists<C: ConnectionTrait>(conn: &C, event_id: Uuid) -> Result<bool, DbErr> {
    Ok(find_by_id(conn, event_id).await?.is_some())
}

pub async fn find_by_id<C: ConnectionTrait>(
    conn: &C,
    event_id: Uuid,
) -> Result<Option<ProcessedEvent>, DbErr> {
    processed_events::Entity::find_by_id(event_id)
        .one(conn)
        .await?
        .map(processed_from_model)
        .transpose()
}

pub async fn count<C: ConnectionTrait>(conn: &C) -> Result<u64, DbErr> {
    processed_events::Entity::find().count(conn).await
}

/// Newest first.
pub async fn list<C: ConnectionTrait>(conn: &C) -> Result<Vec<ProcessedEvent>, DbErr> {
    processed_events::Entity::find()
        .order_by_desc(processed_events::Column::ProcessedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(processed_from_model)
        .collect()
}

fn processed_from_model(model: processed_events::Model) -> Result<ProcessedEvent, DbErr> {
    Ok(ProcessedEvent {
        event_id: model.event_id,
        kind: model.kind.parse().map_err(corrupt_column)?,
        processed_at: model.processed_at,
    })
}
