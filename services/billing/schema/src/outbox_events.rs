use sea_orm::entity::prelude::*;

/// Outbound notification written in the same transaction as the order
/// mutation it reports. Rows are never deleted; an exhausted row keeps
/// `published_at = NULL` with `failure_count` at the retry ceiling.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "outbox_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub kind: String,
    pub order_id: Uuid,
    pub amount: i64,
    pub occurred_at: chrono::DateTime<chrono::Utc>,
    pub published_at: Option<chrono::DateTime<chrono::Utc>>,
    pub failure_count: i32,
    pub last_error: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
