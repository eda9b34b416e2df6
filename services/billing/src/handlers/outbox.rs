use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use paydesk_core::serde::{to_rfc3339_ms, to_rfc3339_ms_opt};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::types::{EventKind, OutboxEvent, OutboxStats};
use crate::error::BillingServiceError;
use crate::state::AppState;
use crate::usecase::outbox::{GetOutboxEventUseCase, OutboxStatsUseCase};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxEventResponse {
    pub id: Uuid,
    pub kind: EventKind,
    pub order_id: Uuid,
    pub amount: i64,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub occurred_at: DateTime<Utc>,
    #[serde(serialize_with = "to_rfc3339_ms_opt")]
    pub published_at: Option<DateTime<Utc>>,
    pub failure_count: i32,
    pub last_error: Option<String>,
}

impl From<OutboxEvent> for OutboxEventResponse {
    fn from(event: OutboxEvent) -> Self {
        Self {
            id: event.id,
            kind: event.kind,
            order_id: event.order_id,
            amount: event.amount,
            occurred_at: event.occurred_at,
            published_at: event.published_at,
            failure_count: event.failure_count,
            last_error: event.last_error,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxStatsResponse {
    pub unpublished_count: u64,
    pub abandoned_count: u64,
    pub order_created_count: u64,
    pub order_paid_count: u64,
}

impl From<OutboxStats> for OutboxStatsResponse {
    fn from(stats: OutboxStats) -> Self {
        Self {
            unpublished_count: stats.unpublished_count,
            abandoned_count: stats.abandoned_count,
            order_created_count: stats.order_created_count,
            order_paid_count: stats.order_paid_count,
        }
    }
}

pub async fn get_outbox_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OutboxEventResponse>, BillingServiceError> {
    let usecase = GetOutboxEventUseCase { uow: state.uow() };
    Ok(Json(usecase.execute(id).await?.into()))
}

pub async fn outbox_stats(
    State(state): State<AppState>,
) -> Result<Json<OutboxStatsResponse>, BillingServiceError> {
    let usecase = OutboxStatsUseCase {
        uow: state.uow(),
        max_retries: state.max_retries,
    };
    Ok(Json(usecase.execute().await?.into()))
}
