use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use paydesk_core::serde::to_rfc3339_ms;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::types::{Order, OrderStatus, PayOrderResult};
use crate::error::BillingServiceError;
use crate::handlers::outbox::OutboxEventResponse;
use crate::state::AppState;
use crate::usecase::order::{
    CreateOrderInput, CreateOrderUseCase, GetOrderUseCase, ListOrdersUseCase, PayOrderUseCase,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub amount: i64,
    pub status: OrderStatus,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            amount: order.amount,
            status: order.status,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

// ── POST /orders ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub amount: i64,
    pub status: Option<OrderStatus>,
}

pub async fn create_order(
    State(state): State<AppState>,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), BillingServiceError> {
    let usecase = CreateOrderUseCase { uow: state.uow() };
    let order = usecase
        .execute(CreateOrderInput {
            amount: body.amount,
            status: body.status,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

// ── GET /orders ───────────────────────────────────────────────────────────────

pub async fn list_orders(
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderResponse>>, BillingServiceError> {
    let usecase = ListOrdersUseCase { uow: state.uow() };
    let orders = usecase.execute().await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

// ── GET /orders/{id} ──────────────────────────────────────────────────────────

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, BillingServiceError> {
    let usecase = GetOrderUseCase { uow: state.uow() };
    Ok(Json(usecase.execute(id).await?.into()))
}

// ── POST /orders/{id}/pay ─────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct PayOrderResponse {
    pub order: OrderResponse,
    pub event: OutboxEventResponse,
}

impl From<PayOrderResult> for PayOrderResponse {
    fn from(result: PayOrderResult) -> Self {
        Self {
            order: result.order.into(),
            event: result.event.into(),
        }
    }
}

pub async fn pay_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PayOrderResponse>, BillingServiceError> {
    let usecase = PayOrderUseCase { uow: state.uow() };
    Ok(Json(usecase.execute(id).await?.into()))
}
