use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use paydesk_core::serde::to_rfc3339_ms;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::types::{Invoice, InvoiceStats};
use crate::error::BillingServiceError;
use crate::state::AppState;
use crate::usecase::invoice::{GetInvoiceUseCase, InvoiceStatsUseCase, ListInvoicesUseCase};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount: i64,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub issued_at: DateTime<Utc>,
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        Self {
            id: invoice.id,
            order_id: invoice.order_id,
            amount: invoice.amount,
            issued_at: invoice.issued_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceStatsResponse {
    pub total_invoices: u64,
    pub total_processed_events: u64,
}

impl From<InvoiceStats> for InvoiceStatsResponse {
    fn from(stats: InvoiceStats) -> Self {
        Self {
            total_invoices: stats.total_invoices,
            total_processed_events: stats.total_processed_events,
        }
    }
}

pub async fn list_invoices(
    State(state): State<AppState>,
) -> Result<Json<Vec<InvoiceResponse>>, BillingServiceError> {
    let usecase = ListInvoicesUseCase { uow: state.uow() };
    let invoices = usecase.execute().await?;
    Ok(Json(invoices.into_iter().map(InvoiceResponse::from).collect()))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, BillingServiceError> {
    let usecase = GetInvoiceUseCase { uow: state.uow() };
    Ok(Json(usecase.execute(id).await?.into()))
}

pub async fn get_invoice_by_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, BillingServiceError> {
    let usecase = GetInvoiceUseCase { uow: state.uow() };
    Ok(Json(usecase.execute_by_order(order_id).await?.into()))
}

pub async fn invoice_stats(
    State(state): State<AppState>,
) -> Result<Json<InvoiceStatsResponse>, BillingServiceError> {
    let usecase = InvoiceStatsUseCase { uow: state.uow() };
    Ok(Json(usecase.execute().await?.into()))
}
