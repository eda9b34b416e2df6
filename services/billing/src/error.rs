use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sea_orm::DbErr;

/// Billing service domain error variants.
#[derive(Debug, thiserror::Error)]
pub enum BillingServiceError {
    #[error("order not found")]
    OrderNotFound,
    #[error("invoice not found")]
    InvoiceNotFound,
    #[error("outbox event not found")]
    OutboxEventNotFound,
    #[error("order already paid")]
    InvalidStateTransition,
    #[error("amount must be a positive integer")]
    InvalidAmount,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl BillingServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OrderNotFound => "ORDER_NOT_FOUND",
            Self::InvoiceNotFound => "INVOICE_NOT_FOUND",
            Self::OutboxEventNotFound => "OUTBOX_EVENT_NOT_FOUND",
            Self::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            Self::InvalidAmount => "INVALID_AMOUNT",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

/// Begin/commit failures raised by the unit of work itself.
impl From<DbErr> for BillingServiceError {
    fn from(err: DbErr) -> Self {
        Self::Internal(anyhow::Error::new(err).context("unit of work"))
    }
}

impl IntoResponse for BillingServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::OrderNotFound | Self::InvoiceNotFound | Self::OutboxEventNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::InvalidStateTransition | Self::InvalidAmount => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // 4xx are expected client errors and already visible in the TraceLayer
        // span. Internal errors need the anyhow chain for the root cause.
        if let Self::Internal(ref e) = self {
            let chain = format!("{e:#}");
            tracing::error!(error = %chain, kind = "INTERNAL", "internal error");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}

/// Why the broker refused a publish. The `Display` text is what the relay
/// stores in `outbox_events.last_error`.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("simulated broker failure {attempt}/{configured}")]
    Simulated { attempt: u32, configured: u32 },
    #[error("broker unavailable: {0}")]
    Unavailable(String),
}
