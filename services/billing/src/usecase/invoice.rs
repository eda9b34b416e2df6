use anyhow::Context as _;
use async_trait::async_trait;
use paydesk_core::uow::UnitOfWork;
use sea_orm::DbErr;
use uuid::Uuid;

use crate::domain::repository::EventHandler;
use crate::domain::types::{BrokerEvent, Invoice, InvoiceStats};
use crate::error::BillingServiceError;
use crate::infra::db::{UniqueViolation, invoices, processed_events, unique_violation};

/// What a delivery of ORDER_PAID amounted to.
#[derive(Debug, Clone, PartialEq)]
pub enum IssueInvoiceOutcome {
    /// First delivery: ledger row and invoice committed together.
    Issued(Invoice),
    /// The event id is already in the ledger.
    AlreadyProcessed,
    /// A different event already produced this order's invoice.
    InvoiceAlreadyIssued,
}

/// Idempotent ORDER_PAID consumer.
#[derive(Clone)]
pub struct IssueInvoiceUseCase {
    pub uow: UnitOfWork,
}

impl IssueInvoiceUseCase {
    pub async fn execute(
        &self,
        event: &BrokerEvent,
    ) -> Result<IssueInvoiceOutcome, BillingServiceError> {
        tracing::info!(
            event_id = %event.event_id,
            order_id = %event.order_id,
            amount = event.amount,
            "received ORDER_PAID"
        );

        let (event_id, kind, order_id, amount) =
            (event.event_id, event.event_kind, event.order_id, event.amount);
        let committed = self
            .uow
            .transaction::<_, Invoice, DbErr>(move |txn| {
                Box::pin(async move {
                    processed_events::insert(txn, event_id, kind).await?;
                    invoices::insert(txn, order_id, amount).await
                })
            })
            .await;

        match committed {
            Ok(invoice) => {
                tracing::info!(
                    event_id = %event_id,
                    invoice_id = %invoice.id,
                    order_id = %order_id,
                    "invoice issued"
                );
                Ok(IssueInvoiceOutcome::Issued(invoice))
            }
            Err(err) => match unique_violation(&err) {
                Some(UniqueViolation::ProcessedEvent) => {
                    tracing::info!(event_id = %event_id, "event already processed; skipping");
                    Ok(IssueInvoiceOutcome::AlreadyProcessed)
                }
                Some(UniqueViolation::Invoice) => {
                    tracing::info!(
                        event_id = %event_id,
                        order_id = %order_id,
                        "invoice already issued for order; skipping"
                    );
                    Ok(IssueInvoiceOutcome::InvoiceAlreadyIssued)
                }
                Some(UniqueViolation::Other(_)) | None => {
                    tracing::error!(event_id = %event_id, error = %err, "failed to issue invoice");
                    Err(anyhow::Error::new(err).context("issue invoice").into())
                }
            },
        }
    }
}

#[async_trait]
impl EventHandler for IssueInvoiceUseCase {
    async fn handle(&self, event: &BrokerEvent) -> anyhow::Result<()> {
        self.execute(event).await?;
        Ok(())
    }
}

pub struct ListInvoicesUseCase {
    pub uow: UnitOfWork,
}

impl ListInvoicesUseCase {
    pub async fn execute(&self) -> Result<Vec<Invoice>, BillingServiceError> {
        let invoices = invoices::list(self.uow.connection())
            .await
            .context("list invoices")?;
        Ok(invoices)
    }
}

pub struct GetInvoiceUseCase {
    pub uow: UnitOfWork,
}

impl GetInvoiceUseCase {
    pub async fn execute(&self, id: Uuid) -> Result<Invoice, BillingServiceError> {
        invoices::find_by_id(self.uow.connection(), id)
            .await
            .context("find invoice")?
            .ok_or(BillingServiceError::InvoiceNotFound)
    }

    pub async fn execute_by_order(&self, order_id: Uuid) -> Result<Invoice, BillingServiceError> {
        invoices::find_by_order_id(self.uow.connection(), order_id)
            .await
            .context("find invoice by order")?
            .ok_or(BillingServiceError::InvoiceNotFound)
    }
}

pub struct InvoiceStatsUseCase {
    pub uow: UnitOfWork,
}

impl InvoiceStatsUseCase {
    pub async fn execute(&self) -> Result<InvoiceStats, BillingServiceError> {
        let conn = self.uow.connection();
        let total_invoices = invoices::count(conn).await.context("count invoices")?;
        let total_processed_events = processed_events::count(conn)
            .await
            .context("count processed events")?;
        Ok(InvoiceStats {
            total_invoices,
            total_processed_events,
        })
    }
}
