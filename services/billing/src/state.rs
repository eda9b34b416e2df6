use std::sync::Arc;

use paydesk_core::uow::UnitOfWork;
use sea_orm::DatabaseConnection;

use crate::infra::broker::InMemoryBroker;
use crate::infra::db::DbOutboxRepository;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub broker: Arc<InMemoryBroker>,
    /// Retry ceiling used to report abandoned outbox rows.
    pub max_retries: i32,
}

impl AppState {
    pub fn uow(&self) -> UnitOfWork {
        UnitOfWork::new(self.db.clone())
    }

    pub fn outbox_repo(&self) -> DbOutboxRepository {
        DbOutboxRepository::new(self.db.clone())
    }
}
