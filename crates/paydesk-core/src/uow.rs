//! Unit of Work over a sea-orm connection.
//!
//! Store functions take their execution context explicitly as
//! `&impl ConnectionTrait`. Handing them the [`DatabaseConnection`] runs each
//! statement in its own implicit scope; handing them the
//! [`DatabaseTransaction`] passed to a [`UnitOfWork::transaction`] body makes
//! them part of one atomic commit. There is no ambient "current transaction"
//! and no nesting: a body that needs a second store call passes the same
//! `txn` down.

use std::future::Future;
use std::pin::Pin;

use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionError, TransactionTrait};

/// Future returned by a transaction body. Borrows the open transaction.
pub type ScopedFuture<'c, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>;

#[derive(Clone)]
pub struct UnitOfWork {
    db: DatabaseConnection,
}

impl UnitOfWork {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The underlying pool, for statements that run outside any unit of work.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Run `body` inside a fresh transaction.
    ///
    /// Commits when `body` returns `Ok`, rolls back when it returns `Err`
    /// (or panics; the transaction handle rolls back on drop). Failures to
    /// begin or commit surface as `E::from(DbErr)`.
    pub async fn transaction<F, T, E>(&self, body: F) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c DatabaseTransaction) -> ScopedFuture<'c, T, E> + Send,
        T: Send,
        E: From<DbErr> + std::fmt::Display + std::fmt::Debug + Send,
    {
        self.db.transaction(body).await.map_err(|err| match err {
            TransactionError::Connection(db_err) => E::from(db_err),
            TransactionError::Transaction(inner) => {
                tracing::debug!(error = %inner, "unit of work rolled back");
                inner
            }
        })
    }
}
