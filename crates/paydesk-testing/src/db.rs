//! In-memory SQLite with the billing schema applied.
//!
//! SQLite enforces the same primary-key, unique and foreign-key constraints
//! the service relies on in PostgreSQL, and reports violations through the
//! same `DbErr::sql_err()` classification, so stores and use cases can be
//! exercised against a real engine without a running server.

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use paydesk_billing_migration::Migrator;

/// Each `sqlite::memory:` connection is its own database, so the pool is
/// pinned to a single long-lived connection.
const MEMORY_URL: &str = "sqlite::memory:";

pub struct TestDb;

impl TestDb {
    /// Connect to a fresh in-memory database and run every migration.
    ///
    /// Panics if the connection or a migration fails.
    pub async fn migrated() -> DatabaseConnection {
        let mut opts = ConnectOptions::new(MEMORY_URL);
        opts.max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);
        let db = Database::connect(opts)
            .await
            .unwrap_or_else(|e| panic!("failed to open in-memory database: {e}"));
        Migrator::up(&db, None)
            .await
            .unwrap_or_else(|e| panic!("failed to migrate test database: {e}"));
        db
    }
}
