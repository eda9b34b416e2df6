//! Shared infrastructure for Paydesk services.

pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
pub mod uow;
