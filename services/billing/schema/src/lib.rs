//! sea-orm entities for the billing service tables.

pub mod invoices;
pub mod orders;
pub mod outbox_events;
pub mod processed_events;
