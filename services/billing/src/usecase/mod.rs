pub mod invoice;
pub mod order;
pub mod outbox;
