pub mod broker;
pub mod health;
pub mod invoice;
pub mod order;
pub mod outbox;
