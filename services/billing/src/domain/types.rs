use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pending events fetched per relay tick.
pub const OUTBOX_BATCH_SIZE: u64 = 10;

/// Publish attempts before an outbox event is abandoned.
pub const OUTBOX_MAX_RETRIES: i32 = 5;

/// Relay tick period in milliseconds.
pub const OUTBOX_POLL_INTERVAL_MS: u64 = 5_000;

/// A stored enum column held a value this build does not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {field} value: {value}")]
pub struct UnknownVariant {
    pub field: &'static str,
    pub value: String,
}

// ── Orders ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Paid,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
        }
    }

    /// PENDING → PAID is the only transition; PAID is terminal.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!((self, next), (Self::Pending, Self::Paid))
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            other => Err(UnknownVariant {
                field: "order status",
                value: other.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Uuid,
    /// Minor currency units (e.g. cents).
    pub amount: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a successful payment: the updated order and the ORDER_PAID row
/// written with it.
#[derive(Debug, Clone)]
pub struct PayOrderResult {
    pub order: Order,
    pub event: OutboxEvent,
}

// ── Outbox ───────────────────────────────────────────────────────────────────

/// Closed set of event kinds carried by the outbox and the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    OrderCreated,
    OrderPaid,
}

impl EventKind {
    pub const ALL: [EventKind; 2] = [EventKind::OrderCreated, EventKind::OrderPaid];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OrderCreated => "ORDER_CREATED",
            Self::OrderPaid => "ORDER_PAID",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                field: "event kind",
                value: s.to_owned(),
            })
    }
}

/// Input for appending an outbox row. Id, `occurred_at` and bookkeeping
/// columns are assigned by the store.
#[derive(Debug, Clone, Copy)]
pub struct NewOutboxEvent {
    pub kind: EventKind,
    pub order_id: Uuid,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub kind: EventKind,
    pub order_id: Uuid,
    pub amount: i64,
    pub occurred_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub failure_count: i32,
    pub last_error: Option<String>,
}

/// Where an outbox row sits in the relay lifecycle. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    /// Unpublished with retry budget left; picked up by the next tick.
    Pending,
    /// Handed to the broker. Terminal.
    Published,
    /// Retry budget exhausted. Terminal; kept for inspection.
    Abandoned,
}

impl OutboxEvent {
    pub fn delivery_state(&self, max_retries: i32) -> DeliveryState {
        if self.published_at.is_some() {
            DeliveryState::Published
        } else if self.failure_count >= max_retries {
            DeliveryState::Abandoned
        } else {
            DeliveryState::Pending
        }
    }
}

/// Message shape handed to the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerEvent {
    pub event_id: Uuid,
    pub event_kind: EventKind,
    pub order_id: Uuid,
    pub amount: i64,
    pub occurred_at: DateTime<Utc>,
}

impl From<&OutboxEvent> for BrokerEvent {
    fn from(event: &OutboxEvent) -> Self {
        Self {
            event_id: event.id,
            event_kind: event.kind,
            order_id: event.order_id,
            amount: event.amount,
            occurred_at: event.occurred_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutboxStats {
    /// `published_at IS NULL`, abandoned rows included.
    pub unpublished_count: u64,
    pub abandoned_count: u64,
    pub order_created_count: u64,
    pub order_paid_count: u64,
}

// ── Consumer side ────────────────────────────────────────────────────────────

/// Ledger entry proving the side effect for `event_id` was applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedEvent {
    pub event_id: Uuid,
    pub kind: EventKind,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount: i64,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceStats {
    pub total_invoices: u64,
    pub total_processed_events: u64,
}
