//! Transactional outbox and its delivery worker
//!
//! Outbox entries co-commit with the balance changes that caused them; the
//! worker delivers them to the push sink at least once, with exponential
//! backoff on transient failure.

pub mod models;
pub mod publisher;
pub mod repository;
pub mod worker;

pub use models::{OutboxEntry, OutboxStatus};
pub use publisher::{EventPublisher, HttpPublisher, MockPublisher, PublishError};
pub use worker::{OutboxWorker, WorkerConfig};

/// Event type written by the transfer engine
pub const MONEY_TRANSFERRED: &str = "money.transferred";

/// Event name emitted to the receiver's push channel
pub const MONEY_RECEIVED: &str = "money.received";
