//! payrail - Peer-to-Peer Money Transfer Service
//!
//! Users hold balances in integer minor units and transfer money to one
//! another by email. Every transfer is one serializable unit of work:
//! balance mutation, ledger entry, audit snapshots and an outbox event
//! commit together; a background worker delivers the event to the push
//! sink with retries.
//!
//! # Modules
//!
//! - [`config`] - YAML configuration with env overrides
//! - [`db`] - PostgreSQL pool, schema bootstrap, error classification
//! - [`money`] - Commission math and idempotency-key derivation
//! - [`ledger`] - Data model and the atomic transfer engine
//! - [`outbox`] - Transactional outbox and its delivery worker
//! - [`user_auth`] - Registration, login, opaque bearer tokens
//! - [`gateway`] - The HTTP edge

pub mod config;
pub mod db;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod money;
pub mod outbox;
pub mod user_auth;

// Convenient re-exports at crate root
pub use config::AppConfig;
pub use db::Database;
pub use ledger::{TransferEngine, TransferError};
pub use outbox::{EventPublisher, OutboxWorker};
pub use user_auth::AuthService;
