//! Ledger model and the atomic transfer engine
//!
//! The four persisted entities (user, transaction, balance snapshot,
//! outbox entry) and the serializable unit of work that moves money
//! between two users.

pub mod engine;
pub mod error;
pub mod models;
pub mod repository;

pub use engine::{TransferEngine, TransferReceipt};
pub use error::TransferError;
pub use models::{BalanceSnapshot, TransactionRecord, TransactionStatus, User};
