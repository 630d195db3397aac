use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::money;

/// A registered account holder.
///
/// `balance` is mutated only by the transfer engine under a row lock;
/// `initial_balance` is frozen at registration and exists so the
/// conservation invariant can be checked over live data.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub balance: i64,
    pub initial_balance: i64,
    pub created_at: DateTime<Utc>,
}

/// Ledger entry status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
    /// Terminal state for seeded/historical data; the engine never writes it
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl TryFrom<String> for TransactionStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(format!("unknown transaction status: {}", other)),
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable ledger entry. Never updated after insert.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TransactionRecord {
    pub uuid: Uuid,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub amount: i64,
    pub commission: i64,
    #[sqlx(try_from = "String")]
    pub status: TransactionStatus,
    pub idempotency_key: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// What left the sender's balance: `amount + commission`
    pub fn total_debited(&self) -> i64 {
        self.amount + self.commission
    }
}

/// Post-transfer audit record. Exactly two per committed transfer,
/// one for each side, written in the same atomic unit.
#[derive(Debug, Clone, FromRow)]
pub struct BalanceSnapshot {
    pub id: i64,
    pub user_id: i64,
    pub balance: i64,
    pub transaction_uuid: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Which side of the ledger a listing should show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferDirection {
    #[default]
    All,
    Sent,
    Received,
}

impl std::str::FromStr for TransferDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(TransferDirection::All),
            "sent" => Ok(TransferDirection::Sent),
            "received" => Ok(TransferDirection::Received),
            other => Err(format!("unknown direction: {}", other)),
        }
    }
}

/// Aggregate totals for one user, all in minor units
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct TransferStats {
    /// Sum of amount + commission over sent transfers
    pub sent_total_with_commission: i64,
    /// Sum of amount over received transfers
    pub received_total: i64,
    /// Sum of commission over sent transfers
    pub commission_paid: i64,
    pub sent_count: i64,
    pub received_count: i64,
}

impl TransferStats {
    pub fn net_balance_change(&self) -> i64 {
        self.received_total - self.sent_total_with_commission
    }

    pub fn total_transactions(&self) -> i64 {
        self.sent_count + self.received_count
    }
}

impl User {
    /// Balance formatted as a decimal string for wire responses
    pub fn balance_dollars(&self) -> String {
        money::format_cents(self.balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        assert_eq!(
            TransactionStatus::try_from("completed".to_string()).unwrap(),
            TransactionStatus::Completed
        );
        assert_eq!(
            TransactionStatus::try_from("failed".to_string()).unwrap(),
            TransactionStatus::Failed
        );
        assert!(TransactionStatus::try_from("pending".to_string()).is_err());
        assert_eq!(TransactionStatus::Completed.as_str(), "completed");
    }

    #[test]
    fn test_direction_parse() {
        use std::str::FromStr;
        assert_eq!(
            TransferDirection::from_str("sent").unwrap(),
            TransferDirection::Sent
        );
        assert_eq!(
            TransferDirection::from_str("all").unwrap(),
            TransferDirection::All
        );
        assert!(TransferDirection::from_str("inbound").is_err());
    }

    #[test]
    fn test_stats_derived_fields() {
        let stats = TransferStats {
            sent_total_with_commission: 10_150,
            received_total: 5_000,
            commission_paid: 150,
            sent_count: 1,
            received_count: 2,
        };
        assert_eq!(stats.net_balance_change(), -5_150);
        assert_eq!(stats.total_transactions(), 3);
    }
}
