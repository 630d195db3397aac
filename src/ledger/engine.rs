//! The atomic transfer operation
//!
//! One serializable unit of work: locked idempotency lookup, ordered user
//! locks, balance math, ledger entry, two audit snapshots, one outbox
//! entry. Deadlock-class failures are retried with linear backoff.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use sqlx::PgPool;
use tokio::sync::Notify;
use uuid::Uuid;

use super::error::TransferError;
use super::models::TransactionRecord;
use super::repository::{self, NewTransaction};
use crate::{db, money, outbox};

/// Deadlock retry budget
const MAX_ATTEMPTS: u32 = 3;

/// Linear backoff base: attempt n sleeps n * 100ms
const RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// Result of a committed (or replayed) transfer
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    pub transaction: TransactionRecord,
    /// Sender's post-transfer balance
    pub sender_balance: i64,
    /// Receiver's post-transfer balance
    pub receiver_balance: i64,
    /// True when an existing ledger row was returned for the same key
    pub replayed: bool,
}

pub struct TransferEngine {
    pool: PgPool,
    outbox_notify: Arc<Notify>,
}

impl TransferEngine {
    pub fn new(pool: PgPool, outbox_notify: Arc<Notify>) -> Self {
        Self {
            pool,
            outbox_notify,
        }
    }

    /// Move `amount` minor units from sender to receiver.
    ///
    /// Idempotent on `idempotency_key`: a repeated call returns the
    /// original ledger row with no further balance movement.
    pub async fn transfer(
        &self,
        sender_id: i64,
        receiver_id: i64,
        amount: i64,
        idempotency_key: &str,
        metadata: &Value,
    ) -> Result<TransferReceipt, TransferError> {
        if sender_id == receiver_id {
            return Err(TransferError::SelfTransferForbidden);
        }
        if amount <= 0 {
            return Err(TransferError::InvalidAmount);
        }
        if idempotency_key.is_empty() {
            return Err(TransferError::InvalidIdempotencyKey);
        }

        let mut attempt = 1u32;
        loop {
            match self
                .try_transfer(sender_id, receiver_id, amount, idempotency_key, metadata)
                .await
            {
                Ok(receipt) => {
                    if receipt.replayed {
                        tracing::info!(
                            uuid = %receipt.transaction.uuid,
                            idempotency_key,
                            "Idempotent replay, returning committed transaction"
                        );
                    } else {
                        tracing::info!(
                            uuid = %receipt.transaction.uuid,
                            sender_id,
                            receiver_id,
                            amount,
                            commission = receipt.transaction.commission,
                            "Transfer committed"
                        );
                        // Wake the outbox worker. Losing this signal is
                        // harmless: the worker's poll tick picks the entry up.
                        self.outbox_notify.notify_one();
                    }
                    return Ok(receipt);
                }
                Err(e) if e.is_retryable() && attempt < MAX_ATTEMPTS => {
                    tracing::warn!(
                        attempt,
                        sender_id,
                        receiver_id,
                        error = %e,
                        "Transfer attempt hit lock contention, retrying"
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                    attempt += 1;
                }
                Err(e) if e.is_retryable() => {
                    tracing::error!(
                        sender_id,
                        receiver_id,
                        error = %e,
                        "Transfer gave up after exhausting the retry budget"
                    );
                    return Err(TransferError::TransientLockContention);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One attempt, one transaction
    async fn try_transfer(
        &self,
        sender_id: i64,
        receiver_id: i64,
        amount: i64,
        idempotency_key: &str,
        metadata: &Value,
    ) -> Result<TransferReceipt, TransferError> {
        let mut tx = self.pool.begin().await?;

        // Locked idempotency lookup: a committed attempt with this key wins
        if let Some(existing) = repository::find_by_idempotency_key(&mut *tx, idempotency_key).await?
        {
            let (sender_balance, receiver_balance) =
                repository::snapshot_balances_for(&mut *tx, &existing).await?;
            tx.commit().await?;
            return Ok(TransferReceipt {
                transaction: existing,
                sender_balance,
                receiver_balance,
                replayed: true,
            });
        }

        // Canonical lock order: ascending ids, so A->B and B->A serialize
        // instead of deadlocking
        let mut lock_order = [sender_id, receiver_id];
        lock_order.sort_unstable();
        let mut users = repository::lock_users(&mut tx, &lock_order).await?;

        let Some(sender) = users.remove(&sender_id) else {
            let _ = tx.rollback().await;
            return Err(TransferError::UserNotFound(sender_id));
        };
        let Some(receiver) = users.remove(&receiver_id) else {
            let _ = tx.rollback().await;
            return Err(TransferError::UserNotFound(receiver_id));
        };

        let commission = money::commission(amount);
        let debit = amount + commission;

        if sender.balance < debit {
            let _ = tx.rollback().await;
            return Err(TransferError::InsufficientBalance {
                required: debit,
                available: sender.balance,
            });
        }

        // Rows are locked: no lost-update window between read and write
        let sender_balance = sender.balance - debit;
        let receiver_balance = receiver.balance + amount;
        repository::update_user_balance(&mut *tx, sender_id, sender_balance).await?;
        repository::update_user_balance(&mut *tx, receiver_id, receiver_balance).await?;

        let transaction = repository::insert_transaction(
            &mut *tx,
            NewTransaction {
                uuid: Uuid::new_v4(),
                sender_id,
                receiver_id,
                amount,
                commission,
                idempotency_key,
                metadata,
            },
        )
        .await
        .map_err(|e| {
            // A concurrent attempt with the same key raced us past the
            // locked lookup on another connection. Retry: the next pass
            // finds the committed row.
            if db::is_unique_violation(&e) {
                TransferError::IdempotencyRace
            } else {
                e.into()
            }
        })?;

        repository::insert_snapshot(&mut *tx, sender_id, sender_balance, transaction.uuid).await?;
        repository::insert_snapshot(&mut *tx, receiver_id, receiver_balance, transaction.uuid)
            .await?;

        outbox::repository::insert_pending(
            &mut *tx,
            transaction.uuid,
            outbox::MONEY_TRANSFERRED,
            &json!({
                "transaction_uuid": transaction.uuid,
                "sender_id": sender_id,
                "receiver_id": receiver_id,
                "amount": amount,
                "commission": commission,
                "sender_balance": sender_balance,
                "receiver_balance": receiver_balance,
            }),
        )
        .await?;

        tx.commit().await?;

        Ok(TransferReceipt {
            transaction,
            sender_balance,
            receiver_balance,
            replayed: false,
        })
    }
}
