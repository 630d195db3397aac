//! Outbox delivery worker
//!
//! Background consumer that claims pending entries, pushes them to the
//! sink, and manages retries. Several workers can run in parallel: the
//! claim query skips rows another worker has locked.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{Value, json};
use sqlx::PgPool;
use tokio::sync::{Notify, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::MONEY_RECEIVED;
use super::publisher::EventPublisher;
use super::repository;
use crate::ledger::repository as ledger_repository;
use crate::money;

/// Configuration for the outbox worker
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Fallback poll cadence for entries whose wake signal was lost
    pub poll_interval: Duration,
    /// Per-attempt deadline on the push sink call
    pub publish_timeout: Duration,
    /// Attempts before an entry is failed terminally
    pub max_attempts: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            publish_timeout: Duration::from_secs(30),
            max_attempts: 5,
        }
    }
}

/// Retry backoff schedule in seconds, keyed off the attempt count:
/// 10, 20, 40, 80, 160.
pub fn backoff_secs(attempts: u32) -> u64 {
    if attempts == 0 {
        0
    } else {
        10u64 << (attempts - 1).min(16)
    }
}

/// The §6 payload fields the worker needs after validation
#[derive(Debug)]
struct EventFields {
    transaction_uuid: Uuid,
    sender_id: i64,
    receiver_id: i64,
    amount: i64,
    receiver_balance: i64,
}

/// Check the stored payload carries every required field. A malformed
/// payload can never become deliverable, so validation failure is terminal.
fn validate_payload(payload: &Value) -> Result<EventFields, String> {
    fn int_field(payload: &Value, name: &str) -> Result<i64, String> {
        payload
            .get(name)
            .and_then(Value::as_i64)
            .ok_or_else(|| format!("missing or non-integer field: {}", name))
    }

    let transaction_uuid = payload
        .get("transaction_uuid")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| "missing or malformed field: transaction_uuid".to_string())?;

    let sender_id = int_field(payload, "sender_id")?;
    let receiver_id = int_field(payload, "receiver_id")?;
    let amount = int_field(payload, "amount")?;
    int_field(payload, "commission")?;
    int_field(payload, "sender_balance")?;
    let receiver_balance = int_field(payload, "receiver_balance")?;

    Ok(EventFields {
        transaction_uuid,
        sender_id,
        receiver_id,
        amount,
        receiver_balance,
    })
}

pub struct OutboxWorker {
    pool: PgPool,
    publisher: Arc<dyn EventPublisher>,
    notify: Arc<Notify>,
    config: WorkerConfig,
}

impl OutboxWorker {
    pub fn new(
        pool: PgPool,
        publisher: Arc<dyn EventPublisher>,
        notify: Arc<Notify>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            pool,
            publisher,
            notify,
            config,
        }
    }

    /// Run until shutdown is signalled. The in-flight entry is always
    /// finished (committed or rolled back) before exiting.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            max_attempts = self.config.max_attempts,
            "Starting outbox worker"
        );

        loop {
            // Drain everything currently eligible
            loop {
                if *shutdown.borrow() {
                    info!("Outbox worker stopped");
                    return;
                }
                match self.process_next().await {
                    Ok(true) => continue,
                    Ok(false) => break,
                    Err(e) => {
                        error!(error = %e, "Outbox pass failed");
                        break;
                    }
                }
            }

            tokio::select! {
                _ = self.notify.notified() => {
                    debug!("Outbox worker woken by transfer commit");
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Outbox worker stopped");
                        return;
                    }
                }
            }
        }
    }

    /// Claim and handle one entry. Returns Ok(false) when nothing is
    /// eligible.
    pub async fn process_next(&self) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let Some(entry) = repository::claim_next(&mut tx).await? else {
            tx.rollback().await?;
            return Ok(false);
        };
        repository::mark_processing(&mut *tx, entry.id).await?;

        let fields = match validate_payload(&entry.payload) {
            Ok(fields) => fields,
            Err(reason) => {
                warn!(
                    entry_id = entry.id,
                    transaction_uuid = %entry.transaction_uuid,
                    reason,
                    "Outbox payload failed validation, marking failed"
                );
                repository::mark_failed_permanently(&mut *tx, entry.id, &reason).await?;
                tx.commit().await?;
                return Ok(true);
            }
        };

        // Enrich with the sender's display identity
        let Some(sender) = ledger_repository::find_user_by_id(&mut *tx, fields.sender_id).await?
        else {
            warn!(
                entry_id = entry.id,
                sender_id = fields.sender_id,
                "Outbox entry references a missing sender, marking failed"
            );
            repository::mark_failed_permanently(&mut *tx, entry.id, "sender user not found")
                .await?;
            tx.commit().await?;
            return Ok(true);
        };

        let channel = format!("user.{}", fields.receiver_id);
        let push_payload = json!({
            "transaction_uuid": fields.transaction_uuid,
            "amount": fields.amount,
            "new_balance": fields.receiver_balance,
            "sender": {
                "id": sender.id,
                "name": sender.name,
                "email": sender.email,
            },
            "receiver_id": fields.receiver_id,
            "message": format!(
                "You received ${} from {}",
                money::format_cents(fields.amount),
                sender.name
            ),
            "timestamp": Utc::now().to_rfc3339(),
        });

        let outcome = tokio::time::timeout(
            self.config.publish_timeout,
            self.publisher
                .publish(&channel, MONEY_RECEIVED, &push_payload),
        )
        .await;

        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some(format!(
                "publish timed out after {}s",
                self.config.publish_timeout.as_secs()
            )),
        };

        match failure {
            None => {
                repository::mark_delivered(&mut *tx, entry.id).await?;
                tx.commit().await?;
                info!(
                    entry_id = entry.id,
                    transaction_uuid = %entry.transaction_uuid,
                    channel,
                    "Outbox entry delivered"
                );
            }
            Some(message) => {
                let attempts = entry.attempts + 1;
                let terminal = attempts >= self.config.max_attempts as i32;
                repository::record_failure(&mut *tx, entry.id, attempts, &message, terminal)
                    .await?;
                tx.commit().await?;

                if terminal {
                    error!(
                        entry_id = entry.id,
                        transaction_uuid = %entry.transaction_uuid,
                        attempts,
                        error = %message,
                        "Outbox entry failed permanently"
                    );
                } else {
                    warn!(
                        entry_id = entry.id,
                        attempts,
                        next_retry_secs = backoff_secs(attempts as u32),
                        error = %message,
                        "Outbox delivery failed, will retry"
                    );
                }
            }
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule() {
        assert_eq!(backoff_secs(0), 0);
        assert_eq!(backoff_secs(1), 10);
        assert_eq!(backoff_secs(2), 20);
        assert_eq!(backoff_secs(3), 40);
        assert_eq!(backoff_secs(4), 80);
        assert_eq!(backoff_secs(5), 160);
    }

    #[test]
    fn test_validate_payload_complete() {
        let payload = json!({
            "transaction_uuid": "550e8400-e29b-41d4-a716-446655440000",
            "sender_id": 1,
            "receiver_id": 2,
            "amount": 10_000,
            "commission": 150,
            "sender_balance": 89_850,
            "receiver_balance": 60_000,
        });
        let fields = validate_payload(&payload).unwrap();
        assert_eq!(fields.sender_id, 1);
        assert_eq!(fields.receiver_id, 2);
        assert_eq!(fields.amount, 10_000);
        assert_eq!(fields.receiver_balance, 60_000);
    }

    #[test]
    fn test_validate_payload_missing_field() {
        let payload = json!({
            "transaction_uuid": "550e8400-e29b-41d4-a716-446655440000",
            "sender_id": 1,
            "receiver_id": 2,
            "amount": 10_000,
            "commission": 150,
            "sender_balance": 89_850,
        });
        let err = validate_payload(&payload).unwrap_err();
        assert!(err.contains("receiver_balance"));
    }

    #[test]
    fn test_validate_payload_malformed_uuid() {
        let payload = json!({
            "transaction_uuid": "not-a-uuid",
            "sender_id": 1,
            "receiver_id": 2,
            "amount": 10_000,
            "commission": 150,
            "sender_balance": 89_850,
            "receiver_balance": 60_000,
        });
        let err = validate_payload(&payload).unwrap_err();
        assert!(err.contains("transaction_uuid"));
    }

    #[test]
    fn test_worker_config_default() {
        let config = WorkerConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.publish_timeout, Duration::from_secs(30));
        assert_eq!(config.max_attempts, 5);
    }
}
