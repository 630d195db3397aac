//! Outbox persistence operations

use serde_json::Value;
use sqlx::{PgExecutor, Postgres, Transaction};
use uuid::Uuid;

use super::models::OutboxEntry;

const OUTBOX_COLUMNS: &str = "id, transaction_uuid, event_type, payload, status, attempts, \
                              last_attempted_at, delivered_at, error, created_at";

/// Insert a pending entry. Called by the transfer engine inside its own
/// transaction so the event co-commits with the balance changes.
pub async fn insert_pending(
    ex: impl PgExecutor<'_>,
    transaction_uuid: Uuid,
    event_type: &str,
    payload: &Value,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO transaction_outbox (transaction_uuid, event_type, payload, status) \
         VALUES ($1, $2, $3, 'pending')",
    )
    .bind(transaction_uuid)
    .bind(event_type)
    .bind(payload)
    .execute(ex)
    .await?;
    Ok(())
}

/// Claim the oldest pending entry whose backoff window has elapsed.
///
/// `SKIP LOCKED` lets parallel workers pass over an entry another worker
/// holds instead of blocking on its row lock. The eligibility predicate
/// mirrors the worker's backoff schedule: entry n is due
/// `10 * 2^(attempts-1)` seconds after its last attempt.
pub async fn claim_next(
    tx: &mut Transaction<'_, Postgres>,
) -> Result<Option<OutboxEntry>, sqlx::Error> {
    sqlx::query_as::<_, OutboxEntry>(&format!(
        r#"
        SELECT {OUTBOX_COLUMNS}
        FROM transaction_outbox
        WHERE status = 'pending'
          AND (attempts = 0
               OR last_attempted_at
                  + make_interval(secs => (10 * power(2, attempts - 1))::double precision)
                  <= NOW())
        ORDER BY created_at ASC
        LIMIT 1
        FOR UPDATE SKIP LOCKED
        "#
    ))
    .fetch_optional(&mut **tx)
    .await
}

pub async fn mark_processing(ex: impl PgExecutor<'_>, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE transaction_outbox SET status = 'processing' WHERE id = $1")
        .bind(id)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn mark_delivered(ex: impl PgExecutor<'_>, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE transaction_outbox \
         SET status = 'delivered', delivered_at = NOW(), last_attempted_at = NOW(), error = NULL \
         WHERE id = $1",
    )
    .bind(id)
    .execute(ex)
    .await?;
    Ok(())
}

/// Record a transient delivery failure. Returns the entry to `pending`
/// while attempts remain; `failed` is terminal.
pub async fn record_failure(
    ex: impl PgExecutor<'_>,
    id: i64,
    attempts: i32,
    error: &str,
    terminal: bool,
) -> Result<(), sqlx::Error> {
    let status = if terminal { "failed" } else { "pending" };
    sqlx::query(
        "UPDATE transaction_outbox \
         SET status = $1, attempts = $2, last_attempted_at = NOW(), error = $3 \
         WHERE id = $4",
    )
    .bind(status)
    .bind(attempts)
    .bind(error)
    .bind(id)
    .execute(ex)
    .await?;
    Ok(())
}

/// Terminal failure for entries that can never be delivered
/// (malformed payload, missing sender). Not retryable.
pub async fn mark_failed_permanently(
    ex: impl PgExecutor<'_>,
    id: i64,
    error: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE transaction_outbox \
         SET status = 'failed', last_attempted_at = NOW(), error = $1 \
         WHERE id = $2",
    )
    .bind(error)
    .bind(id)
    .execute(ex)
    .await?;
    Ok(())
}
