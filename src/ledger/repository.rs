//! Ledger persistence operations
//!
//! All functions use runtime-bound queries. Operations that are part of the
//! transfer engine's atomic unit take the open transaction; read paths take
//! any executor or the pool.

use std::collections::HashMap;

use serde_json::Value;
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::models::{TransactionRecord, TransferDirection, TransferStats, User};

const USER_COLUMNS: &str = "id, name, email, password_hash, balance, initial_balance, created_at";

const TXN_COLUMNS: &str =
    "uuid, sender_id, receiver_id, amount, commission, status, idempotency_key, metadata, created_at";

pub async fn find_user_by_id(
    ex: impl PgExecutor<'_>,
    id: i64,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(ex)
        .await
}

pub async fn find_user_by_email(
    ex: impl PgExecutor<'_>,
    email: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(ex)
    .await
}

/// Load and exclusively lock user rows, indexed by id. Callers must pass
/// ids sorted ascending, and the `ORDER BY id` keeps lock acquisition in
/// that order: every transfer touching the same pair then takes its locks
/// in the same sequence, which is what rules out the pairwise ABBA
/// deadlock.
pub async fn lock_users(
    tx: &mut Transaction<'_, Postgres>,
    ids: &[i64],
) -> Result<HashMap<i64, User>, sqlx::Error> {
    debug_assert!(ids.windows(2).all(|w| w[0] <= w[1]));

    let rows = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1) ORDER BY id FOR UPDATE"
    ))
    .bind(ids)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows.into_iter().map(|user| (user.id, user)).collect())
}

/// Persist a balance computed under the row lock
pub async fn update_user_balance(
    ex: impl PgExecutor<'_>,
    user_id: i64,
    balance: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET balance = $1 WHERE id = $2")
        .bind(balance)
        .bind(user_id)
        .execute(ex)
        .await?;
    Ok(())
}

/// Locked idempotency lookup. Run inside the engine's transaction: the row
/// lock collapses the race between two concurrent retries carrying the
/// same key.
pub async fn find_by_idempotency_key(
    ex: impl PgExecutor<'_>,
    key: &str,
) -> Result<Option<TransactionRecord>, sqlx::Error> {
    sqlx::query_as::<_, TransactionRecord>(&format!(
        "SELECT {TXN_COLUMNS} FROM transactions WHERE idempotency_key = $1 FOR UPDATE"
    ))
    .bind(key)
    .fetch_optional(ex)
    .await
}

pub async fn find_by_uuid(
    ex: impl PgExecutor<'_>,
    uuid: Uuid,
) -> Result<Option<TransactionRecord>, sqlx::Error> {
    sqlx::query_as::<_, TransactionRecord>(&format!(
        "SELECT {TXN_COLUMNS} FROM transactions WHERE uuid = $1"
    ))
    .bind(uuid)
    .fetch_optional(ex)
    .await
}

/// New ledger entry; `status` is always written as `completed`
pub struct NewTransaction<'a> {
    pub uuid: Uuid,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub amount: i64,
    pub commission: i64,
    pub idempotency_key: &'a str,
    pub metadata: &'a Value,
}

pub async fn insert_transaction(
    ex: impl PgExecutor<'_>,
    new: NewTransaction<'_>,
) -> Result<TransactionRecord, sqlx::Error> {
    sqlx::query_as::<_, TransactionRecord>(&format!(
        r#"
        INSERT INTO transactions
            (uuid, sender_id, receiver_id, amount, commission, status, idempotency_key, metadata)
        VALUES
            ($1, $2, $3, $4, $5, 'completed', $6, $7)
        RETURNING {TXN_COLUMNS}
        "#
    ))
    .bind(new.uuid)
    .bind(new.sender_id)
    .bind(new.receiver_id)
    .bind(new.amount)
    .bind(new.commission)
    .bind(new.idempotency_key)
    .bind(new.metadata)
    .fetch_one(ex)
    .await
}

pub async fn insert_snapshot(
    ex: impl PgExecutor<'_>,
    user_id: i64,
    balance: i64,
    transaction_uuid: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO balance_snapshots (user_id, balance, transaction_uuid) VALUES ($1, $2, $3)",
    )
    .bind(user_id)
    .bind(balance)
    .bind(transaction_uuid)
    .execute(ex)
    .await?;
    Ok(())
}

/// Post-transfer balances of (sender, receiver), read back from the audit
/// snapshots. Used when an idempotent replay must return the original
/// result.
pub async fn snapshot_balances_for(
    ex: impl PgExecutor<'_>,
    txn: &TransactionRecord,
) -> Result<(i64, i64), sqlx::Error> {
    let rows = sqlx::query_as::<_, (i64, i64)>(
        "SELECT user_id, balance FROM balance_snapshots WHERE transaction_uuid = $1",
    )
    .bind(txn.uuid)
    .fetch_all(ex)
    .await?;

    let mut sender_balance = 0;
    let mut receiver_balance = 0;
    for (user_id, balance) in rows {
        if user_id == txn.sender_id {
            sender_balance = balance;
        } else if user_id == txn.receiver_id {
            receiver_balance = balance;
        }
    }
    Ok((sender_balance, receiver_balance))
}

/// One page of a user's history, newest first, plus the total row count.
/// `per_page` is clamped to 100.
pub async fn list_for_user(
    pool: &PgPool,
    user_id: i64,
    direction: TransferDirection,
    page: u32,
    per_page: u32,
) -> Result<(Vec<TransactionRecord>, i64), sqlx::Error> {
    let filter = match direction {
        TransferDirection::All => "(sender_id = $1 OR receiver_id = $1)",
        TransferDirection::Sent => "sender_id = $1",
        TransferDirection::Received => "receiver_id = $1",
    };

    let page = page.max(1);
    let per_page = per_page.clamp(1, 100);
    let offset = (page as i64 - 1) * per_page as i64;

    let rows = sqlx::query_as::<_, TransactionRecord>(&format!(
        "SELECT {TXN_COLUMNS} FROM transactions WHERE {filter} \
         ORDER BY created_at DESC LIMIT $2 OFFSET $3"
    ))
    .bind(user_id)
    .bind(per_page as i64)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 =
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM transactions WHERE {filter}"))
            .bind(user_id)
            .fetch_one(pool)
            .await?;

    Ok((rows, total))
}

/// Aggregate totals for a user via four independent aggregate queries.
/// Each one is an index-range scan over (sender_id, created_at) or
/// (receiver_id, created_at).
pub async fn stats_for(pool: &PgPool, user_id: i64) -> Result<TransferStats, sqlx::Error> {
    let sent_total_with_commission: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount + commission), 0)::BIGINT FROM transactions \
         WHERE sender_id = $1 AND status = 'completed'",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    let received_total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0)::BIGINT FROM transactions \
         WHERE receiver_id = $1 AND status = 'completed'",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    let commission_paid: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(commission), 0)::BIGINT FROM transactions \
         WHERE sender_id = $1 AND status = 'completed'",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    let (sent_count, received_count): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*) FILTER (WHERE sender_id = $1), \
                COUNT(*) FILTER (WHERE receiver_id = $1) \
         FROM transactions \
         WHERE (sender_id = $1 OR receiver_id = $1) AND status = 'completed'",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(TransferStats {
        sent_total_with_commission,
        received_total,
        commission_paid,
        sent_count,
        received_count,
    })
}
