//! Schema bootstrap for the PostgreSQL store
//!
//! Idempotent: every statement is `IF NOT EXISTS`, so startup can run this
//! unconditionally against a fresh or existing database.

use anyhow::Result;
use sqlx::PgPool;

/// Initialize the payrail schema
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    tracing::info!("Initializing PostgreSQL schema...");

    for (name, stmt) in [
        ("users", CREATE_USERS_TABLE),
        ("users email index", CREATE_USERS_EMAIL_INDEX),
        ("auth_tokens", CREATE_AUTH_TOKENS_TABLE),
        ("auth_tokens user index", CREATE_AUTH_TOKENS_USER_INDEX),
        ("transactions", CREATE_TRANSACTIONS_TABLE),
        ("idempotency index", CREATE_IDEMPOTENCY_INDEX),
        ("sender index", CREATE_SENDER_INDEX),
        ("receiver index", CREATE_RECEIVER_INDEX),
        ("balance_snapshots", CREATE_SNAPSHOTS_TABLE),
        ("snapshot txn index", CREATE_SNAPSHOT_TXN_INDEX),
        ("transaction_outbox", CREATE_OUTBOX_TABLE),
        ("outbox status index", CREATE_OUTBOX_STATUS_INDEX),
    ] {
        sqlx::query(stmt)
            .execute(pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {}", name, e))?;
    }

    tracing::info!("PostgreSQL schema initialized successfully");
    Ok(())
}

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id              BIGSERIAL PRIMARY KEY,
    name            TEXT NOT NULL,
    email           TEXT NOT NULL,
    password_hash   TEXT NOT NULL,
    balance         BIGINT NOT NULL DEFAULT 0 CHECK (balance >= 0),
    initial_balance BIGINT NOT NULL DEFAULT 0 CHECK (initial_balance >= 0),
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_USERS_EMAIL_INDEX: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS users_email_key ON users (email)
"#;

const CREATE_AUTH_TOKENS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS auth_tokens (
    token      TEXT PRIMARY KEY,
    user_id    BIGINT NOT NULL REFERENCES users (id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    revoked_at TIMESTAMPTZ
)
"#;

const CREATE_AUTH_TOKENS_USER_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS auth_tokens_user_idx ON auth_tokens (user_id)
"#;

const CREATE_TRANSACTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS transactions (
    uuid            UUID PRIMARY KEY,
    sender_id       BIGINT NOT NULL REFERENCES users (id),
    receiver_id     BIGINT NOT NULL REFERENCES users (id),
    amount          BIGINT NOT NULL CHECK (amount > 0),
    commission      BIGINT NOT NULL CHECK (commission >= 0),
    status          TEXT NOT NULL CHECK (status IN ('completed', 'failed')),
    idempotency_key TEXT NOT NULL,
    metadata        JSONB NOT NULL DEFAULT '{}'::jsonb,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CHECK (sender_id <> receiver_id)
)
"#;

const CREATE_IDEMPOTENCY_INDEX: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS transactions_idempotency_key_key
    ON transactions (idempotency_key)
"#;

const CREATE_SENDER_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS transactions_sender_created_idx
    ON transactions (sender_id, created_at)
"#;

const CREATE_RECEIVER_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS transactions_receiver_created_idx
    ON transactions (receiver_id, created_at)
"#;

const CREATE_SNAPSHOTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS balance_snapshots (
    id               BIGSERIAL PRIMARY KEY,
    user_id          BIGINT NOT NULL REFERENCES users (id),
    balance          BIGINT NOT NULL CHECK (balance >= 0),
    transaction_uuid UUID NOT NULL REFERENCES transactions (uuid),
    created_at       TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_SNAPSHOT_TXN_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS balance_snapshots_txn_idx
    ON balance_snapshots (transaction_uuid)
"#;

const CREATE_OUTBOX_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS transaction_outbox (
    id                BIGSERIAL PRIMARY KEY,
    transaction_uuid  UUID NOT NULL REFERENCES transactions (uuid),
    event_type        TEXT NOT NULL,
    payload           JSONB NOT NULL,
    status            TEXT NOT NULL DEFAULT 'pending'
                      CHECK (status IN ('pending', 'processing', 'delivered', 'failed')),
    attempts          INT NOT NULL DEFAULT 0,
    last_attempted_at TIMESTAMPTZ,
    delivered_at      TIMESTAMPTZ,
    error             TEXT,
    created_at        TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_OUTBOX_STATUS_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS transaction_outbox_status_created_idx
    ON transaction_outbox (status, created_at)
"#;
