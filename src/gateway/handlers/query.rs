//! Read endpoints: balance, transaction history, detail, stats

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::gateway::state::AppState;
use crate::gateway::types::{ApiError, ApiResponse, ApiResult, ok};
use crate::ledger::repository;
use crate::ledger::{TransactionRecord, TransactionStatus};
use crate::money;

#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceData {
    /// Balance in minor units
    pub balance: i64,
    /// Balance formatted as a decimal string
    pub balance_dollars: String,
}

/// Current balance of the authenticated user
///
/// GET /api/balance
#[utoipa::path(
    get,
    path = "/api/balance",
    responses(
        (status = 200, description = "Current balance", body = BalanceData),
        (status = 401, description = "Unauthenticated")
    ),
    security(("bearer_token" = [])),
    tag = "Balance"
)]
pub async fn get_balance(
    Extension(session): Extension<crate::user_auth::AuthSession>,
) -> Result<Json<BalanceData>, ApiError> {
    Ok(Json(BalanceData {
        balance: session.user.balance,
        balance_dollars: money::format_cents(session.user.balance),
    }))
}

/// One ledger entry as seen by a participant
#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionView {
    pub uuid: Uuid,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub amount: i64,
    pub commission: i64,
    pub total_debited: i64,
    pub status: TransactionStatus,
    /// "sent" or "received", relative to the caller
    pub direction: &'static str,
    pub created_at: DateTime<Utc>,
}

impl TransactionView {
    fn for_user(txn: &TransactionRecord, user_id: i64) -> Self {
        Self {
            uuid: txn.uuid,
            sender_id: txn.sender_id,
            receiver_id: txn.receiver_id,
            amount: txn.amount,
            commission: txn.commission,
            total_debited: txn.total_debited(),
            status: txn.status,
            direction: if txn.sender_id == user_id {
                "sent"
            } else {
                "received"
            },
            created_at: txn.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub direction: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionListData {
    pub transactions: Vec<TransactionView>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Paginated transaction history, newest first
///
/// GET /api/transactions?page&per_page&direction=all|sent|received
#[utoipa::path(
    get,
    path = "/api/transactions",
    params(
        ("page" = Option<u32>, Query, description = "Page number, 1-based"),
        ("per_page" = Option<u32>, Query, description = "Page size, clamped to 100"),
        ("direction" = Option<String>, Query, description = "all | sent | received")
    ),
    responses(
        (status = 200, description = "One page of history", body = ApiResponse<TransactionListData>),
        (status = 401, description = "Unauthenticated")
    ),
    security(("bearer_token" = [])),
    tag = "Transactions"
)]
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<crate::user_auth::AuthSession>,
    Query(params): Query<ListParams>,
) -> ApiResult<TransactionListData> {
    let direction = match params.direction.as_deref() {
        None => Default::default(),
        Some(raw) => raw
            .parse()
            .map_err(|_| ApiError::bad_request("direction must be all, sent or received"))?,
    };

    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(15).clamp(1, 100);

    let (rows, total) = repository::list_for_user(
        state.db.pool(),
        session.user.id,
        direction,
        page,
        per_page,
    )
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Transaction listing failed");
        ApiError::internal("Internal server error")
    })?;

    let transactions = rows
        .iter()
        .map(|txn| TransactionView::for_user(txn, session.user.id))
        .collect();

    ok(TransactionListData {
        transactions,
        page,
        per_page,
        total,
    })
}

/// Fetch one transaction by uuid
///
/// GET /api/transactions/{uuid}
///
/// Responds 404 unless the caller is the sender or the receiver: the
/// existence of other people's transactions is not disclosed.
#[utoipa::path(
    get,
    path = "/api/transactions/{uuid}",
    params(("uuid" = Uuid, Path, description = "Transaction uuid")),
    responses(
        (status = 200, description = "Transaction detail", body = ApiResponse<TransactionView>),
        (status = 404, description = "Not found or not visible to the caller")
    ),
    security(("bearer_token" = [])),
    tag = "Transactions"
)]
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<crate::user_auth::AuthSession>,
    Path(uuid): Path<Uuid>,
) -> ApiResult<TransactionView> {
    let txn = repository::find_by_uuid(state.db.pool(), uuid)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Transaction lookup failed");
            ApiError::internal("Internal server error")
        })?
        .filter(|txn| txn.sender_id == session.user.id || txn.receiver_id == session.user.id)
        .ok_or_else(|| ApiError::not_found("Transaction not found"))?;

    ok(TransactionView::for_user(&txn, session.user.id))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatsData {
    /// Total debited over sent transfers (amount + commission)
    pub total_sent: i64,
    pub total_received: i64,
    pub total_commission: i64,
    pub total_transactions: i64,
    pub net_balance_change: i64,
    pub sent_count: i64,
    pub received_count: i64,
}

/// Aggregate transfer statistics for the authenticated user
///
/// GET /api/transactions/stats
#[utoipa::path(
    get,
    path = "/api/transactions/stats",
    responses(
        (status = 200, description = "Aggregate stats", body = ApiResponse<StatsData>),
        (status = 401, description = "Unauthenticated")
    ),
    security(("bearer_token" = [])),
    tag = "Transactions"
)]
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<crate::user_auth::AuthSession>,
) -> ApiResult<StatsData> {
    let stats = repository::stats_for(state.db.pool(), session.user.id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Stats aggregation failed");
            ApiError::internal("Internal server error")
        })?;

    ok(StatsData {
        total_sent: stats.sent_total_with_commission,
        total_received: stats.received_total,
        total_commission: stats.commission_paid,
        total_transactions: stats.total_transactions(),
        net_balance_change: stats.net_balance_change(),
        sent_count: stats.sent_count,
        received_count: stats.received_count,
    })
}
