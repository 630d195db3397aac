//! Transfer endpoints: receiver validation and transfer creation
//!
//! The edge performs no money arithmetic: it resolves the receiver,
//! supplies or derives the idempotency key, and invokes the engine under
//! the request deadline.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::gateway::state::AppState;
use crate::gateway::types::{ApiError, ApiResponse, ApiResult, created, ok};
use crate::ledger::TransferError;
use crate::money;
use crate::user_auth::{AuthError, AuthSession};

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateReceiverRequest {
    #[schema(example = "bob@example.com")]
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReceiverInfo {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidateReceiverData {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<ReceiverInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Check whether an email addresses a valid transfer receiver
///
/// POST /api/transactions/validate-receiver
///
/// Leaks nothing beyond valid yes/no plus name/email when valid.
#[utoipa::path(
    post,
    path = "/api/transactions/validate-receiver",
    request_body = ValidateReceiverRequest,
    responses(
        (status = 200, description = "Receiver is valid", body = ApiResponse<ValidateReceiverData>),
        (status = 400, description = "Receiver is the caller"),
        (status = 404, description = "No user with that email")
    ),
    security(("bearer_token" = [])),
    tag = "Transactions"
)]
pub async fn validate_receiver(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Json(req): Json<ValidateReceiverRequest>,
) -> ApiResult<ValidateReceiverData> {
    match state.auth.resolve_receiver(&req.email, &session.user).await {
        Ok(receiver) => ok(ValidateReceiverData {
            valid: true,
            user: Some(ReceiverInfo {
                name: receiver.name,
                email: receiver.email,
            }),
            message: None,
        }),
        Err(err @ (AuthError::ReceiverNotFound | AuthError::SelfTransferForbidden)) => {
            let status = match err {
                AuthError::ReceiverNotFound => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_REQUEST,
            };
            let message = err.to_string();
            Ok((
                status,
                Json(ApiResponse::error_with_data(
                    message.clone(),
                    ValidateReceiverData {
                        valid: false,
                        user: None,
                        message: Some(message),
                    },
                )),
            ))
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTransferRequest {
    #[schema(example = "bob@example.com")]
    pub receiver_email: String,
    /// Amount in minor units
    #[schema(example = 10_000)]
    pub amount: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferData {
    pub uuid: Uuid,
    pub amount: i64,
    pub commission: i64,
    pub total_debited: i64,
    /// Sender's post-transfer balance
    pub sender_balance: i64,
    /// Receiver's post-transfer balance
    pub receiver_balance: i64,
    pub created_at: DateTime<Utc>,
}

/// Transfer money to another user by email
///
/// POST /api/transactions
///
/// An `Idempotency-Key` header collapses client retries onto a single
/// ledger row; without one, a key is derived from the request parameters
/// and the current timestamp.
#[utoipa::path(
    post,
    path = "/api/transactions",
    request_body = CreateTransferRequest,
    responses(
        (status = 201, description = "Transfer committed", body = ApiResponse<TransferData>),
        (status = 400, description = "Business rule failure (insufficient balance, self transfer, bad amount)"),
        (status = 404, description = "Receiver not found")
    ),
    security(("bearer_token" = [])),
    tag = "Transactions"
)]
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    headers: HeaderMap,
    Json(req): Json<CreateTransferRequest>,
) -> ApiResult<TransferData> {
    let receiver = state
        .auth
        .resolve_receiver(&req.receiver_email, &session.user)
        .await?;

    let idempotency_key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| {
            money::derive_idempotency_key(
                session.user.id,
                receiver.id,
                req.amount,
                Utc::now().timestamp(),
            )
        });

    let receipt = tokio::time::timeout(
        state.request_timeout,
        state.engine.transfer(
            session.user.id,
            receiver.id,
            req.amount,
            &idempotency_key,
            &json!({}),
        ),
    )
    .await
    .map_err(|_| ApiError::from(TransferError::DeadlineExceeded))??;

    let message = if receipt.replayed {
        "Transfer already processed"
    } else {
        "Transfer completed successfully"
    };

    created(
        message,
        TransferData {
            uuid: receipt.transaction.uuid,
            amount: receipt.transaction.amount,
            commission: receipt.transaction.commission,
            total_debited: receipt.transaction.total_debited(),
            sender_balance: receipt.sender_balance,
            receiver_balance: receipt.receiver_balance,
            created_at: receipt.transaction.created_at,
        },
    )
}
