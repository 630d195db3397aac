//! API response envelope and error type
//!
//! Transaction endpoints wrap their payload in `{status, message?, data?}`;
//! auth endpoints return their own flat bodies.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

use crate::ledger::TransferError;
use crate::user_auth::AuthError;

/// Standard response wrapper for transaction endpoints
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// "success" or "error"
    #[schema(example = "success")]
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: None,
            data: Some(data),
        }
    }

    pub fn success_with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: Some(message.into()),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            status: "error".to_string(),
            message: Some(message.into()),
            data: None,
        }
    }

    /// Error envelope that still carries a data body
    /// (e.g. `{valid: false}` from receiver validation)
    pub fn error_with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

/// Handler return type: success tuple or an ApiError that renders itself
pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

/// 200 OK success helper
#[inline]
pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::success(data))))
}

/// 201 CREATED success helper
#[inline]
pub fn created<T: Serialize>(message: impl Into<String>, data: T) -> ApiResult<T> {
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(message, data)),
    ))
}

/// Unified API error with automatic IntoResponse
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, msg)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = Json(ApiResponse::<()>::error(self.message));
        (self.status, body).into_response()
    }
}

fn status_from_u16(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let status = status_from_u16(err.http_status());
        if status.is_server_error() {
            tracing::error!(error = %err, "Identity operation failed");
            ApiError::new(status, "Internal server error")
        } else {
            ApiError::new(status, err.to_string())
        }
    }
}

impl From<TransferError> for ApiError {
    fn from(err: TransferError) -> Self {
        let status = status_from_u16(err.http_status());
        if status.is_server_error() {
            tracing::error!(error = %err, code = err.code(), "Transfer failed");
        }
        match err {
            TransferError::Database(_) => ApiError::new(status, "Internal server error"),
            other => ApiError::new(status, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_shape() {
        let resp = ApiResponse::success_with_message("done", 42);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["message"], "done");
        assert_eq!(json["data"], 42);
    }

    #[test]
    fn test_error_envelope_omits_data() {
        let resp = ApiResponse::<()>::error("nope");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "error");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_transfer_error_mapping() {
        let err = ApiError::from(TransferError::InvalidAmount);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = ApiError::from(TransferError::UserNotFound(9));
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        // Internal detail must not leak to the client
        let err = ApiError::from(TransferError::Database("connection refused".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("connection"));
    }

    #[test]
    fn test_auth_error_mapping() {
        let err = ApiError::from(AuthError::InvalidCredentials);
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);

        let err = ApiError::from(AuthError::SelfTransferForbidden);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = ApiError::from(AuthError::ReceiverNotFound);
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
