//! Liveness / readiness endpoint

use std::sync::Arc;

use axum::extract::State;
use serde::Serialize;
use utoipa::ToSchema;

use crate::gateway::state::AppState;
use crate::gateway::types::{ApiError, ApiResponse, ApiResult, ok};

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthData {
    pub database: &'static str,
    pub version: &'static str,
    pub git: &'static str,
}

/// Service health
///
/// GET /healthz
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Service is healthy", body = ApiResponse<HealthData>),
        (status = 503, description = "Store unreachable")
    ),
    tag = "Health"
)]
pub async fn healthz(State(state): State<Arc<AppState>>) -> ApiResult<HealthData> {
    state
        .db
        .health_check()
        .await
        .map_err(|e| ApiError::service_unavailable(format!("database unreachable: {}", e)))?;

    ok(HealthData {
        database: "up",
        version: env!("CARGO_PKG_VERSION"),
        git: env!("GIT_HASH"),
    })
}
