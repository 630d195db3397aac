//! Auth endpoints: register, login, logout, current user

use axum::{Extension, Json, extract::State, http::StatusCode};
use std::sync::Arc;

use super::middleware::AuthSession;
use super::models::{AuthResponse, LoginRequest, RegisterRequest, UserView};
use crate::gateway::state::AppState;
use crate::gateway::types::{ApiError, ApiResponse, ApiResult};

/// Register a new user
///
/// POST /api/auth/register
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = AuthResponse),
        (status = 422, description = "Validation failed or email already in use")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let (user, token) = state
        .auth
        .register(&req.name, &req.email, &req.password, &req.password_confirmation)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "Registration successful".to_string(),
            user: UserView::from(&user),
            token,
        }),
    ))
}

/// Login with email and password
///
/// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 422, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let (user, token) = state.auth.login(&req.email, &req.password).await?;

    Ok((
        StatusCode::OK,
        Json(AuthResponse {
            message: "Login successful".to_string(),
            user: UserView::from(&user),
            token,
        }),
    ))
}

/// Revoke the token used to make this call
///
/// POST /api/auth/logout
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out"),
        (status = 401, description = "Unauthenticated")
    ),
    security(("bearer_token" = [])),
    tag = "Auth"
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> ApiResult<()> {
    state.auth.logout(&session.token).await?;
    tracing::info!(user_id = session.user.id, "User logged out");
    Ok((
        StatusCode::OK,
        Json(ApiResponse::success_with_message("Logged out", ())),
    ))
}

/// Current user wrapper body
#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct CurrentUserResponse {
    pub user: UserView,
}

/// Fetch the authenticated user
///
/// GET /api/auth/user
#[utoipa::path(
    get,
    path = "/api/auth/user",
    responses(
        (status = 200, description = "The authenticated user", body = CurrentUserResponse),
        (status = 401, description = "Unauthenticated")
    ),
    security(("bearer_token" = [])),
    tag = "Auth"
)]
pub async fn current_user(
    Extension(session): Extension<AuthSession>,
) -> Result<Json<CurrentUserResponse>, ApiError> {
    Ok(Json(CurrentUserResponse {
        user: UserView::from(session.user.as_ref()),
    }))
}
