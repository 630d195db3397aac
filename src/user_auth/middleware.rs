use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::gateway::state::AppState;
use crate::gateway::types::ApiError;
use crate::ledger::User;

/// The authenticated caller, injected into request extensions.
///
/// Carries the presented token so logout can revoke exactly that session
/// and leave the user's other tokens alive.
#[derive(Clone)]
pub struct AuthSession {
    pub user: Arc<User>,
    pub token: String,
}

pub async fn bearer_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        return Err(ApiError::unauthorized("Invalid token format"));
    };
    let token = token.to_string();

    match state.auth.authenticate(&token).await {
        Ok(Some(user)) => {
            request.extensions_mut().insert(AuthSession {
                user: Arc::new(user),
                token,
            });
            Ok(next.run(request).await)
        }
        Ok(None) => Err(ApiError::unauthorized("Invalid or expired token")),
        Err(e) => {
            tracing::error!(error = %e, "Token lookup failed");
            Err(ApiError::internal("Authentication failed"))
        }
    }
}
