//! HTTP gateway: router, shared state, response envelope
//!
//! The thin edge in front of the transfer engine. Handlers never do money
//! arithmetic.

pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::config::AppConfig;
use crate::user_auth;
use state::AppState;

/// Bind the configured port and serve until shutdown is signalled.
/// In-flight requests are drained before returning.
pub async fn run_server(
    config: &AppConfig,
    state: Arc<AppState>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let public_routes = Router::new()
        .route("/api/auth/register", post(user_auth::handlers::register))
        .route("/api/auth/login", post(user_auth::handlers::login))
        .route("/healthz", get(handlers::health::healthz));

    let private_routes = Router::new()
        .route("/api/auth/logout", post(user_auth::handlers::logout))
        .route("/api/auth/user", get(user_auth::handlers::current_user))
        .route("/api/balance", get(handlers::query::get_balance))
        .route(
            "/api/transactions/validate-receiver",
            post(handlers::transfer::validate_receiver),
        )
        .route(
            "/api/transactions",
            post(handlers::transfer::create_transfer).get(handlers::query::list_transactions),
        )
        .route("/api/transactions/stats", get(handlers::query::get_stats))
        .route(
            "/api/transactions/{uuid}",
            get(handlers::query::get_transaction),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            user_auth::bearer_auth,
        ));

    let app = public_routes.merge(private_routes).with_state(state);

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "HTTP gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await?;

    tracing::info!("HTTP gateway stopped");
    Ok(())
}
