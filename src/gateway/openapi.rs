//! OpenAPI document for the HTTP surface

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::handlers;
use crate::user_auth;

#[derive(OpenApi)]
#[openapi(
    paths(
        user_auth::handlers::register,
        user_auth::handlers::login,
        user_auth::handlers::logout,
        user_auth::handlers::current_user,
        handlers::transfer::validate_receiver,
        handlers::transfer::create_transfer,
        handlers::query::get_balance,
        handlers::query::list_transactions,
        handlers::query::get_transaction,
        handlers::query::get_stats,
        handlers::health::healthz,
    ),
    components(schemas(
        user_auth::models::RegisterRequest,
        user_auth::models::LoginRequest,
        user_auth::models::AuthResponse,
        user_auth::models::UserView,
        user_auth::handlers::CurrentUserResponse,
        handlers::transfer::ValidateReceiverRequest,
        handlers::transfer::ValidateReceiverData,
        handlers::transfer::ReceiverInfo,
        handlers::transfer::CreateTransferRequest,
        handlers::transfer::TransferData,
        handlers::query::BalanceData,
        handlers::query::TransactionView,
        handlers::query::TransactionListData,
        handlers::query::StatsData,
        handlers::health::HealthData,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and sessions"),
        (name = "Transactions", description = "Transfers and transfer history"),
        (name = "Balance", description = "Balance queries"),
        (name = "Health", description = "Service health"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_token",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_builds() {
        let doc = ApiDoc::openapi();
        let json = doc.to_json().unwrap();
        assert!(json.contains("/api/transactions"));
        assert!(json.contains("bearer_token"));
    }
}
