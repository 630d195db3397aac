use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::ledger::User;

/// User Registration Request
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "Alice Example")]
    pub name: String,
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[schema(example = "password123")]
    pub password: String,
    #[schema(example = "password123")]
    pub password_confirmation: String,
}

/// User Login Request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[schema(example = "password123")]
    pub password: String,
}

/// Wire view of a user (never exposes the password hash)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserView {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// Balance in minor units
    pub balance: i64,
    /// Balance formatted as a decimal string
    pub balance_dollars: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            balance: user.balance,
            balance_dollars: user.balance_dollars(),
        }
    }
}

/// Registration / login response
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub message: String,
    pub user: UserView,
    pub token: String,
}
