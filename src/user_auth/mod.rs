//! Identity: registration, login, opaque bearer tokens, receiver lookup

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod service;

pub use error::AuthError;
pub use middleware::{AuthSession, bearer_auth};
pub use models::{AuthResponse, LoginRequest, RegisterRequest, UserView};
pub use service::AuthService;
