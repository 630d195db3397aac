use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use super::error::AuthError;
use crate::db;
use crate::ledger::{User, repository};

const USER_COLUMNS: &str = "id, name, email, password_hash, balance, initial_balance, created_at";

pub struct AuthService {
    db: PgPool,
}

impl AuthService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Register a new user and issue a fresh bearer token.
    ///
    /// New accounts start with `balance = initial_balance = 0`.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        password_confirmation: &str,
    ) -> Result<(User, String), AuthError> {
        validate_registration(name, email, password, password_confirmation)?;

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Internal(format!("Hashing failed: {}", e)))?
            .to_string();

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, balance, initial_balance)
            VALUES ($1, $2, $3, 0, 0)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(email)
        .bind(&password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            if db::is_unique_violation(&e) {
                AuthError::EmailInUse
            } else {
                AuthError::from(e)
            }
        })?;

        let token = self.issue_token(user.id).await?;
        tracing::info!(user_id = user.id, "User registered");
        Ok((user, token))
    }

    /// Verify credentials and issue a fresh token.
    ///
    /// Unknown email and wrong password produce the same error: the
    /// response must not reveal which accounts exist.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, String), AuthError> {
        let Some(user) = repository::find_user_by_email(&self.db, email).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|e| AuthError::Internal(format!("Invalid hash format: {}", e)))?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| AuthError::InvalidCredentials)?;

        let token = self.issue_token(user.id).await?;
        tracing::info!(user_id = user.id, "User logged in");
        Ok((user, token))
    }

    /// Issue a fresh opaque bearer token bound to the user
    pub async fn issue_token(&self, user_id: i64) -> Result<String, AuthError> {
        let bytes: [u8; 32] = rand::random();
        let token = hex::encode(bytes);

        sqlx::query("INSERT INTO auth_tokens (token, user_id) VALUES ($1, $2)")
            .bind(&token)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(token)
    }

    /// Resolve a live, non-revoked token to its owning user
    pub async fn authenticate(&self, token: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {}
            FROM users u
            JOIN auth_tokens t ON t.user_id = u.id
            WHERE t.token = $1 AND t.revoked_at IS NULL
            "#,
            user_columns_qualified()
        ))
        .bind(token)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    /// Revoke exactly the presented token. Other sessions survive.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        sqlx::query(
            "UPDATE auth_tokens SET revoked_at = NOW() WHERE token = $1 AND revoked_at IS NULL",
        )
        .bind(token)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    /// Find the transfer receiver by email. Case-exact match, no
    /// normalization.
    pub async fn resolve_receiver(&self, email: &str, caller: &User) -> Result<User, AuthError> {
        if email == caller.email {
            return Err(AuthError::SelfTransferForbidden);
        }
        repository::find_user_by_email(&self.db, email)
            .await?
            .ok_or(AuthError::ReceiverNotFound)
    }
}

fn user_columns_qualified() -> String {
    USER_COLUMNS
        .split(", ")
        .map(|c| format!("u.{}", c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn validate_registration(
    name: &str,
    email: &str,
    password: &str,
    password_confirmation: &str,
) -> Result<(), AuthError> {
    if name.chars().count() < 2 {
        return Err(AuthError::Validation(
            "Name must be at least 2 characters".to_string(),
        ));
    }
    if !is_plausible_email(email) {
        return Err(AuthError::Validation(
            "Email address is not valid".to_string(),
        ));
    }
    if password.chars().count() < 8 {
        return Err(AuthError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    if password != password_confirmation {
        return Err(AuthError::Validation(
            "Password confirmation does not match".to_string(),
        ));
    }
    Ok(())
}

/// Liberal shape check: something, an @, something, a dot, something.
/// Deliverability is the mail system's problem, not ours.
fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + c.len_utf8() < domain.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_shapes() {
        assert!(is_plausible_email("alice@example.com"));
        assert!(is_plausible_email("a@b.c"));
        assert!(is_plausible_email("weird+tag@sub.domain.io"));

        assert!(!is_plausible_email("no-at-sign"));
        assert!(!is_plausible_email("@example.com"));
        assert!(!is_plausible_email("alice@nodot"));
        assert!(!is_plausible_email("alice@.com"));
        assert!(!is_plausible_email("alice@com."));
    }

    #[test]
    fn test_validate_registration() {
        assert!(validate_registration("Alice", "a@b.c", "password123", "password123").is_ok());

        assert!(validate_registration("A", "a@b.c", "password123", "password123").is_err());
        assert!(validate_registration("Alice", "bad-email", "password123", "password123").is_err());
        assert!(validate_registration("Alice", "a@b.c", "short", "short").is_err());
        assert!(validate_registration("Alice", "a@b.c", "password123", "different1").is_err());
    }

    #[test]
    fn test_validation_errors_are_422() {
        let err = validate_registration("A", "a@b.c", "password123", "password123").unwrap_err();
        assert_eq!(err.http_status(), 422);
    }

    #[test]
    fn test_user_columns_qualified() {
        let qualified = user_columns_qualified();
        assert!(qualified.starts_with("u.id"));
        assert!(qualified.contains("u.balance"));
        assert!(!qualified.contains(" id"));
    }
}
