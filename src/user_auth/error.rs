use thiserror::Error;

/// Identity failures
#[derive(Error, Debug, Clone)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("Email already in use")]
    EmailInUse,

    /// Covers both unknown email and wrong password: the message never
    /// reveals which
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid or missing token")]
    Unauthorized,

    #[error("Receiver not found")]
    ReceiverNotFound,

    #[error("You cannot transfer money to yourself")]
    SelfTransferForbidden,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// HTTP status suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            AuthError::Validation(_) | AuthError::EmailInUse | AuthError::InvalidCredentials => 422,
            AuthError::Unauthorized => 401,
            AuthError::ReceiverNotFound => 404,
            AuthError::SelfTransferForbidden => 400,
            AuthError::Database(_) | AuthError::Internal(_) => 500,
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        AuthError::Database(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status() {
        assert_eq!(AuthError::Validation("x".into()).http_status(), 422);
        assert_eq!(AuthError::EmailInUse.http_status(), 422);
        assert_eq!(AuthError::InvalidCredentials.http_status(), 422);
        assert_eq!(AuthError::Unauthorized.http_status(), 401);
        assert_eq!(AuthError::ReceiverNotFound.http_status(), 404);
        assert_eq!(AuthError::SelfTransferForbidden.http_status(), 400);
    }

    #[test]
    fn test_credentials_message_does_not_leak() {
        // Same public message whether the email exists or the password
        // was wrong
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid email or password"
        );
    }
}
