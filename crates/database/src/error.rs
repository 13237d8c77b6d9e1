use sea_orm::{DbErr, SqlErr};

/// Failure of a service operation.
///
/// Every variant except `Database` and `PasswordHash` is an expected outcome
/// that the caller should report back to the user.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Invalid email or password")]
    Auth,
    #[error("Account has been disabled")]
    AccountDisabled,
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Turns a unique index violation into a `Conflict` with the given
    /// message, passing every other database error through
    pub fn from_unique_violation(err: DbErr, message: impl Into<String>) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Self::Conflict(message.into()),
            _ => Self::Database(err),
        }
    }
}

/// Whether a database error was caused by a unique index
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
