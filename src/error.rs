use axum::http::StatusCode;
use thiserror::Error;

/// Errors on the authentication path.
///
/// Everything the guard sees collapses to a uniform not-authenticated
/// response; the variants exist so register/login can tell a hashing or
/// database failure (500) apart from bad credentials.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("token signing failed: {0}")]
    TokenSign(String),

    #[error("invalid token")]
    TokenDecode(#[from] jsonwebtoken::errors::Error),

    #[error("no matching user record")]
    RecordNotFound,

    #[error("database error")]
    Persistence(#[from] sqlx::Error),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Hashing(_) | AuthError::TokenSign(_) | AuthError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AuthError::TokenDecode(_) | AuthError::RecordNotFound => StatusCode::UNAUTHORIZED,
        }
    }

    /// Postgres unique-constraint violation (error class 23505), used to
    /// turn a concurrent duplicate insert into a conflict response.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            AuthError::Persistence(sqlx::Error::Database(db)) => {
                db.code().as_deref() == Some("23505")
            }
            _ => false,
        }
    }
}
