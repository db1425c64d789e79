use thiserror::Error;

use crate::economy::EconomyError;

/// Errors from registration, login, and token validation. Credential
/// failures are deliberately coarse: callers learn that a login failed, not
/// which part of it.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Username or password did not match.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Username failed validation rules.
    #[error("invalid username: {0}")]
    InvalidUsername(String),

    /// Password failed the policy (length bounds).
    #[error("invalid password: {0}")]
    InvalidPassword(String),

    /// Too many attempts for this login key.
    #[error("rate limited: retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: i64 },

    /// Token failed signature or structural validation.
    #[error("invalid token: {0}")]
    TokenInvalid(#[from] jsonwebtoken::errors::Error),

    /// Token is past its expiry.
    #[error("token expired")]
    TokenExpired,

    /// Token was revoked before its natural expiry.
    #[error("token revoked")]
    TokenRevoked,

    /// Token carries a role string we don't recognize.
    #[error("unknown role in token: {0}")]
    UnknownRole(String),

    /// Password hashing or verification failed internally.
    #[error("password hash failure: {0}")]
    Hash(String),

    /// Underlying store failure.
    #[error(transparent)]
    Economy(#[from] EconomyError),
}
