//! Authentication error types.

use thiserror::Error;

/// Errors that can occur while issuing or checking credentials.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token is not three dot-separated segments with a readable header.
    #[error("malformed token")]
    MalformedToken,

    /// The token header names an algorithm outside the HMAC family.
    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The token's `exp` is in the past.
    #[error("token expired")]
    Expired,

    /// Signature or claim validation failed.
    #[error("invalid token: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    /// Signing a new token failed.
    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
