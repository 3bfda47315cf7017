//! Authentication error types.

use kinship_storage::StorageError;
use thiserror::Error;

/// Errors that can occur during authentication and authorization.
///
/// Every variant that ends a request with 401 exposes the same public
/// message, whatever check actually failed. Use [`AuthError::public_message`]
/// for anything sent to a client and the `Display` output for logs.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or malformed header, bad signature, expiry, wrong token
    /// kind, or unknown subject.
    #[error("invalid token")]
    InvalidToken,

    /// No guard ran for the request.
    #[error("unauthorized")]
    Unauthorized,

    /// Unknown login identifier or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Registration or profile update with an email already in use.
    #[error("email already registered")]
    EmailTaken,

    /// Missing or invalid token configuration. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Unexpected failure inside the pipeline.
    #[error("internal error: {0}")]
    Internal(String),

    /// Storage error outside of the guard path.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl AuthError {
    /// Returns true if this error rejects the request as unauthenticated.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidToken | AuthError::Unauthorized | AuthError::Internal(_)
        )
    }

    /// Message safe to return to a client.
    pub fn public_message(&self) -> &'static str {
        match self {
            // Store failures during authorization fail closed and look like a bad token.
            AuthError::InvalidToken | AuthError::Internal(_) => "Invalid token",
            AuthError::Unauthorized => "Unauthorized",
            AuthError::InvalidCredentials => "Invalid credentials",
            AuthError::EmailTaken => "Email already registered",
            AuthError::Configuration(_) | AuthError::Storage(_) => "Internal server error",
        }
    }
}
