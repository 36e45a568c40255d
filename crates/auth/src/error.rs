use cakehouse_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// A required input was absent or blank. Carries the client-facing message.
    #[error("{0}")]
    MissingFields(&'static str),

    #[error("Invalid user ID")]
    InvalidId,

    #[error("Email already exists")]
    DuplicateEmail,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid credentials")]
    WrongPassword,

    #[error("Invalid verification code")]
    CodeMismatch,

    #[error("Malformed password hash: {0}")]
    HashFormatError(String),

    #[error("Password hashing failed: {0}")]
    HashingError(String),

    #[error("Token generation failed: {0}")]
    TokenGenerationError(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, AuthError>;
