//! Common error types for the heritage catalog services

use thiserror::Error;

/// Common result type for catalog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across catalog microservices
#[derive(Error, Debug)]
pub enum Error {
    /// Storage failure (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Referenced artifact or feedback does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed or incomplete input, or an artifact invariant violation
    #[error("Validation failed for '{field}': {message}")]
    Validation { field: String, message: String },

    /// Operation not permitted from the record's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Missing or unrecognized credential
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated caller lacks the required role
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a field-level validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}
