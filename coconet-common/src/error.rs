//! Common error types for Coconet

use thiserror::Error;

/// Common result type for Coconet operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Coconet services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found (unknown tag, member or article)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation would violate a domain invariant (e.g. a member left without roles)
    #[error("Domain invariant violated: {0}")]
    DomainInvariant(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Caller is not allowed to perform the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Short machine-readable code for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            #[cfg(feature = "sqlx")]
            Error::Database(_) => "DATABASE_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::DomainInvariant(_) => "DOMAIN_INVARIANT",
            Error::InvalidInput(_) => "BAD_REQUEST",
            Error::Forbidden(_) => "FORBIDDEN",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
