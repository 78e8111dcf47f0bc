//! Error types shared across the store, services, and HTTP adapter.
//!
//! The store and services signal failures through [`Error`]; the HTTP
//! adapter is the only place a kind is converted into a status code.

use thiserror::Error;

/// Domain error for store and service operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The addressed library, document, or chunk does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Input failed validation (empty name, bad k, dimension mismatch, ...).
    #[error("{0}")]
    Validation(String),

    /// An entity with the same ID already exists.
    #[error("{0}")]
    Conflict(String),

    /// A search was issued against an index that has not been built.
    #[error("index not built, call build() first")]
    IndexNotBuilt,

    /// Unexpected internal condition.
    #[error("{0}")]
    Internal(String),
}

impl Error {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Error::Conflict(msg.into())
    }

    /// Short machine-readable code used in HTTP error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::Validation(_) => "validation_error",
            Error::Conflict(_) => "conflict",
            Error::IndexNotBuilt => "index_not_built",
            Error::Internal(_) => "internal_error",
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
