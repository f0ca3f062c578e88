//! Error taxonomy for catalog operations

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result alias for catalog service operations
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Machine-readable error class, mirrored by HTTP status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    BadRequest,
    NotFound,
    Conflict,
    InternalError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::BadRequest => write!(f, "BadRequest"),
            ErrorKind::NotFound => write!(f, "NotFound"),
            ErrorKind::Conflict => write!(f, "Conflict"),
            ErrorKind::InternalError => write!(f, "InternalError"),
        }
    }
}

/// Errors surfaced by the catalog service
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Missing or invalid input
    #[error("{0}")]
    Validation(String),

    /// A referenced id does not exist
    #[error("{0}")]
    NotFound(String),

    /// Delete blocked by a referencing record
    #[error("{0}")]
    Conflict(String),

    /// Storage failure
    #[error("Storage error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::Validation(_) => ErrorKind::BadRequest,
            CatalogError::NotFound(_) => ErrorKind::NotFound,
            CatalogError::Conflict(_) => ErrorKind::Conflict,
            CatalogError::Internal(_) => ErrorKind::InternalError,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CatalogError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        CatalogError::NotFound(message.into())
    }
}
