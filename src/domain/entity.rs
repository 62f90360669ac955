//! Domain Layer - Error Taxonomy
//!
//! The error contract shared by the store adapter and the sync engine.
//! Only the stable code and message cross the process boundary.

use serde::{Deserialize, Serialize};

/// Common result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level errors
///
/// `Validation`, `NotFound` and `AlreadyExists` are terminal for the
/// submitted change. `StoreUnavailable` is transient: the whole sync call
/// is safe to retry because every operation is idempotent. `Conflict` is
/// raised by the optimistic version check on replace and is retried once
/// internally before it surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainError {
    Validation(String),
    NotFound(String),
    AlreadyExists(String),
    Conflict(String),
    StoreUnavailable(String),
    Internal(String),
}

impl DomainError {
    /// Stable machine-readable code for the external interface.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation_error",
            DomainError::NotFound(_) => "not_found",
            DomainError::AlreadyExists(_) => "already_exists",
            DomainError::Conflict(_) => "conflict",
            DomainError::StoreUnavailable(_) => "store_unavailable",
            DomainError::Internal(_) => "internal_error",
        }
    }
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainError::Validation(msg) => write!(f, "Invalid input: {}", msg),
            DomainError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DomainError::AlreadyExists(msg) => write!(f, "Already exists: {}", msg),
            DomainError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            DomainError::StoreUnavailable(msg) => write!(f, "Store unavailable: {}", msg),
            DomainError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}
