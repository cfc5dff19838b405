//! Service Layer Error Types
//!
//! Errors returned by service operations. Reads never surface
//! `NotAuthenticated` (they degrade to empty results); writes do, so callers
//! can tell "please sign in" apart from a failed request.

use crate::db::BackendError;
use crate::models::{ValidationError, ValidationErrors};
use thiserror::Error;

/// Service operation errors
#[derive(Error, Debug)]
pub enum ServiceError {
    /// No active user session
    #[error("Not signed in")]
    NotAuthenticated,

    /// Backend read or write failed; the action can be retried
    #[error("Persistence failed: {0}")]
    Persistence(#[source] BackendError),

    /// Input rejected before any request was made
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// Node not found by ID
    #[error("Node not found: {id}")]
    NodeNotFound { id: String },
}

impl ServiceError {
    /// Create a node not found error
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound { id: id.into() }
    }

    /// Whether retrying the same action may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }

    /// Field-level validation errors, if this is a validation failure
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<BackendError> for ServiceError {
    fn from(error: BackendError) -> Self {
        match error {
            BackendError::NotAuthenticated => Self::NotAuthenticated,
            BackendError::NotFound { entity: "node", id } => Self::NodeNotFound { id },
            other => Self::Persistence(other),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(error: ValidationError) -> Self {
        Self::Validation(error.into())
    }
}

/// Degrade a read to an empty result when nobody is signed in
pub(crate) fn or_empty_when_signed_out<T: Default>(
    result: Result<T, BackendError>,
    what: &str,
) -> Result<T, ServiceError> {
    match result {
        Ok(value) => Ok(value),
        Err(BackendError::NotAuthenticated) => {
            tracing::warn!("No authenticated user, returning empty {}", what);
            Ok(T::default())
        }
        Err(e) => Err(e.into()),
    }
}
