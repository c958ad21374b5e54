//! Service-level errors returned to the outer (HTTP) layer.

use thiserror::Error;

use super::storage::StorageError;
use crate::error::HandlerError;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// HTTP-like status code for the outer layer.
    pub fn code(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::NotFound(_) => 404,
            ServiceError::Internal(_) => 500,
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "service_bad_request",
            ServiceError::NotFound(_) => "service_not_found",
            ServiceError::Internal(_) => "service_internal",
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { .. } => ServiceError::NotFound(err.to_string()),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<ServiceError> for HandlerError {
    fn from(err: ServiceError) -> Self {
        HandlerError::fail(err)
    }
}

impl From<StorageError> for HandlerError {
    fn from(err: StorageError) -> Self {
        HandlerError::fail(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_map_to_status_codes() {
        let missing = ServiceError::from(StorageError::not_found("tree", 7));
        assert_eq!(missing.code(), 404);
        assert_eq!(missing.to_string(), "not found: tree not found: 7");

        let backend = ServiceError::from(StorageError::Backend("connection reset".into()));
        assert_eq!(backend.code(), 500);
        assert_eq!(backend.as_label(), "service_internal");

        let handler = HandlerError::from(StorageError::Backend("connection reset".into()));
        assert_eq!(handler.as_label(), "handler_failed");
    }
}
