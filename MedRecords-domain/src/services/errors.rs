use thiserror::Error;
use tracing::error;

use med_records_data::repository::RepositoryError;

use crate::auth::AuthFailure;
use crate::services::bulk::ValidationFailure;

/// Errors returned by the domain services
#[derive(Debug, Error)]
pub enum ServiceError {
    /// One or more fields were rejected
    #[error("Validation failed")]
    Validation(ValidationFailure),

    /// Credentials or token rejected
    #[error("Authentication failed: {}", .0.detail)]
    Authentication(AuthFailure),

    /// Authenticated but not allowed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// No such record visible to the caller
    #[error("Not found: {0}")]
    NotFound(String),

    /// Anything else
    #[error("{0}")]
    Unexpected(String),
}

impl ServiceError {
    /// The standard message for a caller without permission
    pub fn permission_denied() -> Self {
        ServiceError::Forbidden("You do not have permission to perform this action.".to_string())
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => ServiceError::NotFound(msg),
            other => {
                error!("Repository error: {}", other);
                ServiceError::Unexpected(other.to_string())
            }
        }
    }
}
