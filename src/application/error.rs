//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::{DomainError, ValidationError};

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("config error: {message}")]
    Config { message: String },
}

impl ApplicationError {
    /// The validation failure carried by this error, if any.
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            ApplicationError::Validation(v) => Some(v),
            _ => None,
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
