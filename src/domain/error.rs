//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::entities::{EntityId, TechnologyId};

/// Domain errors represent business logic violations.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("technology not found: {0}")]
    TechnologyNotFound(String),

    #[error("technology number already in use: {0}")]
    DuplicateTechnology(String),

    #[error("operation not found: {0}")]
    OperationNotFound(EntityId),

    #[error("operation component not found: {0}")]
    NodeNotFound(String),

    #[error("operation tree already has a root")]
    RootAlreadyExists,

    #[error("cycle detected in operation tree at component: {0}")]
    CycleDetected(EntityId),
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Why a reference copy was refused. Detected before any mutation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceCopyError {
    #[error("technology {0} references its own operation tree")]
    CyclicDependency(TechnologyId),

    #[error("referenced technology {0} has no operation components")]
    OperationComponentsEmpty(TechnologyId),
}

impl ReferenceCopyError {
    pub fn message_code(&self) -> &'static str {
        match self {
            ReferenceCopyError::CyclicDependency(_) => {
                "technologies.technologyReferenceTechnologyComponent.error.cyclicDependency"
            }
            ReferenceCopyError::OperationComponentsEmpty(_) => {
                "technologies.technologyReferenceTechnologyComponent.error.operationComponentsEmpty"
            }
        }
    }
}

/// Name of the reference-technology field in validation messages.
pub const REFERENCE_TECHNOLOGY_FIELD: &str = "referenceTechnology";

/// User-correctable validation failure; blocks the create/delete it was raised for.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field}: {code}")]
    Field { field: String, code: String },

    #[error("{code} ({})", .args.join(", "))]
    Global { code: String, args: Vec<String> },
}

impl ValidationError {
    pub fn code(&self) -> &str {
        match self {
            ValidationError::Field { code, .. } | ValidationError::Global { code, .. } => code,
        }
    }
}

impl From<ReferenceCopyError> for ValidationError {
    fn from(e: ReferenceCopyError) -> Self {
        ValidationError::Field {
            field: REFERENCE_TECHNOLOGY_FIELD.to_string(),
            code: e.message_code().to_string(),
        }
    }
}
