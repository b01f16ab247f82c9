use thiserror::Error;

use crate::domain::formulation::{FormulationId, FormulationStatus};
use crate::domain::profile::SkinType;
use crate::engine::concentration::RangeViolation;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid profile field `{field}`: {reason}")]
    InvalidProfile { field: String, reason: String },
    #[error("invalid formulation: {}", summarize(.0))]
    InvalidFormulation(Vec<RangeViolation>),
    #[error("invalid formulation transition from {from:?} to {to:?}")]
    InvalidFormulationTransition { from: FormulationStatus, to: FormulationStatus },
    #[error("formulation {formulation_id} is referenced by {referencing_products} product(s)")]
    FormulationInUse { formulation_id: FormulationId, referencing_products: usize },
    #[error("formulation {0} is not active")]
    FormulationInactive(FormulationId),
    #[error("formulation {formulation_id} is not compatible with {skin_type} skin")]
    IncompatibleSkinType { formulation_id: FormulationId, skin_type: SkinType },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

fn summarize(violations: &[RangeViolation]) -> String {
    violations.iter().map(|violation| violation.message.as_str()).collect::<Vec<_>>().join("; ")
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("{entity} `{id}` was not found")]
    NotFound { entity: &'static str, id: String },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::NotFound { .. } => "The requested record does not exist.",
            Self::Conflict { .. } => {
                "The request conflicts with existing records. Resolve the conflict and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::NotFound { message, .. }
            | Self::Conflict { message, .. }
            | Self::ServiceUnavailable { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(error @ DomainError::FormulationInUse { .. }) => {
                Self::Conflict { message: error.to_string(), correlation_id }
            }
            ApplicationError::Domain(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id }
            }
            ApplicationError::NotFound { .. } => {
                Self::NotFound { message: value.to_string(), correlation_id }
            }
            ApplicationError::Conflict(message) => Self::Conflict { message, correlation_id },
            ApplicationError::Persistence(message) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
            ApplicationError::Configuration(message) => Self::Internal { message, correlation_id },
        }
    }
}
