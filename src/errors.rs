use thiserror::Error;
use uuid::Uuid;

use crate::validate::ValidationErrors;

#[derive(Error, Debug)]
pub enum LoanError {
    /// field-level validation failure; recoverable, carries the full
    /// field -> messages map for the caller
    #[error("event validation failed: {errors}")]
    Validation { errors: ValidationErrors },

    /// ambiguous or invalid loan configuration; aborts the calculation
    #[error("invalid configuration: {message}")]
    Configuration { message: String },

    /// unsupported frequency identifier
    #[error("unknown frequency: {value}")]
    UnknownFrequency { value: String },

    /// loan or schedule absent
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("calculation error: {message}")]
    CalculationError { message: String },
}

impl LoanError {
    pub fn configuration(message: impl Into<String>) -> Self {
        LoanError::Configuration {
            message: message.into(),
        }
    }

    pub fn calculation(message: impl Into<String>) -> Self {
        LoanError::CalculationError {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LoanError>;
