//! Error types for flipbook-core

use crate::identity::{EntityId, PropertyId};
use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Type error: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },

    #[error("Property not found: {0}")]
    PropertyNotFound(PropertyId),

    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Evaluation error: {0}")]
    EvaluationError(String),

    #[error("Invalid program: {0}")]
    InvalidProgram(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
