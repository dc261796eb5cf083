//! Error types for flipbook-bake

use flipbook_core::{EntityId, PropertyId};
use thiserror::Error;

/// Recording and baking error type
#[derive(Error, Debug)]
pub enum BakeError {
    #[error("no editor scope is open")]
    NoEditor,

    #[error("{0} has a managed lifetime; detach it from its owner first")]
    ManagedLifetime(EntityId),

    #[error("{0} is already possessed by an evaluator")]
    EvaluatorBusy(PropertyId),

    #[error("{0} has no evaluator installed")]
    NoEvaluator(PropertyId),

    #[error("procedure failed: {0}")]
    Procedure(String),

    #[error(transparent)]
    Core(#[from] flipbook_core::Error),
}

/// Result type alias
pub type BakeResult<T> = std::result::Result<T, BakeError>;
