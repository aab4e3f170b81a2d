//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::node::Condition;

/// Domain errors represent violations of the enrichment and decision-tree rules.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("malformed input at row {row}, column '{column}': {reason}")]
    MalformedInput {
        row: usize,
        column: String,
        reason: String,
    },

    #[error("malformed input: required column '{0}' is missing")]
    MissingColumn(String),

    #[error("tree exceeds maximum depth of {max_depth}")]
    TreeTooDeep { max_depth: usize },

    #[error("unknown attribute: {attribute}")]
    UnknownAttribute { attribute: String },

    #[error("build cancelled")]
    BuildCancelled,

    #[error("value '{value}' is not a number, required for condition {condition}")]
    InvalidSplitValue { value: String, condition: Condition },

    #[error("invalid answer: {0}")]
    InvalidAnswer(String),

    #[error("build answered out of order: expected {expected}, got {got}")]
    BuildOutOfOrder {
        expected: &'static str,
        got: &'static str,
    },

    #[error("build is not complete")]
    BuildIncomplete,

    #[error("collaborator failed: {0}")]
    Collaborator(String),
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
