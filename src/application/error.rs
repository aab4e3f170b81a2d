//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("precondition not met: {0}")]
    Precondition(String),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("csv error: {context}: {source}")]
    Csv {
        context: String,
        #[source]
        source: csv::Error,
    },

    #[error("operation failed: {context}: {source}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{operation}: {source}")]
    Operation {
        operation: &'static str,
        #[source]
        source: Box<ApplicationError>,
    },
}

impl ApplicationError {
    /// Tag an error with the user-facing operation it ended.
    pub fn during(self, operation: &'static str) -> Self {
        match self {
            already @ ApplicationError::Operation { .. } => already,
            other => ApplicationError::Operation {
                operation,
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, below any operation tags.
    pub fn root(&self) -> &ApplicationError {
        match self {
            ApplicationError::Operation { source, .. } => source.root(),
            other => other,
        }
    }

    /// The domain error at the root, if any.
    pub fn domain(&self) -> Option<&DomainError> {
        match self.root() {
            ApplicationError::Domain(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
