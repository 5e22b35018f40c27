// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Caller broke a state-machine contract (e.g. created a task that was not ready)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Recurring task not found: {0}")]
    TaskNotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
