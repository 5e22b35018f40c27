// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;

    #[test]
    fn test_domain_error_converts_with_question_mark() {
        fn lookup() -> crate::domain::error::Result<()> {
            Err(DomainError::TaskNotFound("nightly".to_string()))
        }
        fn fails() -> Result<()> {
            lookup()?;
            Ok(())
        }

        let err = fails().unwrap_err();
        assert!(matches!(err, AppError::Domain(DomainError::TaskNotFound(_))));
        assert_eq!(err.to_string(), "Domain error: Recurring task not found: nightly");
    }
}
