use thiserror::Error;

/// Error kinds every Grove operation reports.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GroveError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("not permitted: {0}")]
    Authorization(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("external service error: {0}")]
    ExternalService(String),

    /// Persistence failure. The write was rolled back.
    #[error("operation failed: {0}")]
    Operation(String),
}

pub type GroveResult<T> = Result<T, GroveError>;

impl GroveError {
    pub fn validation(msg: impl Into<String>) -> Self {
        GroveError::Validation(msg.into())
    }

    pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        GroveError::NotFound(format!("{what} {id}"))
    }
}
