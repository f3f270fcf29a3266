use thiserror::Error;

use crate::domain::models::MessageValidationError;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entity not found: {0}")]
    NotFound(String),
    #[error("Validation failed: {0}")]
    Validation(#[from] MessageValidationError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
