//! Error types for the core library.

use thiserror::Error;

use crate::account::{AccountId, CredentialError, ValidationError};
use crate::service::MailServiceError;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Mail server operation failed.
    #[error(transparent)]
    Mail(#[from] MailServiceError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Account input failed validation.
    #[error("Invalid account: {}", join_messages(.0))]
    Validation(Vec<ValidationError>),

    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Credential encryption error.
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),
}

impl From<Vec<ValidationError>> for Error {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self::Validation(errors)
    }
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ValidationError::message)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
