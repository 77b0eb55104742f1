//! Account management module.
//!
//! Provides the IMAP account model, input validation, encrypted credential
//! storage and the account repository.

pub mod credentials;
mod model;
mod repository;
mod validation;

pub use credentials::{CredentialCipher, CredentialError};
pub use model::{
    AccountDraft, AccountId, EmailAccount, ImapConfig, NewAccount, Security, UserId,
};
pub use repository::AccountRepository;
pub use validation::{ValidationError, ValidationResult, validate_account};
