//! # intrahub-core
//!
//! Domain logic behind the intrahub mailbox integration.
//!
//! This crate provides:
//! - **Account Registry** - per-user IMAP accounts, persisted only after a
//!   successful connectivity probe
//! - **Mailbox Fetcher** - pulls the latest batch window of the inbox and
//!   stores one row per message, tolerating per-message failures
//! - **Message Store** - ingested messages queryable by account and folder
//! - **Role Checker** - fail-closed elevated role lookup
//! - **Sessions** - bearer-token sessions resolved into an explicit caller
//! - **Credential encryption** - mailbox secrets encrypted at rest

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
mod db;
mod error;
pub mod message;
pub mod role;
pub mod service;
pub mod session;

pub use account::credentials;
pub use account::{
    AccountDraft, AccountId, AccountRepository, EmailAccount, ImapConfig, NewAccount, Security,
    UserId,
};
pub use account::{
    CredentialCipher, CredentialError, ValidationError, ValidationResult, validate_account,
};
pub use db::Database;
pub use error::{Error, Result};
pub use message::{Folder, IngestedMessage, MessageId, MessageRepository, NewMessage};
pub use role::{ELEVATED_ROLE, RoleCheck, RoleRepository};
pub use service::{
    AccountRegistry, BATCH_SIZE, BatchWindow, FetchedMessage, ImapConnector, MailConnector,
    MailServiceError, MailSession, MailboxFetcher, extract_text, probe,
};
pub use session::{Session, SessionRepository};
