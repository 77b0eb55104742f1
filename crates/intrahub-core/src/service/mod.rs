//! Mailbox services.
//!
//! This module holds the mail transport seam ([`MailConnector`] /
//! [`MailSession`]), its IMAP implementation, and the two flows built on it:
//! account registration behind a connectivity probe, and inbox ingestion.

mod extract;
mod fetcher;
pub mod mail;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
mod registry;
mod stream;

pub use extract::{NO_CONTENT, decode_header_value, extract_text, header_from_source, parse_date};
pub use fetcher::{BATCH_SIZE, BatchWindow, MailboxFetcher};
pub use mail::{FetchedMessage, ImapConnector, MailConnector, MailServiceError, MailSession, probe};
pub use registry::AccountRegistry;
