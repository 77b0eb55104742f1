//! Message store data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AccountId;

/// Row identifier of a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Folder label a message was ingested from.
///
/// Labels are case-insensitive and stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Folder(String);

impl Folder {
    /// Label of the inbox, the only folder the fetcher reads.
    pub const INBOX: &'static str = "inbox";

    /// Create a folder label.
    #[must_use]
    pub fn new(label: &str) -> Self {
        Self(label.trim().to_lowercase())
    }

    /// The inbox folder.
    #[must_use]
    pub fn inbox() -> Self {
        Self(Self::INBOX.to_string())
    }

    /// Borrow the label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Folder {
    fn default() -> Self {
        Self::inbox()
    }
}

impl std::fmt::Display for Folder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A message ready to be written to the store.
#[derive(Debug, Clone)]
pub struct NewMessage {
    /// Account the message was fetched for.
    pub account_id: AccountId,
    /// Provider-assigned message identifier.
    pub message_id: String,
    /// Sender display name.
    pub from_name: String,
    /// Sender address.
    pub from_address: String,
    /// Message subject.
    pub subject: String,
    /// Extracted plain text.
    pub content: String,
    /// When the message was received.
    pub received_at: DateTime<Utc>,
    /// Folder label.
    pub folder: Folder,
}

/// A stored message.
#[derive(Debug, Clone, Serialize)]
pub struct IngestedMessage {
    /// Row identifier.
    pub id: MessageId,
    /// Owning account.
    pub account_id: AccountId,
    /// Provider-assigned message identifier.
    pub message_id: String,
    /// Sender display name.
    pub from_name: String,
    /// Sender address.
    pub from_address: String,
    /// Message subject.
    pub subject: String,
    /// Extracted plain text.
    pub content: String,
    /// When the message was received.
    pub received_at: DateTime<Utc>,
    /// Folder label.
    pub folder: Folder,
    /// When the row was first written.
    pub created_at: DateTime<Utc>,
}
