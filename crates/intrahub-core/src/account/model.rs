//! Account model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::credentials::CredentialCipher;
use crate::Result;

/// Unique identifier for an email account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub i64);

impl AccountId {
    /// Create a new account ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an authenticated user, as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Create a user ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transport security for the IMAP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// Implicit TLS (connect directly with TLS).
    #[default]
    Tls,
    /// Plaintext TCP (not recommended).
    Plain,
}

impl Security {
    /// Map the `use_ssl` flag onto a security mode.
    #[must_use]
    pub const fn from_use_ssl(use_ssl: bool) -> Self {
        if use_ssl { Self::Tls } else { Self::Plain }
    }

    /// Whether the connection is encrypted.
    #[must_use]
    pub const fn is_encrypted(self) -> bool {
        matches!(self, Self::Tls)
    }
}

/// Everything needed to open an IMAP session.
#[derive(Clone, Default)]
pub struct ImapConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Username for authentication.
    pub username: String,
    /// Password for authentication.
    pub password: String,
}

impl ImapConfig {
    /// Build the connection config for a stored account, decrypting its secret.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored secret cannot be decrypted.
    pub fn for_account(account: &EmailAccount, cipher: &CredentialCipher) -> Result<Self> {
        Ok(Self {
            host: account.imap_host.clone(),
            port: account.imap_port,
            security: Security::from_use_ssl(account.use_ssl),
            username: account.username.clone(),
            password: cipher.decrypt(&account.encrypted_password)?,
        })
    }
}

// Keeps the password out of logs.
impl std::fmt::Debug for ImapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("security", &self.security)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Account creation input as submitted by a caller.
///
/// Every field is optional here; [`validate_account`](super::validate_account)
/// turns a draft into a [`NewAccount`] or reports what is missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountDraft {
    /// Mailbox address.
    pub email_address: Option<String>,
    /// IMAP server hostname.
    pub imap_host: Option<String>,
    /// IMAP server port.
    pub imap_port: Option<u16>,
    /// Login username.
    pub username: Option<String>,
    /// Login secret.
    pub password: Option<String>,
    /// Implicit TLS; defaults to `true` when omitted.
    pub use_ssl: Option<bool>,
}

/// Validated account creation input.
#[derive(Clone)]
pub struct NewAccount {
    /// Mailbox address.
    pub email_address: String,
    /// IMAP server hostname.
    pub imap_host: String,
    /// IMAP server port.
    pub imap_port: u16,
    /// Login username.
    pub username: String,
    /// Login secret (plaintext, never persisted as-is).
    pub password: String,
    /// Implicit TLS.
    pub use_ssl: bool,
}

impl NewAccount {
    /// Connection config used to probe the server before persisting.
    #[must_use]
    pub fn imap_config(&self) -> ImapConfig {
        ImapConfig {
            host: self.imap_host.clone(),
            port: self.imap_port,
            security: Security::from_use_ssl(self.use_ssl),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("email_address", &self.email_address)
            .field("imap_host", &self.imap_host)
            .field("imap_port", &self.imap_port)
            .field("username", &self.username)
            .field("use_ssl", &self.use_ssl)
            .finish_non_exhaustive()
    }
}

/// A stored email account.
///
/// The mailbox secret is only held encrypted and is never serialized.
#[derive(Debug, Clone, Serialize)]
pub struct EmailAccount {
    /// Unique identifier.
    pub id: AccountId,
    /// Owning user.
    pub user_id: UserId,
    /// Mailbox address.
    pub email_address: String,
    /// IMAP server hostname.
    pub imap_host: String,
    /// IMAP server port.
    pub imap_port: u16,
    /// Login username.
    pub username: String,
    /// Encrypted login secret.
    #[serde(skip)]
    pub encrypted_password: String,
    /// Implicit TLS.
    pub use_ssl: bool,
    /// When the account was registered.
    pub created_at: DateTime<Utc>,
}

impl EmailAccount {
    /// Whether the given user owns this account.
    #[must_use]
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.user_id == user
    }
}
