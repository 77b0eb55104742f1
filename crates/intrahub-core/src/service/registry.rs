//! Account registration.

use std::sync::Arc;

use tracing::{info, warn};

use super::mail::{MailConnector, probe};
use crate::account::{
    AccountDraft, AccountRepository, CredentialCipher, EmailAccount, UserId, validate_account,
};
use crate::Result;

/// Registers IMAP accounts, persisting only those that pass a live probe.
pub struct AccountRegistry {
    accounts: AccountRepository,
    cipher: CredentialCipher,
    connector: Arc<dyn MailConnector>,
}

impl AccountRegistry {
    /// Create a registry.
    #[must_use]
    pub fn new(
        accounts: AccountRepository,
        cipher: CredentialCipher,
        connector: Arc<dyn MailConnector>,
    ) -> Self {
        Self {
            accounts,
            cipher,
            connector,
        }
    }

    /// Validate, probe and persist a new account for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`](crate::Error::Validation) for missing or
    /// malformed fields, [`Error::Mail`](crate::Error::Mail) if the probe
    /// fails, or a database error if the insert fails. Nothing is stored
    /// unless the probe succeeded.
    pub async fn add_account(&self, user: &UserId, draft: &AccountDraft) -> Result<EmailAccount> {
        let account = validate_account(draft)?;

        probe(self.connector.as_ref(), &account.imap_config())
            .await
            .inspect_err(|e| {
                warn!(user = %user, host = %account.imap_host, error = %e, "Probe failed");
            })?;

        let created = self.accounts.create(user, &account, &self.cipher).await?;
        info!(user = %user, account = %created.id, email = %created.email_address, "Registered email account");
        Ok(created)
    }
}
