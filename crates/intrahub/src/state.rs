//! Shared application state.

use std::sync::Arc;

use intrahub_core::{
    AccountRegistry, AccountRepository, CredentialCipher, Database, MailConnector, MailboxFetcher,
    MessageRepository, RoleRepository, SessionRepository,
};
use tracing::error;

use crate::config::ConfigError;
use crate::error::{ApiError, ApiResult};

/// Services that read or write mailbox credentials.
pub struct MailServices {
    /// Account registration behind the probe.
    pub registry: AccountRegistry,
    /// Inbox ingestion.
    pub fetcher: MailboxFetcher,
}

/// Everything a handler needs, built once at startup.
pub struct AppState {
    mail: Option<MailServices>,
    /// Stored accounts.
    pub accounts: AccountRepository,
    /// Ingested messages.
    pub messages: MessageRepository,
    /// Role assignments.
    pub roles: RoleRepository,
    /// Caller sessions.
    pub sessions: SessionRepository,
}

impl AppState {
    /// Open every repository on `db` and wire the services to `connector`.
    ///
    /// Without a `cipher` the server is unconfigured: the functions that
    /// need it answer 500 while listing still works.
    ///
    /// # Errors
    ///
    /// Returns an error if a table cannot be created.
    pub async fn new(
        db: &Database,
        cipher: Option<CredentialCipher>,
        connector: Arc<dyn MailConnector>,
    ) -> intrahub_core::Result<Self> {
        let accounts = AccountRepository::new(db).await?;
        let messages = MessageRepository::new(db).await?;
        let roles = RoleRepository::new(db).await?;
        let sessions = SessionRepository::new(db).await?;

        let mail = cipher.map(|cipher| MailServices {
            registry: AccountRegistry::new(accounts.clone(), cipher.clone(), Arc::clone(&connector)),
            fetcher: MailboxFetcher::new(accounts.clone(), messages.clone(), cipher, connector),
        });

        Ok(Self {
            mail,
            accounts,
            messages,
            roles,
            sessions,
        })
    }

    /// The credential-backed services.
    ///
    /// # Errors
    ///
    /// Returns a 500 when the server has no secret key.
    pub fn mail(&self) -> ApiResult<&MailServices> {
        self.mail.as_ref().ok_or_else(|| {
            error!("Request refused: server has no secret key");
            ApiError::internal(ConfigError::MissingSecret.to_string())
        })
    }
}
