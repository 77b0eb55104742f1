//! Inbox ingestion.

use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::extract::extract_text;
use super::mail::{FetchedMessage, MailConnector, MailSession};
use crate::account::{AccountRepository, CredentialCipher, EmailAccount, ImapConfig};
use crate::message::{Folder, MessageRepository, NewMessage};
use crate::{AccountId, Error, Result};

/// Number of messages fetched per invocation.
pub const BATCH_SIZE: u32 = 20;

/// The slice of sequence numbers fetched from a mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchWindow {
    /// First sequence number (inclusive).
    pub first: u32,
    /// Last sequence number (inclusive).
    pub last: u32,
}

impl BatchWindow {
    /// The highest `size` sequence numbers of a mailbox holding `exists`
    /// messages, or `None` when there is nothing to fetch.
    #[must_use]
    pub fn latest(exists: u32, size: u32) -> Option<Self> {
        if exists == 0 || size == 0 {
            return None;
        }
        Some(Self {
            first: exists.saturating_sub(size - 1).max(1),
            last: exists,
        })
    }

    const fn len(&self) -> u32 {
        self.last - self.first + 1
    }

    /// Sequence numbers in fetch order.
    #[must_use]
    pub const fn sequence_numbers(&self) -> RangeInclusive<u32> {
        self.first..=self.last
    }
}

impl std::fmt::Display for BatchWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.first, self.last)
    }
}

/// Pulls the latest batch window of an account's inbox into the message store.
pub struct MailboxFetcher {
    accounts: AccountRepository,
    messages: MessageRepository,
    cipher: CredentialCipher,
    connector: Arc<dyn MailConnector>,
}

impl MailboxFetcher {
    /// Create a fetcher.
    #[must_use]
    pub fn new(
        accounts: AccountRepository,
        messages: MessageRepository,
        cipher: CredentialCipher,
        connector: Arc<dyn MailConnector>,
    ) -> Self {
        Self {
            accounts,
            messages,
            cipher,
            connector,
        }
    }

    /// Fetch the latest [`BATCH_SIZE`] inbox messages of an account and store
    /// them. Returns how many messages were stored.
    ///
    /// Messages are processed one at a time. A message that fails to fetch or
    /// store is logged and skipped. The session is always logged out once it
    /// has been established.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccountNotFound`] for an unknown account, and a mail
    /// error if the session cannot be established or the inbox cannot be
    /// selected.
    pub async fn fetch_emails(&self, account_id: AccountId) -> Result<usize> {
        let account = self
            .accounts
            .get(account_id)
            .await?
            .ok_or(Error::AccountNotFound(account_id))?;

        let config = ImapConfig::for_account(&account, &self.cipher)?;
        let mut session = self.connector.connect(&config).await.map_err(|e| {
            error!(account = %account_id, error = %e, "Could not open mail session");
            e
        })?;

        let outcome = self.ingest_inbox(&account, session.as_mut()).await;

        if let Err(e) = session.logout().await {
            warn!(account = %account_id, error = %e, "Logout failed");
        }

        match &outcome {
            Ok(stored) => info!(account = %account_id, stored, "Fetched emails"),
            Err(e) => error!(account = %account_id, error = %e, "Fetching emails failed"),
        }
        outcome
    }

    async fn ingest_inbox(&self, account: &EmailAccount, session: &mut dyn MailSession) -> Result<usize> {
        let exists = session.select_inbox().await?;
        let Some(window) = BatchWindow::latest(exists, BATCH_SIZE) else {
            debug!(account = %account.id, "Inbox is empty");
            return Ok(0);
        };
        debug!(account = %account.id, exists, %window, size = window.len(), "Fetching batch window");

        let mut keys = HashSet::new();
        let mut stored = 0;
        for seq in window.sequence_numbers() {
            let fetched = match session.fetch_message(seq).await {
                Ok(Some(fetched)) => fetched,
                Ok(None) => {
                    warn!(account = %account.id, seq, "Server returned no data for message");
                    continue;
                }
                Err(e) => {
                    warn!(account = %account.id, seq, error = %e, "Failed to fetch message");
                    continue;
                }
            };

            // A Message-ID already used in this batch belongs to a different
            // message; key it by its mailbox position instead.
            let mut key = fetched.provider_id();
            if !keys.insert(key.clone()) {
                key = fetched.mailbox_id();
                debug!(account = %account.id, seq, %key, "Duplicate Message-ID in batch");
                keys.insert(key.clone());
            }

            let message = to_new_message(account.id, key, fetched);
            match self.messages.upsert(&message).await {
                Ok(id) => {
                    debug!(account = %account.id, seq, message = %id, "Stored message");
                    stored += 1;
                }
                Err(e) => {
                    warn!(account = %account.id, seq, error = %e, "Failed to store message");
                }
            }
        }

        Ok(stored)
    }
}

fn to_new_message(account_id: AccountId, message_id: String, fetched: FetchedMessage) -> NewMessage {
    NewMessage {
        account_id,
        message_id,
        content: extract_text(&fetched.source),
        received_at: fetched.date.unwrap_or_else(Utc::now),
        from_name: fetched.from_name,
        from_address: fetched.from_address,
        subject: fetched.subject,
        folder: Folder::inbox(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::service::mock::{MockConnector, sample_message};
    use crate::{Database, NewAccount, UserId};

    struct Fixture {
        db: Database,
        fetcher: MailboxFetcher,
        messages: MessageRepository,
        connector: MockConnector,
        account: AccountId,
    }

    async fn fixture(connector: MockConnector) -> Fixture {
        let db = Database::in_memory().await.unwrap();
        let accounts = AccountRepository::new(&db).await.unwrap();
        let messages = MessageRepository::new(&db).await.unwrap();
        let cipher = CredentialCipher::from_passphrase("test").unwrap();

        let account = accounts
            .create(
                &UserId::new("owner"),
                &NewAccount {
                    email_address: "me@example.com".into(),
                    imap_host: "imap.example.com".into(),
                    imap_port: 993,
                    username: "me".into(),
                    password: MockConnector::PASSWORD.into(),
                    use_ssl: true,
                },
                &cipher,
            )
            .await
            .unwrap()
            .id;

        let fetcher = MailboxFetcher::new(
            accounts,
            messages.clone(),
            cipher,
            Arc::new(connector.clone()),
        );
        Fixture {
            db,
            fetcher,
            messages,
            connector,
            account,
        }
    }

    mod window_tests {
        use super::*;

        #[test]
        fn empty_mailbox_has_no_window() {
            assert_eq!(BatchWindow::latest(0, BATCH_SIZE), None);
        }

        #[test]
        fn small_mailbox_is_fetched_whole() {
            let window = BatchWindow::latest(7, BATCH_SIZE).unwrap();
            assert_eq!(window, BatchWindow { first: 1, last: 7 });
            assert_eq!(window.len(), 7);
        }

        #[test]
        fn large_mailbox_keeps_the_latest_window() {
            let window = BatchWindow::latest(125, BATCH_SIZE).unwrap();
            assert_eq!(window.to_string(), "106:125");
            assert_eq!(window.len(), BATCH_SIZE);
            assert_eq!(window.sequence_numbers().count(), 20);
        }

        #[test]
        fn exact_batch() {
            let window = BatchWindow::latest(20, BATCH_SIZE).unwrap();
            assert_eq!(window, BatchWindow { first: 1, last: 20 });
        }
    }

    #[tokio::test]
    async fn test_unknown_account_is_not_found() {
        let f = fixture(MockConnector::with_messages(3)).await;
        let err = f.fetcher.fetch_emails(AccountId::new(999)).await.unwrap_err();
        assert!(matches!(err, Error::AccountNotFound(_)));
        assert_eq!(f.connector.connects(), 0);
    }

    #[tokio::test]
    async fn test_small_mailbox_stores_every_message() {
        let f = fixture(MockConnector::with_messages(5)).await;
        let stored = f.fetcher.fetch_emails(f.account).await.unwrap();

        assert_eq!(stored, 5);
        assert_eq!(f.messages.count_for_account(f.account).await.unwrap(), 5);
        assert_eq!(f.connector.logouts(), 1);
    }

    #[tokio::test]
    async fn test_large_mailbox_stores_latest_batch() {
        let f = fixture(MockConnector::with_messages(45)).await;
        let stored = f.fetcher.fetch_emails(f.account).await.unwrap();

        assert_eq!(stored, 20);
        assert_eq!(f.connector.fetched(), (26..=45).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_empty_mailbox() {
        let f = fixture(MockConnector::with_messages(0)).await;
        assert_eq!(f.fetcher.fetch_emails(f.account).await.unwrap(), 0);
        assert_eq!(f.connector.logouts(), 1);
    }

    #[tokio::test]
    async fn test_per_message_failure_is_skipped() {
        let connector = MockConnector::with_messages(6);
        connector.fail_fetch(3);
        let f = fixture(connector).await;

        let stored = f.fetcher.fetch_emails(f.account).await.unwrap();
        assert_eq!(stored, 5);
        assert_eq!(f.connector.fetched(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(f.connector.logouts(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_is_skipped() {
        let f = fixture(MockConnector::with_messages(5)).await;
        sqlx::query(
            "CREATE TRIGGER reject_msg2 BEFORE INSERT ON emails
             WHEN NEW.message_id = '<msg2@example.com>'
             BEGIN SELECT RAISE(ABORT, 'disk full'); END",
        )
        .execute(f.db.pool())
        .await
        .unwrap();

        let stored = f.fetcher.fetch_emails(f.account).await.unwrap();
        assert_eq!(stored, 4);
        assert_eq!(f.messages.count_for_account(f.account).await.unwrap(), 4);
        assert_eq!(f.connector.fetched(), vec![1, 2, 3, 4, 5]);
        assert_eq!(f.connector.logouts(), 1);
    }

    #[tokio::test]
    async fn test_shared_message_id_in_batch_keeps_both() {
        let f = fixture(MockConnector::with_messages(0)).await;
        for seq in 1..=3 {
            let mut message = sample_message(seq);
            if seq < 3 {
                message.message_id = Some("<same@example.com>".into());
            }
            f.connector.push_message(message);
        }

        assert_eq!(f.fetcher.fetch_emails(f.account).await.unwrap(), 3);
        assert_eq!(f.fetcher.fetch_emails(f.account).await.unwrap(), 3);

        let stored = f.messages.list(f.account, &Folder::inbox()).await.unwrap();
        let mut ids: Vec<_> = stored.iter().map(|m| m.message_id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, ["<msg3@example.com>", "<same@example.com>", "uid:1002"]);
    }

    #[tokio::test]
    async fn test_revoked_credentials_fail_without_storing() {
        let f = fixture(MockConnector::with_messages(4)).await;
        f.connector.revoke();

        let err = f.fetcher.fetch_emails(f.account).await.unwrap_err();
        assert!(matches!(err, Error::Mail(_)));
        assert_eq!(f.messages.count_for_account(f.account).await.unwrap(), 0);
        assert_eq!(f.connector.logouts(), 0);
    }

    #[tokio::test]
    async fn test_select_failure_still_logs_out() {
        let connector = MockConnector::with_messages(4);
        connector.fail_select();
        let f = fixture(connector).await;

        assert!(f.fetcher.fetch_emails(f.account).await.is_err());
        assert_eq!(f.connector.logouts(), 1);
    }

    #[tokio::test]
    async fn test_refetch_does_not_duplicate() {
        let f = fixture(MockConnector::with_messages(3)).await;
        assert_eq!(f.fetcher.fetch_emails(f.account).await.unwrap(), 3);
        assert_eq!(f.fetcher.fetch_emails(f.account).await.unwrap(), 3);
        assert_eq!(f.messages.count_for_account(f.account).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_stored_fields() {
        let f = fixture(MockConnector::with_messages(0)).await;
        let mut message = sample_message(1);
        message.message_id = None;
        message.uid = Some(77);
        message.source = b"\r\n<body><h1>Quarterly</h1> numbers</body>".to_vec();
        f.connector.push_message(message);

        f.fetcher.fetch_emails(f.account).await.unwrap();

        let stored = f.messages.list(f.account, &Folder::inbox()).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].message_id, "uid:77");
        assert_eq!(stored[0].content, "Quarterly numbers");
        assert_eq!(stored[0].from_address, "sender1@example.com");
        assert_eq!(stored[0].folder, Folder::inbox());
    }
}
