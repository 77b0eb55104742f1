//! Message storage repository.

use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::SqlitePool;

use super::model::{Folder, IngestedMessage, MessageId, NewMessage};
use crate::db::parse_timestamp;
use crate::{AccountId, Database, Result};

/// Repository for ingested messages.
#[derive(Debug, Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    /// Create a repository on the shared database.
    ///
    /// Creates the table and indexes if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation fails.
    pub async fn new(db: &Database) -> Result<Self> {
        let repo = Self {
            pool: db.pool().clone(),
        };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS emails (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL REFERENCES email_accounts(id),
                message_id TEXT NOT NULL,
                from_name TEXT NOT NULL DEFAULT '',
                from_address TEXT NOT NULL DEFAULT '',
                subject TEXT NOT NULL DEFAULT '',
                content TEXT NOT NULL DEFAULT '',
                received_at TEXT NOT NULL,
                folder TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(account_id, message_id)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_emails_folder
            ON emails(account_id, folder)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Store a message, refreshing the existing row if the account already
    /// holds one with the same provider message id.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails, including when the account
    /// does not exist.
    pub async fn upsert(&self, message: &NewMessage) -> Result<MessageId> {
        let id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO emails
                (account_id, message_id, from_name, from_address, subject,
                 content, received_at, folder, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(account_id, message_id) DO UPDATE SET
                from_name = excluded.from_name,
                from_address = excluded.from_address,
                subject = excluded.subject,
                content = excluded.content,
                received_at = excluded.received_at,
                folder = excluded.folder
            RETURNING id
            ",
        )
        .bind(message.account_id.0)
        .bind(&message.message_id)
        .bind(&message.from_name)
        .bind(&message.from_address)
        .bind(&message.subject)
        .bind(&message.content)
        .bind(message.received_at.to_rfc3339())
        .bind(message.folder.as_str())
        .bind(Utc::now().to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        Ok(MessageId(id))
    }

    /// List messages of an account in a folder, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, account_id: AccountId, folder: &Folder) -> Result<Vec<IngestedMessage>> {
        let rows = sqlx::query(
            r"
            SELECT id, account_id, message_id, from_name, from_address, subject,
                   content, received_at, folder, created_at
            FROM emails
            WHERE account_id = ? AND folder = ?
            ORDER BY received_at DESC, id DESC
            ",
        )
        .bind(account_id.0)
        .bind(folder.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(row_to_message).collect())
    }

    /// Count every stored message of an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count_for_account(&self, account_id: AccountId) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM emails WHERE account_id = ?")
            .bind(account_id.0)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Option<IngestedMessage> {
    Some(IngestedMessage {
        id: MessageId(row.get("id")),
        account_id: AccountId::new(row.get("account_id")),
        message_id: row.get("message_id"),
        from_name: row.get("from_name"),
        from_address: row.get("from_address"),
        subject: row.get("subject"),
        content: row.get("content"),
        received_at: parse_timestamp(row.get("received_at"))?,
        folder: Folder::new(row.get("folder")),
        created_at: parse_timestamp(row.get("created_at"))?,
    })
}
