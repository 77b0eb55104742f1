//! Account storage repository.

use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::SqlitePool;
use tracing::debug;

use super::credentials::CredentialCipher;
use super::model::{AccountId, EmailAccount, NewAccount, UserId};
use crate::db::parse_timestamp;
use crate::{Database, Result};

/// Repository for account storage and retrieval.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    /// Create a repository on the shared database.
    ///
    /// Creates the table if it doesn't exist.
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
            CREATE TABLE IF NOT EXISTS email_accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                email_address TEXT NOT NULL,
                imap_host TEXT NOT NULL,
                imap_port INTEGER NOT NULL,
                username TEXT NOT NULL,
                encrypted_password TEXT NOT NULL,
                use_ssl INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_email_accounts_user
            ON email_accounts(user_id)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a new account owned by `user`.
    ///
    /// The password is sealed with `cipher` before it reaches the database.
    ///
    /// # Errors
    ///
    /// Returns an error if encryption or the insert fails.
    pub async fn create(
        &self,
        user: &UserId,
        account: &NewAccount,
        cipher: &CredentialCipher,
    ) -> Result<EmailAccount> {
        let encrypted_password = cipher.encrypt(&account.password)?;
        let created_at = Utc::now();

        let result = sqlx::query(
            r"
            INSERT INTO email_accounts (
                user_id, email_address, imap_host, imap_port,
                username, encrypted_password, use_ssl, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(user.as_str())
        .bind(&account.email_address)
        .bind(&account.imap_host)
        .bind(i64::from(account.imap_port))
        .bind(&account.username)
        .bind(&encrypted_password)
        .bind(account.use_ssl)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let id = AccountId::new(result.last_insert_rowid());
        debug!(account = %id, user = %user, "Stored email account");

        Ok(EmailAccount {
            id,
            user_id: user.clone(),
            email_address: account.email_address.clone(),
            imap_host: account.imap_host.clone(),
            imap_port: account.imap_port,
            username: account.username.clone(),
            encrypted_password,
            use_ssl: account.use_ssl,
            created_at,
        })
    }

    /// Get account by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: AccountId) -> Result<Option<EmailAccount>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, email_address, imap_host, imap_port,
                   username, encrypted_password, use_ssl, created_at
            FROM email_accounts
            WHERE id = ?
            ",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().and_then(row_to_account))
    }

    /// Get all accounts owned by a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_user(&self, user: &UserId) -> Result<Vec<EmailAccount>> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, email_address, imap_host, imap_port,
                   username, encrypted_password, use_ssl, created_at
            FROM email_accounts
            WHERE user_id = ?
            ORDER BY id ASC
            ",
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(row_to_account).collect())
    }

    /// Count all stored accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM email_accounts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Convert a database row to an account, skipping rows with corrupt values.
fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Option<EmailAccount> {
    let created_at = parse_timestamp(row.get("created_at"))?;
    let imap_port = u16::try_from(row.get::<i64, _>("imap_port")).ok()?;

    Some(EmailAccount {
        id: AccountId::new(row.get("id")),
        user_id: UserId::new(row.get::<String, _>("user_id")),
        email_address: row.get("email_address"),
        imap_host: row.get("imap_host"),
        imap_port,
        username: row.get("username"),
        encrypted_password: row.get("encrypted_password"),
        use_ssl: row.get::<bool, _>("use_ssl"),
        created_at,
    })
}
