//! Caller sessions.
//!
//! A session binds an opaque bearer token to a user until it expires. The HTTP
//! layer resolves the token once per request and passes the resulting
//! [`Session`] down explicitly.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use sqlx::Row;
use sqlx::sqlite::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::db::parse_timestamp;
use crate::{Database, Result, UserId};

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Bearer token.
    pub token: String,
    /// Authenticated user.
    pub user_id: UserId,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Repository for bearer-token sessions.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    /// Create a repository on the shared database.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation fails.
    pub async fn new(db: &Database) -> Result<Self> {
        let repo = Self {
            pool: db.pool().clone(),
        };
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                expires_at TEXT NOT NULL
            )
            ",
        )
        .execute(&repo.pool)
        .await?;
        Ok(repo)
    }

    /// Issue a new session for a user, valid for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn issue(&self, user: &UserId, ttl: Duration) -> Result<Session> {
        let session = Session {
            token: Uuid::new_v4().simple().to_string(),
            user_id: user.clone(),
            expires_at: Utc::now() + ttl,
        };

        sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(&session.token)
            .bind(session.user_id.as_str())
            .bind(timestamp(session.expires_at))
            .execute(&self.pool)
            .await?;

        debug!(user = %user, expires_at = %session.expires_at, "Issued session");
        Ok(session)
    }

    /// Resolve a bearer token. Unknown and expired tokens resolve to `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn resolve(&self, token: &str) -> Result<Option<Session>> {
        let row = sqlx::query("SELECT token, user_id, expires_at FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        let session = row.and_then(|row| {
            Some(Session {
                token: row.get("token"),
                user_id: UserId::new(row.get::<String, _>("user_id")),
                expires_at: parse_timestamp(row.get("expires_at"))?,
            })
        });

        Ok(session.filter(|s| !s.is_expired_at(Utc::now())))
    }

    /// Revoke a token. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn revoke(&self, token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every expired session. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(timestamp(Utc::now()))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Fixed-width UTC timestamps so expiry comparisons can happen in SQL.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}
