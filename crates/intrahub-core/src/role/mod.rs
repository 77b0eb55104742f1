//! Role assignments and the elevated-role check.
//!
//! The check is fail-closed: a lookup that cannot confirm elevation is
//! reported as [`RoleCheck::LookupFailed`] and never grants it.
//!
//! # Example
//!
//! ```ignore
//! use intrahub_core::{RoleCheck, RoleRepository, UserId};
//!
//! match roles.check(&UserId::new("user-1")).await {
//!     RoleCheck::Elevated => { /* allow */ }
//!     RoleCheck::NotElevated | RoleCheck::LookupFailed => { /* deny */ }
//! }
//! ```

use sqlx::sqlite::SqlitePool;
use tracing::{debug, warn};

use crate::{Database, Result, UserId};

/// The single privileged role label.
pub const ELEVATED_ROLE: &str = "super_admin";

/// Outcome of an elevated-role check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleCheck {
    /// The user's role is exactly [`ELEVATED_ROLE`].
    Elevated,
    /// The user has no role, or a different one.
    NotElevated,
    /// The lookup errored; treated as not elevated.
    LookupFailed,
}

impl RoleCheck {
    /// Classify a stored role label.
    #[must_use]
    pub fn from_role(role: Option<&str>) -> Self {
        match role {
            Some(ELEVATED_ROLE) => Self::Elevated,
            _ => Self::NotElevated,
        }
    }

    /// Collapse to a boolean. Only [`RoleCheck::Elevated`] grants.
    #[must_use]
    pub const fn is_elevated(self) -> bool {
        matches!(self, Self::Elevated)
    }
}

/// Repository for role assignments.
#[derive(Debug, Clone)]
pub struct RoleRepository {
    pool: SqlitePool,
}

impl RoleRepository {
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
            CREATE TABLE IF NOT EXISTS user_roles (
                user_id TEXT PRIMARY KEY,
                role TEXT NOT NULL
            )
            ",
        )
        .execute(&repo.pool)
        .await?;
        Ok(repo)
    }

    /// Look up the role label assigned to a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn role_of(&self, user: &UserId) -> Result<Option<String>> {
        let role = sqlx::query_scalar("SELECT role FROM user_roles WHERE user_id = ?")
            .bind(user.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(role)
    }

    /// Assign (or replace) a user's role.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn assign(&self, user: &UserId, role: &str) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO user_roles (user_id, role) VALUES (?, ?)
            ON CONFLICT(user_id) DO UPDATE SET role = excluded.role
            ",
        )
        .bind(user.as_str())
        .bind(role)
        .execute(&self.pool)
        .await?;
        debug!(user = %user, role, "Assigned role");
        Ok(())
    }

    /// Check whether a user holds the elevated role.
    ///
    /// Lookup errors are logged and reported as [`RoleCheck::LookupFailed`].
    pub async fn check(&self, user: &UserId) -> RoleCheck {
        match self.role_of(user).await {
            Ok(role) => RoleCheck::from_role(role.as_deref()),
            Err(e) => {
                warn!(user = %user, error = %e, "Role lookup failed; denying elevation");
                RoleCheck::LookupFailed
            }
        }
    }

    /// Whether a user holds the elevated role. Never errors; fails closed.
    pub async fn is_super_admin(&self, user: &UserId) -> bool {
        self.check(user).await.is_elevated()
    }
}
