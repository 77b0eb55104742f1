//! `intrahub` - mailbox integration service
//!
//! Serves the HTTP functions and provides admin subcommands for role
//! assignment and session issuance.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use intrahub::{AppState, Config};
use intrahub_core::{
    CredentialCipher, Database, ImapConnector, RoleRepository, SessionRepository, UserId,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "intrahub")]
#[command(about = "Mailbox registration, ingestion and role checks over HTTP", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,

    /// Assign a role to a user
    GrantRole {
        #[arg(long)]
        user: String,

        #[arg(long)]
        role: String,
    },

    /// Issue a bearer session token for a user
    IssueSession {
        #[arg(long)]
        user: String,

        /// Lifetime in hours (defaults to the configured session TTL)
        #[arg(long)]
        ttl_hours: Option<u32>,
    },

    /// Revoke a session token
    RevokeSession {
        #[arg(long)]
        token: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("Configuration error")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config).await,
        Command::GrantRole { user, role } => {
            let db = open_database(&config.database).await?;
            let roles = RoleRepository::new(&db).await?;
            roles.assign(&UserId::new(&user), &role).await?;
            println!("Granted role {role} to {user}");
            Ok(())
        }
        Command::IssueSession { user, ttl_hours } => {
            let db = open_database(&config.database).await?;
            let sessions = SessionRepository::new(&db).await?;
            let ttl = chrono::Duration::hours(i64::from(
                ttl_hours.unwrap_or(config.session_ttl_hours),
            ));
            let session = sessions.issue(&UserId::new(&user), ttl).await?;
            println!("{}", session.token);
            eprintln!("Expires at {}", session.expires_at.to_rfc3339());
            Ok(())
        }
        Command::RevokeSession { token } => {
            let db = open_database(&config.database).await?;
            let sessions = SessionRepository::new(&db).await?;
            if sessions.revoke(&token).await? {
                println!("Session revoked");
            } else {
                println!("No such session");
            }
            Ok(())
        }
    }
}

async fn serve(config: &Config) -> Result<()> {
    let cipher = match config.require_secret() {
        Ok(secret) => Some(CredentialCipher::from_passphrase(secret)?),
        Err(e) => {
            warn!(error = %e, "Starting unconfigured; account and fetch functions will fail");
            None
        }
    };
    let db = open_database(&config.database).await?;

    let state = Arc::new(AppState::new(&db, cipher, Arc::new(ImapConnector)).await?);
    let purged = state.sessions.purge_expired().await?;
    if purged > 0 {
        info!(purged, "Removed expired sessions");
    }

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen))?;
    info!(addr = %config.listen, database = %config.database.display(), "Starting intrahub");

    axum::serve(listener, intrahub::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Stopped intrahub");
    Ok(())
}

async fn open_database(path: &Path) -> Result<Database> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let path = path
        .to_str()
        .with_context(|| format!("Database path is not valid UTF-8: {}", path.display()))?;
    Ok(Database::connect(path).await?)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
}
