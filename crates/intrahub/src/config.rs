//! Server configuration.
//!
//! Settings come from a TOML file (by default `<config_dir>/intrahub/config.toml`)
//! with `INTRAHUB_*` environment variables taking precedence. A missing default
//! file means every setting takes its default, except the secret key which has
//! none. Without it the server runs unconfigured and refuses the functions
//! that need it.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default listen address.
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8787";

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "intrahub=info,intrahub_core=info";

/// Default session lifetime in hours.
pub const DEFAULT_SESSION_TTL_HOURS: u32 = 24;

const ENV_LISTEN: &str = "INTRAHUB_LISTEN";
const ENV_DATABASE: &str = "INTRAHUB_DATABASE";
const ENV_SECRET_KEY: &str = "INTRAHUB_SECRET_KEY";

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        /// Path that was parsed.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },

    /// An environment variable holds an unusable value.
    #[error("Invalid value for {var}: {value}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },

    /// No secret key was configured.
    #[error("Missing server configuration: secret_key is not set (config file or INTRAHUB_SECRET_KEY)")]
    MissingSecret,
}

/// On-disk shape of the configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Socket address to bind.
    pub listen: Option<SocketAddr>,
    /// SQLite database path.
    pub database: Option<PathBuf>,
    /// Passphrase the credential encryption key is derived from.
    pub secret_key: Option<String>,
    /// Fallback `tracing` filter.
    pub log_filter: Option<String>,
    /// Lifetime of issued sessions.
    pub session_ttl_hours: Option<u32>,
}

/// Resolved configuration.
#[derive(Clone)]
pub struct Config {
    /// Socket address to bind.
    pub listen: SocketAddr,
    /// SQLite database path.
    pub database: PathBuf,
    /// Passphrase the credential encryption key is derived from.
    pub secret_key: Option<String>,
    /// Fallback `tracing` filter.
    pub log_filter: String,
    /// Lifetime of issued sessions.
    pub session_ttl_hours: u32,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("listen", &self.listen)
            .field("database", &self.database)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "[REDACTED]"))
            .field("log_filter", &self.log_filter)
            .field("session_ttl_hours", &self.session_ttl_hours)
            .finish()
    }
}

impl Config {
    /// Load configuration from `path` (or the default location) and the
    /// process environment.
    ///
    /// An explicit path must exist; the default path may be absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or an
    /// environment override is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => read_file(path)?,
            None => {
                let path = default_config_path();
                if path.exists() {
                    read_file(&path)?
                } else {
                    FileConfig::default()
                }
            }
        };
        Self::resolve(file, |var| std::env::var(var).ok())
    }

    /// Merge a parsed file with environment overrides supplied by `env`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] if `INTRAHUB_LISTEN` is not a
    /// socket address.
    pub fn resolve(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let listen = match env(ENV_LISTEN) {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_LISTEN,
                value,
            })?,
            None => file.listen.unwrap_or_else(default_listen),
        };

        let database = env(ENV_DATABASE)
            .map(PathBuf::from)
            .or(file.database)
            .unwrap_or_else(default_database_path);

        let secret_key = env(ENV_SECRET_KEY)
            .or(file.secret_key)
            .filter(|key| !key.trim().is_empty());

        Ok(Self {
            listen,
            database,
            secret_key,
            log_filter: file
                .log_filter
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            session_ttl_hours: file
                .session_ttl_hours
                .unwrap_or(DEFAULT_SESSION_TTL_HOURS),
        })
    }

    /// The secret key, required by the credential-backed functions.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSecret`] when none is configured.
    pub fn require_secret(&self) -> Result<&str, ConfigError> {
        self.secret_key.as_deref().ok_or(ConfigError::MissingSecret)
    }
}

fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8787))
}

/// `<config_dir>/intrahub/config.toml`.
#[must_use]
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("intrahub")
        .join("config.toml")
}

/// `<data_dir>/intrahub/intrahub.db`.
#[must_use]
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("intrahub")
        .join("intrahub.db")
}
