//! # intrahub
//!
//! HTTP edge of the intrahub mailbox integration.
//!
//! Exposes the account registry, mailbox fetcher and role checker from
//! `intrahub-core` as JSON functions behind permissive CORS, and carries the
//! configuration the `intrahub` binary starts from.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod cors;
pub mod error;
mod routes;
pub mod session;
pub mod state;

pub use config::{Config, ConfigError};
pub use error::{ApiError, ApiResult};
pub use routes::router;
pub use session::CallerSession;
pub use state::{AppState, MailServices};
