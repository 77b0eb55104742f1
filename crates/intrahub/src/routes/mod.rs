//! HTTP function routes.
//!
//! Every function is a `POST` under `/functions/` taking and returning JSON.
//! Preflight `OPTIONS` requests are answered by the CORS middleware.

mod accounts;
mod emails;
mod roles;

use std::sync::Arc;

use axum::routing::post;
use axum::{Router, middleware};

use crate::cors::cors;
use crate::state::AppState;

/// Build the router for all functions.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/functions/add-email-account", post(accounts::add_email_account))
        .route("/functions/list-email-accounts", post(accounts::list_email_accounts))
        .route("/functions/fetch-emails", post(emails::fetch_emails))
        .route("/functions/list-emails", post(emails::list_emails))
        .route("/functions/is-super-admin", post(roles::is_super_admin))
        .layer(middleware::from_fn(cors))
        .with_state(state)
}
