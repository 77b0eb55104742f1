use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use intrahub_core::{AccountDraft, EmailAccount, Error};
use tracing::{error, info};

use crate::error::{ApiError, ApiResult};
use crate::session::CallerSession;
use crate::state::AppState;

/// Register an IMAP account for the caller once the server accepts the
/// credentials.
pub async fn add_email_account(
    State(state): State<Arc<AppState>>,
    caller: CallerSession,
    body: Result<Json<AccountDraft>, JsonRejection>,
) -> ApiResult<Json<EmailAccount>> {
    let mail = state.mail()?;
    let Json(draft) = body?;

    match mail.registry.add_account(caller.user(), &draft).await {
        Ok(account) => Ok(Json(account)),
        Err(Error::Mail(e)) => Err(ApiError::bad_request(format!(
            "Failed to verify IMAP credentials: {e}"
        ))),
        Err(e @ Error::Validation(_)) => Err(e.into()),
        Err(e) => {
            error!(user = %caller.user(), error = %e, "Failed to add email account");
            Err(e.into())
        }
    }
}

/// The caller's accounts, without secrets.
pub async fn list_email_accounts(
    State(state): State<Arc<AppState>>,
    caller: CallerSession,
) -> ApiResult<Json<Vec<EmailAccount>>> {
    let accounts = state.accounts.list_for_user(caller.user()).await?;
    info!(user = %caller.user(), count = accounts.len(), "Listed email accounts");
    Ok(Json(accounts))
}
