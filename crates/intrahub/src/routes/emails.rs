use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use intrahub_core::{AccountId, Error, Folder, IngestedMessage};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::session::CallerSession;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FetchRequest {
    #[serde(rename = "accountId")]
    account_id: Option<AccountId>,
}

#[derive(Debug, Serialize)]
pub struct FetchResponse {
    success: bool,
    count: usize,
}

/// Pull the latest inbox batch for an account into the message store.
pub async fn fetch_emails(
    State(state): State<Arc<AppState>>,
    body: Result<Json<FetchRequest>, JsonRejection>,
) -> ApiResult<Json<FetchResponse>> {
    let mail = state.mail()?;
    let Json(request) = body?;
    let account_id = request
        .account_id
        .ok_or_else(|| ApiError::bad_request("Account ID is required"))?;

    match mail.fetcher.fetch_emails(account_id).await {
        Ok(count) => Ok(Json(FetchResponse {
            success: true,
            count,
        })),
        Err(Error::AccountNotFound(_)) => Err(ApiError::not_found("Account not found")),
        // Upstream and storage failures alike surface verbatim as 500.
        Err(e) => Err(ApiError::internal(e.to_string())),
    }
}

#[derive(Debug, Deserialize)]
pub struct ListRequest {
    #[serde(rename = "accountId")]
    account_id: Option<AccountId>,
    folder: Option<String>,
}

/// Stored messages of one account folder, newest first.
///
/// Only the owner or an elevated user may read them; anyone else gets the
/// same 404 as for a missing account.
pub async fn list_emails(
    State(state): State<Arc<AppState>>,
    caller: CallerSession,
    body: Result<Json<ListRequest>, JsonRejection>,
) -> ApiResult<Json<Vec<IngestedMessage>>> {
    let Json(request) = body?;
    let account_id = request
        .account_id
        .ok_or_else(|| ApiError::bad_request("Account ID is required"))?;

    let account = state
        .accounts
        .get(account_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Account not found"))?;

    if !account.is_owned_by(caller.user()) && !state.roles.is_super_admin(caller.user()).await {
        return Err(ApiError::not_found("Account not found"));
    }

    let folder = request
        .folder
        .as_deref()
        .map_or_else(Folder::inbox, Folder::new);
    let messages = state.messages.list(account_id, &folder).await?;

    info!(user = %caller.user(), account = %account_id, folder = %folder, count = messages.len(), "Listed emails");
    Ok(Json(messages))
}
