//! Accounts API endpoints.

use api_types::account::{AccountCreated, AccountNew, Balance};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{Account, EngineError, Money, NewAccount};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

/// Shared accounts are visible to everyone, private ones to their owner.
fn ensure_visible(account: &Account, user: &user::Model) -> Result<(), ServerError> {
    match account.user_id.as_deref() {
        Some(owner) if owner != user.username => Err(ServerError::Engine(EngineError::Forbidden(
            format!("account {} belongs to another user", account.name),
        ))),
        _ => Ok(()),
    }
}

pub async fn account_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<AccountNew>,
) -> Result<(StatusCode, Json<AccountCreated>), ServerError> {
    let mut cmd = NewAccount::new(payload.name)
        .starting_balance(Money::new(payload.starting_balance_minor))
        .rejects_negative(payload.rejects_negative);
    if !payload.shared {
        cmd = cmd.owner(user.username);
    }
    let id = state.engine.new_account(cmd).await?;
    Ok((StatusCode::CREATED, Json(AccountCreated { id })))
}

pub async fn balance(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Balance>, ServerError> {
    let account = state.engine.account(id).await?;
    ensure_visible(&account, &user)?;
    let balance = state.engine.balance(id).await?;
    Ok(Json(Balance {
        account_id: account.id,
        name: account.name,
        balance_minor: balance.minor(),
    }))
}

pub async fn delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    let account = state.engine.account(id).await?;
    ensure_visible(&account, &user)?;
    state.engine.delete_account(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
