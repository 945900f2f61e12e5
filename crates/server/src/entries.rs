//! Ledger entries API endpoints.
//!
//! Only manual entries can be changed here; synchronized ones follow their
//! source event and come back as `409`.

use api_types::entry::{
    EntryCreated, EntryKind as ApiKind, EntryList, EntryListResponse, EntryNew,
    EntryOrigin as ApiOrigin, EntrySource, EntryUpdate, EntryView,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{EntryKind, EntryOrigin, LedgerEntry, LedgerListFilter, Money, NewEntry};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

fn map_kind(kind: ApiKind) -> EntryKind {
    match kind {
        ApiKind::Income => EntryKind::Income,
        ApiKind::Expense => EntryKind::Expense,
    }
}

fn map_origin(origin: ApiOrigin) -> EntryOrigin {
    match origin {
        ApiOrigin::Manual => EntryOrigin::Manual,
        ApiOrigin::Synchronized => EntryOrigin::Synchronized,
    }
}

fn entry_view(entry: LedgerEntry) -> EntryView {
    EntryView {
        id: entry.id,
        account_id: entry.account_id,
        kind: match entry.kind {
            EntryKind::Income => ApiKind::Income,
            EntryKind::Expense => ApiKind::Expense,
        },
        amount_minor: entry.amount.minor(),
        occurred_on: entry.occurred_on,
        name: entry.name,
        note: entry.note,
        origin: match entry.origin {
            EntryOrigin::Manual => ApiOrigin::Manual,
            EntryOrigin::Synchronized => ApiOrigin::Synchronized,
        },
        source: entry.source.map(|source| EntrySource {
            kind: source.kind_str().to_string(),
            id: source.id(),
        }),
    }
}

pub async fn entry_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<EntryNew>,
) -> Result<(StatusCode, Json<EntryCreated>), ServerError> {
    let mut cmd = NewEntry::new(
        payload.account_id,
        user.username,
        map_kind(payload.kind),
        Money::new(payload.amount_minor),
        payload.occurred_on,
        payload.name,
    );
    cmd.note = payload.note;
    cmd.category = payload.category;

    let id = state.engine.new_entry(cmd).await?;
    Ok((StatusCode::CREATED, Json(EntryCreated { id })))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EntryUpdate>,
) -> Result<Json<EntryView>, ServerError> {
    let update = engine::EntryUpdate {
        amount: payload.amount_minor.map(Money::new),
        name: payload.name,
        note: payload.note,
        occurred_on: payload.occurred_on,
    };
    let entry = state.engine.update_entry(id, update, &user.username).await?;
    Ok(Json(entry_view(entry)))
}

pub async fn delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_entry(id, &user.username).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Lists the caller's entries, newest first.
pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<EntryList>,
) -> Result<Json<EntryListResponse>, ServerError> {
    let filter = LedgerListFilter {
        account_id: payload.account_id,
        user_id: Some(user.username),
        kinds: payload
            .kinds
            .map(|kinds| kinds.into_iter().map(map_kind).collect()),
        origin: payload.origin.map(map_origin),
        from: payload.from,
        to: payload.to,
    };
    let entries = state
        .engine
        .list_entries(&filter, payload.limit.unwrap_or(50))
        .await?;
    Ok(Json(EntryListResponse {
        entries: entries.into_iter().map(entry_view).collect(),
    }))
}
