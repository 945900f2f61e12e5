//! Purchases API endpoints.

use api_types::purchase::{
    ExpensePosted, PurchaseExpense, PurchaseLineNew, PurchaseLineUpdate, PurchaseLineView,
    PurchaseNew, PurchaseUpdate, PurchaseView,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{EngineError, Money, NewPurchase, NewPurchaseLine, Purchase, PurchaseLine, Quantity};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, stock::map_place, user, vehicles::account_selection};

fn map_line(line: PurchaseLineNew) -> NewPurchaseLine {
    NewPurchaseLine {
        name: line.name,
        brand: line.brand,
        quantity: Quantity::from_milli(line.quantity_milli),
        unit: line.unit,
        unit_price: Money::new(line.unit_price_minor),
        put_away: line.put_away.map(map_place),
    }
}

fn line_view(line: PurchaseLine) -> PurchaseLineView {
    PurchaseLineView {
        id: line.id,
        name: line.name,
        brand: line.brand,
        quantity_milli: line.quantity.milli(),
        unit: line.unit,
        unit_price_minor: line.unit_price.minor(),
        added_to_stock: line.added_to_stock,
        stock_id: line.stock_item.map(|handle| handle.0),
    }
}

fn purchase_view(purchase: Purchase) -> PurchaseView {
    PurchaseView {
        id: purchase.id,
        store: purchase.store,
        city: purchase.city,
        purchased_on: purchase.purchased_on,
        total_minor: purchase.total.minor(),
        itemized: purchase.itemized,
        ledger_entry_id: purchase.ledger_entry_id,
        lines: purchase.lines.into_iter().map(line_view).collect(),
    }
}

pub async fn purchase_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<PurchaseNew>,
) -> Result<(StatusCode, Json<PurchaseView>), ServerError> {
    let lines: Vec<NewPurchaseLine> = payload.lines.into_iter().map(map_line).collect();
    let cmd = match payload.declared_total_minor {
        Some(_) if !lines.is_empty() => {
            return Err(ServerError::Generic(
                "provide either lines or declared_total_minor".to_string(),
            ));
        }
        Some(total) => NewPurchase::declared(
            user.username,
            payload.store,
            payload.purchased_on,
            Money::new(total),
        ),
        None => NewPurchase::itemized(user.username, payload.store, payload.purchased_on, lines),
    };
    let mut cmd = cmd.account(account_selection(payload.account_id));
    cmd.city = payload.city;

    let purchase = state.engine.new_purchase(cmd).await?;
    Ok((StatusCode::CREATED, Json(purchase_view(purchase))))
}

pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PurchaseView>, ServerError> {
    let purchase = state.engine.purchase(id).await?;
    if purchase.user_id != user.username {
        return Err(ServerError::Engine(EngineError::Forbidden(format!(
            "purchase {id} belongs to another user"
        ))));
    }
    Ok(Json(purchase_view(purchase)))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PurchaseUpdate>,
) -> Result<Json<PurchaseView>, ServerError> {
    let update = engine::PurchaseUpdate {
        store: payload.store,
        city: payload.city,
        purchased_on: payload.purchased_on,
        declared_total: payload.declared_total_minor.map(Money::new),
    };
    let purchase = state
        .engine
        .update_purchase(id, update, &user.username)
        .await?;
    Ok(Json(purchase_view(purchase)))
}

pub async fn delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_purchase(id, &user.username).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn line_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PurchaseLineNew>,
) -> Result<(StatusCode, Json<PurchaseLineView>), ServerError> {
    let line = state
        .engine
        .add_purchase_line(id, map_line(payload), &user.username)
        .await?;
    Ok((StatusCode::CREATED, Json(line_view(line))))
}

pub async fn line_update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(line_id): Path<Uuid>,
    Json(payload): Json<PurchaseLineUpdate>,
) -> Result<Json<PurchaseLineView>, ServerError> {
    let update = engine::PurchaseLineUpdate {
        name: payload.name,
        brand: payload.brand,
        quantity: payload.quantity_milli.map(Quantity::from_milli),
        unit: payload.unit,
        unit_price: payload.unit_price_minor.map(Money::new),
    };
    let line = state
        .engine
        .update_purchase_line(line_id, update, &user.username)
        .await?;
    Ok(Json(line_view(line)))
}

pub async fn line_delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(line_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_purchase_line(line_id, &user.username)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Charges a purchase that has no ledger entry to the given account.
pub async fn expense_post(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PurchaseExpense>,
) -> Result<(StatusCode, Json<ExpensePosted>), ServerError> {
    let entry_id = state
        .engine
        .post_purchase_expense(id, payload.account_id, &user.username)
        .await?;
    Ok((StatusCode::CREATED, Json(ExpensePosted { entry_id })))
}

pub async fn expense_revert(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .revert_purchase_expense(id, &user.username)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
