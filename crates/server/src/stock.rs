//! Stock API endpoints.

use api_types::stock::{
    HistoryEntryView, HistoryList, HistoryListResponse, LowStockQuery, Movement as ApiMovement,
    StockAdjust, StockAdjusted, StockCreated, StockKind as ApiKind, StockListResponse, StockNew,
    StockPlace as ApiPlace, StockUpdate, StockView,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{FixedOffset, Utc};
use engine::{
    HistoryEntry, HistoryFilter, Money, Movement, NewStockItem, Quantity, StockHandle, StockItem,
    StockItemUpdate, StockKind, StockPlace,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

pub(crate) fn map_place(place: ApiPlace) -> StockPlace {
    match place {
        ApiPlace::Household { room, spot } => StockPlace::Household { room, spot },
        ApiPlace::Pet { pet } => StockPlace::Pet { pet },
        ApiPlace::Personal { owner } => StockPlace::Personal { owner },
    }
}

fn place_view(place: StockPlace) -> ApiPlace {
    match place {
        StockPlace::Household { room, spot } => ApiPlace::Household { room, spot },
        StockPlace::Pet { pet } => ApiPlace::Pet { pet },
        StockPlace::Personal { owner } => ApiPlace::Personal { owner },
    }
}

fn map_kind(kind: ApiKind) -> StockKind {
    match kind {
        ApiKind::Household => StockKind::Household,
        ApiKind::Pet => StockKind::Pet,
        ApiKind::Personal => StockKind::Personal,
    }
}

fn kind_view(kind: StockKind) -> ApiKind {
    match kind {
        StockKind::Household => ApiKind::Household,
        StockKind::Pet => ApiKind::Pet,
        StockKind::Personal => ApiKind::Personal,
    }
}

fn map_movement(movement: ApiMovement) -> Movement {
    match movement {
        ApiMovement::Create => Movement::Create,
        ApiMovement::Withdraw => Movement::Withdraw,
        ApiMovement::WithdrawReversal => Movement::WithdrawReversal,
        ApiMovement::Restock => Movement::Restock,
        ApiMovement::Edit => Movement::Edit,
        ApiMovement::Delete => Movement::Delete,
        ApiMovement::PurchaseIntake => Movement::PurchaseIntake,
    }
}

fn movement_view(movement: Movement) -> ApiMovement {
    match movement {
        Movement::Create => ApiMovement::Create,
        Movement::Withdraw => ApiMovement::Withdraw,
        Movement::WithdrawReversal => ApiMovement::WithdrawReversal,
        Movement::Restock => ApiMovement::Restock,
        Movement::Edit => ApiMovement::Edit,
        Movement::Delete => ApiMovement::Delete,
        Movement::PurchaseIntake => ApiMovement::PurchaseIntake,
    }
}

fn stock_view(item: StockItem) -> StockView {
    let low = item.is_low();
    StockView {
        id: item.handle.0,
        name: item.name,
        kind: kind_view(item.place.kind()),
        location: item.place.label(),
        place: place_view(item.place),
        quantity_milli: item.quantity.milli(),
        unit: item.unit,
        category: item.category,
        unit_price_minor: item.unit_price.map(Money::minor),
        min_quantity_milli: item.min_quantity.map(Quantity::milli),
        ideal_quantity_milli: item.ideal_quantity.map(Quantity::milli),
        expires_on: item.expires_on,
        low,
    }
}

fn history_view(entry: HistoryEntry, utc: FixedOffset) -> HistoryEntryView {
    HistoryEntryView {
        id: entry.id,
        item_id: entry.item.map(|handle| handle.0),
        movement: movement_view(entry.movement),
        stock_kind: kind_view(entry.stock_kind),
        quantity_moved_milli: entry.quantity_moved.milli(),
        quantity_before_milli: entry.quantity_before.milli(),
        quantity_after_milli: entry.quantity_after.milli(),
        item_name: entry.item_name,
        location: entry.location,
        note: entry.note,
        actor: entry.actor,
        recorded_at: entry.recorded_at.with_timezone(&utc),
    }
}

pub async fn stock_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<StockNew>,
) -> Result<(StatusCode, Json<StockCreated>), ServerError> {
    let cmd = NewStockItem {
        name: payload.name,
        place: map_place(payload.place),
        quantity: Quantity::from_milli(payload.quantity_milli),
        category: payload.category,
        unit: payload.unit,
        unit_price: payload.unit_price_minor.map(Money::new),
        min_quantity: payload.min_quantity_milli.map(Quantity::from_milli),
        ideal_quantity: payload.ideal_quantity_milli.map(Quantity::from_milli),
        expires_on: payload.expires_on,
    };
    let handle = state.engine.add_stock_item(cmd, &user.username).await?;
    Ok((StatusCode::CREATED, Json(StockCreated { id: handle.0 })))
}

pub async fn get(
    _: Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StockView>, ServerError> {
    let item = state.engine.stock_item(StockHandle(id)).await?;
    Ok(Json(stock_view(item)))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StockUpdate>,
) -> Result<Json<StockView>, ServerError> {
    let update = StockItemUpdate {
        name: payload.name,
        place: payload.place.map(map_place),
        quantity: payload.quantity_milli.map(Quantity::from_milli),
        category: payload.category,
        unit: payload.unit,
        unit_price: payload.unit_price_minor.map(Money::new),
        min_quantity: payload.min_quantity_milli.map(Quantity::from_milli),
        ideal_quantity: payload.ideal_quantity_milli.map(Quantity::from_milli),
        expires_on: payload.expires_on,
    };
    let item = state
        .engine
        .edit_stock_item(StockHandle(id), update, &user.username)
        .await?;
    Ok(Json(stock_view(item)))
}

pub async fn delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_stock_item(StockHandle(id), &user.username)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn adjust(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StockAdjust>,
) -> Result<Json<StockAdjusted>, ServerError> {
    let after = state
        .engine
        .adjust_quantity(
            StockHandle(id),
            Quantity::from_milli(payload.delta_milli),
            &user.username,
        )
        .await?;
    Ok(Json(StockAdjusted {
        quantity_milli: after.milli(),
    }))
}

pub async fn low(
    _: Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<LowStockQuery>,
) -> Result<Json<StockListResponse>, ServerError> {
    let items = state.engine.low_stock(query.kind.map(map_kind)).await?;
    Ok(Json(StockListResponse {
        items: items.into_iter().map(stock_view).collect(),
    }))
}

pub async fn history(
    _: Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<HistoryList>,
) -> Result<Json<HistoryListResponse>, ServerError> {
    let filter = HistoryFilter {
        stock_kind: payload.stock_kind.map(map_kind),
        movements: payload
            .movements
            .map(|movements| movements.into_iter().map(map_movement).collect()),
        actor: payload.actor,
        item: payload.item_id.map(StockHandle),
        from: payload.from.map(|dt| dt.with_timezone(&Utc)),
        to: payload.to.map(|dt| dt.with_timezone(&Utc)),
    };
    let page = state
        .engine
        .stock_history(
            &filter,
            payload.limit.unwrap_or(50),
            payload.cursor.as_deref(),
        )
        .await?;

    let utc = FixedOffset::east_opt(0)
        .ok_or_else(|| ServerError::Generic("invalid UTC offset".to_string()))?;
    Ok(Json(HistoryListResponse {
        entries: page
            .entries
            .into_iter()
            .map(|entry| history_view(entry, utc))
            .collect(),
        next_cursor: page.next_cursor,
    }))
}
