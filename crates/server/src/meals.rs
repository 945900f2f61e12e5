//! Meals API endpoints.

use api_types::meal::{
    Consumption, MealCreated, MealDeleteQuery, MealDeleted, MealKind as ApiKind, MealNew,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{MealKind, NewMeal, Quantity, Refund, StaleLinkPolicy, StockHandle};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

fn map_kind(kind: ApiKind) -> MealKind {
    match kind {
        ApiKind::Breakfast => MealKind::Breakfast,
        ApiKind::Lunch => MealKind::Lunch,
        ApiKind::Snack => MealKind::Snack,
        ApiKind::Dinner => MealKind::Dinner,
        ApiKind::Dessert => MealKind::Dessert,
    }
}

fn refund_view(refund: Refund) -> Consumption {
    Consumption {
        stock_id: refund.item.0,
        quantity_milli: refund.quantity.milli(),
    }
}

pub async fn meal_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<MealNew>,
) -> Result<(StatusCode, Json<MealCreated>), ServerError> {
    let cmd = NewMeal {
        user_id: user.username,
        eaten_on: payload.eaten_on,
        kind: map_kind(payload.kind),
        notes: payload.notes,
        consumption: payload
            .consumption
            .into_iter()
            .map(|c| (StockHandle(c.stock_id), Quantity::from_milli(c.quantity_milli)))
            .collect(),
    };
    let meal = state.engine.log_meal(cmd).await?;
    Ok((
        StatusCode::CREATED,
        Json(MealCreated {
            id: meal.id,
            notes: meal.notes,
        }),
    ))
}

/// Deletes a meal and gives its stock back. With `forfeit_stale=true`,
/// consumption whose stock row is gone is dropped instead of failing.
pub async fn delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Query(query): Query<MealDeleteQuery>,
) -> Result<Json<MealDeleted>, ServerError> {
    let policy = if query.forfeit_stale.unwrap_or(false) {
        StaleLinkPolicy::Forfeit
    } else {
        StaleLinkPolicy::Fail
    };
    let deletion = state.engine.delete_meal(id, &user.username, policy).await?;
    Ok(Json(MealDeleted {
        refunded: deletion.refunded.into_iter().map(refund_view).collect(),
        forfeited: deletion.forfeited.into_iter().map(refund_view).collect(),
    }))
}
