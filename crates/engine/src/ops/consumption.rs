//! Meals and the stock they consume.
//!
//! Consumption withdraws stock and leaves a link per stock row so the meal
//! can later be undone: reversal walks the links, puts the quantity back and
//! deletes them. Rows are always locked in ascending handle order.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};

use crate::{
    ConsumptionLink, EngineError, Meal, Movement, NewMeal, Quantity, ResultEngine, StockHandle,
    consumption_links, meals,
    util::{ensure_positive_quantity, parse_uuid},
};

use super::{Engine, history::HistoryRecord, normalize_optional_text, with_tx};

/// Quantity given back (or owed) to one stock row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    pub item: StockHandle,
    pub quantity: Quantity,
}

/// What to do with links whose stock row no longer exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleLinkPolicy {
    /// Abort with `StaleReference`; nothing changes.
    #[default]
    Fail,
    /// Refund what can be refunded, drop the rest and report it.
    Forfeit,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealDeletion {
    pub refunded: Vec<Refund>,
    /// Refunds that had no stock row left to go to.
    pub forfeited: Vec<Refund>,
}

/// Sums quantities per handle; the map's order is the lock order.
fn merge_consumption(
    pairs: &[(StockHandle, Quantity)],
) -> ResultEngine<BTreeMap<StockHandle, Quantity>> {
    let mut merged = BTreeMap::new();
    for (handle, quantity) in pairs {
        ensure_positive_quantity(*quantity, "consumed")?;
        let total = merged.entry(*handle).or_insert(Quantity::ZERO);
        *total = *total + *quantity;
    }
    Ok(merged)
}

fn meal_note(meal_id: Uuid) -> String {
    format!("meal {meal_id}")
}

impl Engine {
    /// Logs a meal and consumes its stock in one transaction.
    ///
    /// A summary of the consumed stock is appended to the meal notes.
    pub async fn log_meal(&self, cmd: NewMeal) -> ResultEngine<Meal> {
        let merged = merge_consumption(&cmd.consumption)?;
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, &cmd.user_id).await?;
            let mut meal = Meal {
                id: Uuid::new_v4(),
                user_id: cmd.user_id.clone(),
                eaten_on: cmd.eaten_on,
                kind: cmd.kind,
                notes: normalize_optional_text(cmd.notes.as_deref()),
                created_at: Utc::now(),
            };
            let model: meals::ActiveModel = (&meal).into();
            model.insert(&db_tx).await?;

            let used = self
                .consume_for_meal(&db_tx, meal.id, &merged, &cmd.user_id)
                .await?;
            if !used.is_empty() {
                let summary = format!("Stock used: {}", used.join(", "));
                let notes = match meal.notes.take() {
                    Some(notes) => format!("{notes}\n{summary}"),
                    None => summary,
                };
                meals::ActiveModel {
                    id: ActiveValue::Unchanged(meal.id.to_string()),
                    notes: ActiveValue::Set(Some(notes.clone())),
                    ..Default::default()
                }
                .update(&db_tx)
                .await?;
                meal.notes = Some(notes);
            }
            tracing::info!(meal = %meal.id, user = %meal.user_id, items = used.len(), "meal logged");
            Ok(meal)
        })
    }

    /// Withdraws stock on behalf of an existing meal.
    ///
    /// Either every pair is consumed or none is.
    pub async fn record_consumption(
        &self,
        meal_id: Uuid,
        pairs: &[(StockHandle, Quantity)],
        actor: &str,
    ) -> ResultEngine<Vec<ConsumptionLink>> {
        let merged = merge_consumption(pairs)?;
        with_tx!(self, |db_tx| {
            let meal = self.require_meal(&db_tx, meal_id).await?;
            self.consume_for_meal(&db_tx, meal_id, &merged, actor)
                .await?;
            self.links_of(&db_tx, &meal.id).await
        })
    }

    /// Puts back everything a meal consumed and removes its links.
    ///
    /// Fails with `StaleReference`, changing nothing, if a linked stock row
    /// is gone.
    pub async fn reverse_consumption(
        &self,
        meal_id: Uuid,
        actor: &str,
    ) -> ResultEngine<Vec<Refund>> {
        with_tx!(self, |db_tx| {
            let meal = self.require_meal(&db_tx, meal_id).await?;
            let deletion = self
                .refund_links(&db_tx, &meal, actor, StaleLinkPolicy::Fail)
                .await?;
            Ok(deletion.refunded)
        })
    }

    pub async fn meal(&self, meal_id: Uuid) -> ResultEngine<Meal> {
        with_tx!(self, |db_tx| {
            let model = self.require_meal(&db_tx, meal_id).await?;
            Meal::try_from(model)
        })
    }

    pub async fn meal_consumption(&self, meal_id: Uuid) -> ResultEngine<Vec<ConsumptionLink>> {
        with_tx!(self, |db_tx| {
            let meal = self.require_meal(&db_tx, meal_id).await?;
            self.links_of(&db_tx, &meal.id).await
        })
    }

    /// Deletes a meal after reversing its consumption.
    pub async fn delete_meal(
        &self,
        meal_id: Uuid,
        actor: &str,
        policy: StaleLinkPolicy,
    ) -> ResultEngine<MealDeletion> {
        with_tx!(self, |db_tx| {
            let meal = self.require_meal(&db_tx, meal_id).await?;
            if meal.user_id != actor {
                return Err(EngineError::Forbidden(format!(
                    "meal {meal_id} belongs to another user"
                )));
            }
            let deletion = self.refund_links(&db_tx, &meal, actor, policy).await?;
            meals::Entity::delete_by_id(meal.id.clone())
                .exec(&db_tx)
                .await?;
            tracing::info!(
                meal = %meal_id,
                refunded = deletion.refunded.len(),
                forfeited = deletion.forfeited.len(),
                "meal deleted"
            );
            Ok(deletion)
        })
    }

    /// Returns one "name quantity" label per consumed row.
    async fn consume_for_meal(
        &self,
        db_tx: &DatabaseTransaction,
        meal_id: Uuid,
        merged: &BTreeMap<StockHandle, Quantity>,
        actor: &str,
    ) -> ResultEngine<Vec<String>> {
        let mut used = Vec::with_capacity(merged.len());
        for (handle, quantity) in merged {
            let row = self.lock_stock_row(db_tx, *handle).await?.ok_or_else(|| {
                EngineError::KeyNotFound(format!("stock item {handle}"))
            })?;
            let adjusted = self.withdraw_stock(db_tx, row, *quantity).await?;

            consumption_links::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4().to_string()),
                meal_id: ActiveValue::Set(meal_id.to_string()),
                stock_item_id: ActiveValue::Set(handle.to_string()),
                quantity_milli: ActiveValue::Set(quantity.milli()),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(db_tx)
            .await?;

            self.append_history(
                db_tx,
                HistoryRecord {
                    row: &adjusted.row,
                    movement: Movement::Withdraw,
                    before: adjusted.before,
                    after: adjusted.after,
                    note: Some(meal_note(meal_id)),
                    actor,
                },
            )
            .await?;
            used.push(match adjusted.row.unit.as_deref() {
                Some(unit) => format!("{} {quantity} {unit}", adjusted.row.name),
                None => format!("{} {quantity}", adjusted.row.name),
            });
        }
        Ok(used)
    }

    async fn refund_links(
        &self,
        db_tx: &DatabaseTransaction,
        meal: &meals::Model,
        actor: &str,
        policy: StaleLinkPolicy,
    ) -> ResultEngine<MealDeletion> {
        let meal_id = parse_uuid(&meal.id, "meal")?;
        let links = consumption_links::Entity::find()
            .filter(consumption_links::Column::MealId.eq(meal.id.clone()))
            .order_by_asc(consumption_links::Column::StockItemId)
            .order_by_asc(consumption_links::Column::Id)
            .all(db_tx)
            .await?;

        let mut deletion = MealDeletion::default();
        for link in links {
            let link = ConsumptionLink::try_from(link)?;
            let refund = Refund {
                item: link.item,
                quantity: link.quantity,
            };
            match self.lock_stock_row(db_tx, link.item).await? {
                Some(row) => {
                    let adjusted = self.apply_stock_delta(db_tx, row, link.quantity).await?;
                    self.append_history(
                        db_tx,
                        HistoryRecord {
                            row: &adjusted.row,
                            movement: Movement::WithdrawReversal,
                            before: adjusted.before,
                            after: adjusted.after,
                            note: Some(meal_note(meal_id)),
                            actor,
                        },
                    )
                    .await?;
                    deletion.refunded.push(refund);
                }
                None => match policy {
                    StaleLinkPolicy::Fail => {
                        return Err(EngineError::StaleReference(format!(
                            "meal {meal_id} consumed {} of stock item {} which no longer exists",
                            link.quantity, link.item
                        )));
                    }
                    StaleLinkPolicy::Forfeit => {
                        tracing::warn!(
                            meal = %meal_id,
                            item = %link.item,
                            quantity = %link.quantity,
                            "stock row gone, refund forfeited"
                        );
                        deletion.forfeited.push(refund);
                    }
                },
            }
            consumption_links::Entity::delete_by_id(link.id.to_string())
                .exec(db_tx)
                .await?;
        }
        Ok(deletion)
    }

    async fn require_meal(
        &self,
        db_tx: &DatabaseTransaction,
        meal_id: Uuid,
    ) -> ResultEngine<meals::Model> {
        meals::Entity::find_by_id(meal_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("meal {meal_id}")))
    }

    async fn links_of(
        &self,
        db_tx: &DatabaseTransaction,
        meal_id: &str,
    ) -> ResultEngine<Vec<ConsumptionLink>> {
        let links = consumption_links::Entity::find()
            .filter(consumption_links::Column::MealId.eq(meal_id))
            .order_by_asc(consumption_links::Column::StockItemId)
            .order_by_asc(consumption_links::Column::CreatedAt)
            .all(db_tx)
            .await?;
        links.into_iter().map(ConsumptionLink::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_sums_repeated_handles_in_handle_order() {
        let a = StockHandle(Uuid::from_u128(2));
        let b = StockHandle(Uuid::from_u128(1));
        let merged = merge_consumption(&[
            (a, Quantity::from_milli(500)),
            (b, Quantity::from_milli(250)),
            (a, Quantity::from_milli(250)),
        ])
        .unwrap();
        let order: Vec<_> = merged.iter().map(|(h, q)| (*h, *q)).collect();
        assert_eq!(
            order,
            vec![(b, Quantity::from_milli(250)), (a, Quantity::from_milli(750))]
        );
    }

    #[test]
    fn merge_rejects_non_positive_quantities() {
        let handle = StockHandle(Uuid::from_u128(1));
        assert!(matches!(
            merge_consumption(&[(handle, Quantity::ZERO)]),
            Err(EngineError::InvalidQuantity(_))
        ));
    }
}
