//! Stock store operations.
//!
//! Every quantity change follows the same shape: lock the row, apply the
//! delta through a guarded `UPDATE` that cannot take the quantity below
//! zero, read the new value back, append a history entry. The guard is what
//! keeps the invariant on backends where the row lock is a no-op.

use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, prelude::*, sea_query::Expr,
};

use crate::{
    EngineError, Movement, NewStockItem, Quantity, ResultEngine, StockHandle, StockItem,
    StockItemUpdate, StockKind, StockPlace, consumption_links, stock_items,
    util::{ensure_positive_quantity, parse_uuid},
};

use super::{
    Engine, history::HistoryRecord, normalize_optional_text, normalize_required_name, with_tx,
};

/// Filters for listing stock rows.
#[derive(Clone, Debug, Default)]
pub struct StockListFilter {
    pub kind: Option<StockKind>,
    /// Case-insensitive substring of the name.
    pub name_contains: Option<String>,
    pub owner: Option<String>,
}

/// Outcome of one locked quantity change.
pub(super) struct Adjusted {
    pub row: stock_items::Model,
    pub before: Quantity,
    pub after: Quantity,
}

impl Engine {
    /// Intake of a new row; writes a `create` history entry.
    pub async fn add_stock_item(
        &self,
        cmd: NewStockItem,
        actor: &str,
    ) -> ResultEngine<StockHandle> {
        with_tx!(self, |db_tx| {
            let row = self
                .insert_stock_row(&db_tx, cmd, actor, Movement::Create, None)
                .await?;
            let handle = StockHandle(parse_uuid(&row.id, "stock item")?);
            tracing::info!(item = %handle, name = %row.name, kind = %row.kind, "stock row created");
            Ok(handle)
        })
    }

    pub async fn stock_item(&self, handle: StockHandle) -> ResultEngine<StockItem> {
        with_tx!(self, |db_tx| {
            let row = self.require_stock_row(&db_tx, handle).await?;
            StockItem::try_from(row)
        })
    }

    pub async fn list_stock(&self, filter: &StockListFilter) -> ResultEngine<Vec<StockItem>> {
        with_tx!(self, |db_tx| {
            let mut query = stock_items::Entity::find();
            if let Some(kind) = filter.kind {
                query = query.filter(stock_items::Column::Kind.eq(kind.as_str()));
            }
            if let Some(owner) = filter.owner.as_deref() {
                query = query.filter(stock_items::Column::OwnerId.eq(owner));
            }
            if let Some(needle) = normalize_optional_text(filter.name_contains.as_deref()) {
                query = query.filter(stock_items::Column::Name.contains(needle.as_str()));
            }
            let rows = query
                .order_by_asc(stock_items::Column::Name)
                .all(&db_tx)
                .await?;
            rows.into_iter().map(StockItem::try_from).collect()
        })
    }

    /// Rows below their configured minimum, optionally of one kind.
    pub async fn low_stock(&self, kind: Option<StockKind>) -> ResultEngine<Vec<StockItem>> {
        with_tx!(self, |db_tx| {
            let mut query = stock_items::Entity::find()
                .filter(stock_items::Column::MinMilli.is_not_null())
                .filter(
                    Expr::col(stock_items::Column::QuantityMilli)
                        .lt(Expr::col(stock_items::Column::MinMilli)),
                );
            if let Some(kind) = kind {
                query = query.filter(stock_items::Column::Kind.eq(kind.as_str()));
            }
            let rows = query
                .order_by_asc(stock_items::Column::Name)
                .all(&db_tx)
                .await?;
            rows.into_iter().map(StockItem::try_from).collect()
        })
    }

    /// Adds a signed delta to a row and returns the new quantity.
    ///
    /// A negative delta is a `withdraw`, a positive one a `restock`. A
    /// withdrawal larger than what is available fails with
    /// `InsufficientStock` and changes nothing.
    pub async fn adjust_quantity(
        &self,
        handle: StockHandle,
        delta: Quantity,
        actor: &str,
    ) -> ResultEngine<Quantity> {
        if delta == Quantity::ZERO {
            return Err(EngineError::InvalidQuantity(
                "delta must not be zero".to_string(),
            ));
        }
        let movement = if delta.is_negative() {
            Movement::Withdraw
        } else {
            Movement::Restock
        };
        with_tx!(self, |db_tx| {
            let row = self.lock_stock_row(&db_tx, handle).await?.ok_or_else(|| {
                EngineError::KeyNotFound(format!("stock item {handle}"))
            })?;
            let adjusted = self.apply_stock_delta(&db_tx, row, delta).await?;
            self.append_history(
                &db_tx,
                HistoryRecord {
                    row: &adjusted.row,
                    movement,
                    before: adjusted.before,
                    after: adjusted.after,
                    note: None,
                    actor,
                },
            )
            .await?;
            Ok(adjusted.after)
        })
    }

    /// Edits descriptive fields and, optionally, sets an absolute quantity.
    ///
    /// Always writes an `edit` entry, describing the row as it is after the
    /// edit.
    pub async fn edit_stock_item(
        &self,
        handle: StockHandle,
        update: StockItemUpdate,
        actor: &str,
    ) -> ResultEngine<StockItem> {
        if let Some(quantity) = update.quantity
            && quantity.is_negative()
        {
            return Err(EngineError::InvalidQuantity(format!(
                "quantity must be >= 0, got {quantity}"
            )));
        }
        with_tx!(self, |db_tx| {
            let row = self.lock_stock_row(&db_tx, handle).await?.ok_or_else(|| {
                EngineError::KeyNotFound(format!("stock item {handle}"))
            })?;
            let before = row.quantity();
            if let Some(place) = &update.place {
                if place.kind().as_str() != row.kind {
                    return Err(EngineError::Validation(format!(
                        "stock item {} cannot move from {} to {} stock",
                        row.name,
                        row.kind,
                        place.kind().as_str()
                    )));
                }
                if let StockPlace::Personal { owner } = place {
                    self.require_user(&db_tx, owner).await?;
                }
            }

            let mut active: stock_items::ActiveModel = row.into();
            if let Some(name) = update.name.as_deref() {
                active.name = ActiveValue::Set(normalize_required_name(name, "stock")?);
            }
            if let Some(place) = update.place {
                let (room, spot, pet, owner) = place_columns(place);
                active.room = ActiveValue::Set(room);
                active.spot = ActiveValue::Set(spot);
                active.pet = ActiveValue::Set(pet);
                active.owner_id = ActiveValue::Set(owner);
            }
            if let Some(quantity) = update.quantity {
                active.quantity_milli = ActiveValue::Set(quantity.milli());
            }
            if update.category.is_some() {
                active.category =
                    ActiveValue::Set(normalize_optional_text(update.category.as_deref()));
            }
            if update.unit.is_some() {
                active.unit = ActiveValue::Set(normalize_optional_text(update.unit.as_deref()));
            }
            if let Some(price) = update.unit_price {
                active.unit_price_minor = ActiveValue::Set(Some(price.minor()));
            }
            if let Some(min) = update.min_quantity {
                active.min_milli = ActiveValue::Set(Some(min.milli()));
            }
            if let Some(ideal) = update.ideal_quantity {
                active.ideal_milli = ActiveValue::Set(Some(ideal.milli()));
            }
            if let Some(date) = update.expires_on {
                active.expires_on = ActiveValue::Set(Some(date));
            }
            let updated = active.update(&db_tx).await?;

            self.append_history(
                &db_tx,
                HistoryRecord {
                    row: &updated,
                    movement: Movement::Edit,
                    before,
                    after: updated.quantity(),
                    note: None,
                    actor,
                },
            )
            .await?;
            StockItem::try_from(updated)
        })
    }

    /// Deletes a row, logging the deletion first.
    ///
    /// Refused with `InUse` while consumption links reference the row: their
    /// refund would have nowhere to go.
    pub async fn delete_stock_item(&self, handle: StockHandle, actor: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let row = self.lock_stock_row(&db_tx, handle).await?.ok_or_else(|| {
                EngineError::KeyNotFound(format!("stock item {handle}"))
            })?;
            let links = consumption_links::Entity::find()
                .filter(consumption_links::Column::StockItemId.eq(row.id.clone()))
                .count(&db_tx)
                .await?;
            if links > 0 {
                return Err(EngineError::InUse(format!(
                    "stock item {} is referenced by {links} meal consumption links",
                    row.name
                )));
            }

            self.append_history(
                &db_tx,
                HistoryRecord {
                    row: &row,
                    movement: Movement::Delete,
                    before: row.quantity(),
                    after: Quantity::ZERO,
                    note: None,
                    actor,
                },
            )
            .await?;
            stock_items::Entity::delete_by_id(row.id.clone())
                .exec(&db_tx)
                .await?;
            tracing::info!(item = %handle, name = %row.name, "stock row deleted");
            Ok(())
        })
    }

    /// Validates and inserts a new row, then logs its intake.
    pub(super) async fn insert_stock_row(
        &self,
        db_tx: &DatabaseTransaction,
        cmd: NewStockItem,
        actor: &str,
        movement: Movement,
        note: Option<String>,
    ) -> ResultEngine<stock_items::Model> {
        let name = normalize_required_name(&cmd.name, "stock")?;
        if cmd.quantity.is_negative() {
            return Err(EngineError::InvalidQuantity(format!(
                "quantity must be >= 0, got {}",
                cmd.quantity
            )));
        }
        if let StockPlace::Personal { owner } = &cmd.place {
            self.require_user(db_tx, owner).await?;
        }

        let item = StockItem {
            handle: StockHandle::new(),
            name,
            category: normalize_optional_text(cmd.category.as_deref()),
            unit: normalize_optional_text(cmd.unit.as_deref()),
            quantity: cmd.quantity,
            unit_price: cmd.unit_price,
            min_quantity: cmd.min_quantity,
            ideal_quantity: cmd.ideal_quantity,
            expires_on: cmd.expires_on,
            place: cmd.place,
            created_at: Utc::now(),
        };
        let model: stock_items::ActiveModel = (&item).into();
        let row = model.insert(db_tx).await?;

        self.append_history(
            db_tx,
            HistoryRecord {
                row: &row,
                movement,
                before: Quantity::ZERO,
                after: item.quantity,
                note,
                actor,
            },
        )
        .await?;
        Ok(row)
    }

    /// Selects a row `FOR UPDATE` where the backend supports it.
    pub(super) async fn lock_stock_row(
        &self,
        db_tx: &DatabaseTransaction,
        handle: StockHandle,
    ) -> ResultEngine<Option<stock_items::Model>> {
        Ok(stock_items::Entity::find_by_id(handle.to_string())
            .lock_exclusive()
            .one(db_tx)
            .await?)
    }

    pub(super) async fn require_stock_row(
        &self,
        db_tx: &DatabaseTransaction,
        handle: StockHandle,
    ) -> ResultEngine<stock_items::Model> {
        stock_items::Entity::find_by_id(handle.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("stock item {handle}")))
    }

    /// Applies `delta` to a locked row.
    ///
    /// The `UPDATE` only matches while `quantity + delta >= 0`; zero affected
    /// rows means the stock could not cover the withdrawal.
    pub(super) async fn apply_stock_delta(
        &self,
        db_tx: &DatabaseTransaction,
        row: stock_items::Model,
        delta: Quantity,
    ) -> ResultEngine<Adjusted> {
        let out_of_range = || {
            EngineError::InvalidQuantity(format!(
                "delta {delta} out of range for stock item {}",
                row.name
            ))
        };
        let floor = delta.checked_neg().ok_or_else(out_of_range)?;
        row.quantity().checked_add(delta).ok_or_else(out_of_range)?;

        let result = stock_items::Entity::update_many()
            .col_expr(
                stock_items::Column::QuantityMilli,
                Expr::col(stock_items::Column::QuantityMilli).add(delta.milli()),
            )
            .filter(stock_items::Column::Id.eq(row.id.clone()))
            .filter(stock_items::Column::QuantityMilli.gte(floor.milli()))
            .exec(db_tx)
            .await?;

        let current = stock_items::Entity::find_by_id(row.id.clone())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("stock item {}", row.id)))?;

        if result.rows_affected == 0 {
            return Err(EngineError::InsufficientStock {
                available: current.quantity(),
                item: current.name,
                requested: floor.abs(),
            });
        }

        let after = current.quantity();
        Ok(Adjusted {
            before: after - delta,
            after,
            row: current,
        })
    }

    /// Decrements a locked row by a positive `quantity`.
    pub(super) async fn withdraw_stock(
        &self,
        db_tx: &DatabaseTransaction,
        row: stock_items::Model,
        quantity: Quantity,
    ) -> ResultEngine<Adjusted> {
        ensure_positive_quantity(quantity, "withdrawal")?;
        self.apply_stock_delta(db_tx, row, -quantity).await
    }
}

fn place_columns(
    place: StockPlace,
) -> (Option<String>, Option<String>, Option<String>, Option<String>) {
    match place {
        StockPlace::Household { room, spot } => (room, spot, None, None),
        StockPlace::Pet { pet } => (None, None, Some(pet), None),
        StockPlace::Personal { owner } => (None, None, None, Some(owner)),
    }
}
