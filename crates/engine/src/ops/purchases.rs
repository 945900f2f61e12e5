//! Purchase aggregate use-cases.
//!
//! Every line change on an itemized purchase recomputes the header total and
//! pushes it to the bound ledger entry before the transaction commits.

use chrono::Utc;
use uuid::Uuid;

use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};

use crate::{
    EngineError, Money, Movement, NewPurchase, NewPurchaseLine, NewStockItem, Purchase,
    PurchaseLine, PurchaseLineUpdate, PurchaseUpdate, Quantity, ResultEngine, SourceRef, StockHandle,
    StockPlace, itemized_total, purchase_lines, purchases,
    util::{ensure_positive_quantity, parse_optional_uuid, parse_uuid},
};

use super::{
    AccountSelection, Engine, normalize_optional_text, normalize_required_name,
    sync::{LedgerDraft, LedgerSource},
    with_tx,
};

const CATEGORY: &str = "Groceries";

struct PurchaseSource<'a> {
    header: &'a purchases::Model,
}

impl LedgerSource for PurchaseSource<'_> {
    fn source_ref(&self) -> ResultEngine<SourceRef> {
        Ok(SourceRef::Purchase(parse_uuid(&self.header.id, "purchase")?))
    }

    fn bound_entry(&self) -> ResultEngine<Option<Uuid>> {
        parse_optional_uuid(self.header.ledger_entry_id.as_deref(), "ledger entry")
    }

    fn draft(&self) -> LedgerDraft {
        LedgerDraft {
            user_id: self.header.user_id.clone(),
            name: format!("Purchase: {}", self.header.store),
            note: self.header.city.clone(),
            amount: Money::new(self.header.total_minor),
            occurred_on: self.header.purchased_on,
            category: CATEGORY,
        }
    }
}

fn ensure_line_values(line: &NewPurchaseLine) -> ResultEngine<()> {
    ensure_positive_quantity(line.quantity, "line quantity")?;
    ensure_unit_price(line.unit_price)
}

fn ensure_unit_price(price: Money) -> ResultEngine<()> {
    if price.is_negative() {
        return Err(EngineError::InvalidAmount(format!(
            "unit price must be >= 0, got {price}"
        )));
    }
    Ok(())
}

fn ensure_declared_total(total: Money) -> ResultEngine<()> {
    if total.is_negative() {
        return Err(EngineError::InvalidAmount(format!(
            "purchase total must be >= 0, got {total}"
        )));
    }
    Ok(())
}

fn intake_note(header: &purchases::Model) -> String {
    format!("purchase {}", header.store)
}

impl Engine {
    /// Registers a purchase, puts away the lines that name a stock place and
    /// charges the total to the ledger.
    pub async fn new_purchase(&self, cmd: NewPurchase) -> ResultEngine<Purchase> {
        let store = normalize_required_name(&cmd.store, "store")?;
        if !cmd.itemized {
            ensure_declared_total(cmd.declared_total)?;
        }
        for line in &cmd.lines {
            ensure_line_values(line)?;
        }

        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, &cmd.user_id).await?;
            let header = purchases::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4().to_string()),
                user_id: ActiveValue::Set(cmd.user_id.clone()),
                store: ActiveValue::Set(store),
                city: ActiveValue::Set(normalize_optional_text(cmd.city.as_deref())),
                purchased_on: ActiveValue::Set(cmd.purchased_on),
                total_minor: ActiveValue::Set(if cmd.itemized {
                    0
                } else {
                    cmd.declared_total.minor()
                }),
                itemized: ActiveValue::Set(cmd.itemized),
                ledger_entry_id: ActiveValue::Set(None),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;

            for line in cmd.lines {
                self.insert_purchase_line(&db_tx, &header, line).await?;
            }
            let header = self.store_itemized_total(&db_tx, header).await?;

            let header = self
                .bind_purchase(&db_tx, header, cmd.account)
                .await?;
            tracing::info!(
                purchase = %header.id,
                store = %header.store,
                total = %Money::new(header.total_minor),
                "purchase registered"
            );
            self.load_purchase(&db_tx, header).await
        })
    }

    pub async fn purchase(&self, purchase_id: Uuid) -> ResultEngine<Purchase> {
        with_tx!(self, |db_tx| {
            let header = purchases::Entity::find_by_id(purchase_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(format!("purchase {purchase_id}")))?;
            self.load_purchase(&db_tx, header).await
        })
    }

    /// Edits the header. A declared total is only accepted on a purchase
    /// that is not itemized.
    pub async fn update_purchase(
        &self,
        purchase_id: Uuid,
        update: PurchaseUpdate,
        user_id: &str,
    ) -> ResultEngine<Purchase> {
        if let Some(total) = update.declared_total {
            ensure_declared_total(total)?;
        }
        with_tx!(self, |db_tx| {
            let header = self.require_purchase(&db_tx, purchase_id, user_id).await?;
            if header.itemized && update.declared_total.is_some() {
                return Err(EngineError::Validation(format!(
                    "purchase {purchase_id} is itemized, its total comes from its lines"
                )));
            }

            let mut active: purchases::ActiveModel = header.into();
            if let Some(store) = update.store.as_deref() {
                active.store = ActiveValue::Set(normalize_required_name(store, "store")?);
            }
            if update.city.is_some() {
                active.city = ActiveValue::Set(normalize_optional_text(update.city.as_deref()));
            }
            if let Some(date) = update.purchased_on {
                active.purchased_on = ActiveValue::Set(date);
            }
            if let Some(total) = update.declared_total {
                active.total_minor = ActiveValue::Set(total.minor());
            }
            let header = active.update(&db_tx).await?;
            self.sync_on_update(&db_tx, &PurchaseSource { header: &header })
                .await?;
            self.load_purchase(&db_tx, header).await
        })
    }

    /// Deletes the bound ledger entry, then the lines and the header.
    pub async fn delete_purchase(&self, purchase_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let header = self.require_purchase(&db_tx, purchase_id, user_id).await?;
            self.sync_on_delete(&db_tx, &PurchaseSource { header: &header })
                .await?;
            purchase_lines::Entity::delete_many()
                .filter(purchase_lines::Column::PurchaseId.eq(header.id.clone()))
                .exec(&db_tx)
                .await?;
            purchases::Entity::delete_by_id(header.id.clone())
                .exec(&db_tx)
                .await?;
            tracing::info!(purchase = %purchase_id, "purchase deleted");
            Ok(())
        })
    }

    pub async fn add_purchase_line(
        &self,
        purchase_id: Uuid,
        line: NewPurchaseLine,
        user_id: &str,
    ) -> ResultEngine<PurchaseLine> {
        ensure_line_values(&line)?;
        with_tx!(self, |db_tx| {
            let header = self.require_purchase(&db_tx, purchase_id, user_id).await?;
            let line = self.insert_purchase_line(&db_tx, &header, line).await?;
            self.refresh_purchase(&db_tx, header).await?;
            PurchaseLine::try_from(line)
        })
    }

    pub async fn update_purchase_line(
        &self,
        line_id: Uuid,
        update: PurchaseLineUpdate,
        user_id: &str,
    ) -> ResultEngine<PurchaseLine> {
        if let Some(quantity) = update.quantity {
            ensure_positive_quantity(quantity, "line quantity")?;
        }
        if let Some(price) = update.unit_price {
            ensure_unit_price(price)?;
        }
        with_tx!(self, |db_tx| {
            let (line, header) = self.require_purchase_line(&db_tx, line_id, user_id).await?;
            let mut active: purchase_lines::ActiveModel = line.into();
            if let Some(name) = update.name.as_deref() {
                active.name = ActiveValue::Set(normalize_required_name(name, "line")?);
            }
            if update.brand.is_some() {
                active.brand = ActiveValue::Set(normalize_optional_text(update.brand.as_deref()));
            }
            if let Some(quantity) = update.quantity {
                active.quantity_milli = ActiveValue::Set(quantity.milli());
            }
            if update.unit.is_some() {
                active.unit = ActiveValue::Set(normalize_optional_text(update.unit.as_deref()));
            }
            if let Some(price) = update.unit_price {
                active.unit_price_minor = ActiveValue::Set(price.minor());
            }
            let line = active.update(&db_tx).await?;
            self.refresh_purchase(&db_tx, header).await?;
            PurchaseLine::try_from(line)
        })
    }

    /// Removes a line. Stock already put away from it stays where it is.
    pub async fn delete_purchase_line(&self, line_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let (line, header) = self.require_purchase_line(&db_tx, line_id, user_id).await?;
            purchase_lines::Entity::delete_by_id(line.id.clone())
                .exec(&db_tx)
                .await?;
            self.refresh_purchase(&db_tx, header).await?;
            Ok(())
        })
    }

    /// Creates a stock row from a line that was not put away yet.
    pub async fn put_away_line(
        &self,
        line_id: Uuid,
        place: StockPlace,
        user_id: &str,
    ) -> ResultEngine<StockHandle> {
        with_tx!(self, |db_tx| {
            let (line, header) = self.require_purchase_line(&db_tx, line_id, user_id).await?;
            if line.added_to_stock {
                return Err(EngineError::ExistingKey(format!(
                    "line {} was already put away",
                    line.name
                )));
            }
            let line = self.put_away(&db_tx, &header, line, place).await?;
            parse_optional_uuid(line.stock_item_id.as_deref(), "stock item")?
                .map(StockHandle)
                .ok_or_else(|| EngineError::KeyNotFound(format!("stock item of line {line_id}")))
        })
    }

    /// Brings an itemized total back in line with its lines and returns it.
    ///
    /// Running it on a consistent purchase changes nothing.
    pub async fn recompute_purchase_total(&self, purchase_id: Uuid) -> ResultEngine<Money> {
        with_tx!(self, |db_tx| {
            let header = purchases::Entity::find_by_id(purchase_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(format!("purchase {purchase_id}")))?;
            let header = self.refresh_purchase(&db_tx, header).await?;
            Ok(Money::new(header.total_minor))
        })
    }

    /// Charges an unbound purchase to a chosen account.
    pub async fn post_purchase_expense(
        &self,
        purchase_id: Uuid,
        account_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Uuid> {
        with_tx!(self, |db_tx| {
            let header = self.require_purchase(&db_tx, purchase_id, user_id).await?;
            if let Some(entry_id) = header.ledger_entry_id.as_deref() {
                return Err(EngineError::ExistingKey(format!(
                    "purchase {purchase_id} is already charged by entry {entry_id}"
                )));
            }
            let header = self
                .bind_purchase(&db_tx, header, AccountSelection::Explicit(account_id))
                .await?;
            parse_optional_uuid(header.ledger_entry_id.as_deref(), "ledger entry")?
                .ok_or_else(|| EngineError::KeyNotFound(format!("account {account_id}")))
        })
    }

    /// Removes the ledger entry of a purchase and leaves it unbound.
    pub async fn revert_purchase_expense(
        &self,
        purchase_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let header = self.require_purchase(&db_tx, purchase_id, user_id).await?;
            if header.ledger_entry_id.is_none() {
                return Err(EngineError::KeyNotFound(format!(
                    "purchase {purchase_id} has no ledger entry"
                )));
            }
            self.sync_on_delete(&db_tx, &PurchaseSource { header: &header })
                .await?;
            let mut active: purchases::ActiveModel = header.into();
            active.ledger_entry_id = ActiveValue::Set(None);
            active.update(&db_tx).await?;
            tracing::info!(purchase = %purchase_id, "purchase expense reverted");
            Ok(())
        })
    }

    async fn require_purchase(
        &self,
        db_tx: &DatabaseTransaction,
        purchase_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<purchases::Model> {
        let header = purchases::Entity::find_by_id(purchase_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("purchase {purchase_id}")))?;
        if header.user_id != user_id {
            return Err(EngineError::Forbidden(format!(
                "purchase {purchase_id} belongs to another user"
            )));
        }
        Ok(header)
    }

    async fn require_purchase_line(
        &self,
        db_tx: &DatabaseTransaction,
        line_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<(purchase_lines::Model, purchases::Model)> {
        let line = purchase_lines::Entity::find_by_id(line_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("purchase line {line_id}")))?;
        let header = self
            .require_purchase(db_tx, parse_uuid(&line.purchase_id, "purchase")?, user_id)
            .await?;
        Ok((line, header))
    }

    async fn insert_purchase_line(
        &self,
        db_tx: &DatabaseTransaction,
        header: &purchases::Model,
        line: NewPurchaseLine,
    ) -> ResultEngine<purchase_lines::Model> {
        let model = purchase_lines::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4().to_string()),
            purchase_id: ActiveValue::Set(header.id.clone()),
            name: ActiveValue::Set(normalize_required_name(&line.name, "line")?),
            brand: ActiveValue::Set(normalize_optional_text(line.brand.as_deref())),
            quantity_milli: ActiveValue::Set(line.quantity.milli()),
            unit: ActiveValue::Set(normalize_optional_text(line.unit.as_deref())),
            unit_price_minor: ActiveValue::Set(line.unit_price.minor()),
            added_to_stock: ActiveValue::Set(false),
            stock_item_id: ActiveValue::Set(None),
        }
        .insert(db_tx)
        .await?;
        match line.put_away {
            Some(place) => self.put_away(db_tx, header, model, place).await,
            None => Ok(model),
        }
    }

    /// Adds the line's quantity to stock as a new row and marks the line.
    async fn put_away(
        &self,
        db_tx: &DatabaseTransaction,
        header: &purchases::Model,
        line: purchase_lines::Model,
        place: StockPlace,
    ) -> ResultEngine<purchase_lines::Model> {
        let mut item = NewStockItem::new(
            line.name.clone(),
            place,
            Quantity::from_milli(line.quantity_milli),
        )
        .unit_price(Money::new(line.unit_price_minor));
        item.unit = line.unit.clone();
        let row = self
            .insert_stock_row(
                db_tx,
                item,
                &header.user_id,
                Movement::PurchaseIntake,
                Some(intake_note(header)),
            )
            .await?;

        let mut active: purchase_lines::ActiveModel = line.into();
        active.added_to_stock = ActiveValue::Set(true);
        active.stock_item_id = ActiveValue::Set(Some(row.id));
        Ok(active.update(db_tx).await?)
    }

    /// Stores the derived total of an itemized purchase when it drifted.
    async fn store_itemized_total(
        &self,
        db_tx: &DatabaseTransaction,
        header: purchases::Model,
    ) -> ResultEngine<purchases::Model> {
        if !header.itemized {
            return Ok(header);
        }
        let lines = self.lines_of(db_tx, &header.id).await?;
        let total = itemized_total(&lines)?;
        if total.minor() == header.total_minor {
            return Ok(header);
        }
        let mut active: purchases::ActiveModel = header.into();
        active.total_minor = ActiveValue::Set(total.minor());
        Ok(active.update(db_tx).await?)
    }

    /// Recomputes the total and pushes it to the bound entry.
    async fn refresh_purchase(
        &self,
        db_tx: &DatabaseTransaction,
        header: purchases::Model,
    ) -> ResultEngine<purchases::Model> {
        let header = self.store_itemized_total(db_tx, header).await?;
        self.sync_on_update(db_tx, &PurchaseSource { header: &header })
            .await?;
        Ok(header)
    }

    async fn bind_purchase(
        &self,
        db_tx: &DatabaseTransaction,
        header: purchases::Model,
        selection: AccountSelection,
    ) -> ResultEngine<purchases::Model> {
        let outcome = self
            .sync_on_create(db_tx, &PurchaseSource { header: &header }, selection)
            .await?;
        match outcome.entry_id() {
            Some(entry_id) => {
                let mut active: purchases::ActiveModel = header.into();
                active.ledger_entry_id = ActiveValue::Set(Some(entry_id.to_string()));
                Ok(active.update(db_tx).await?)
            }
            None => Ok(header),
        }
    }

    async fn lines_of(
        &self,
        db_tx: &DatabaseTransaction,
        purchase_id: &str,
    ) -> ResultEngine<Vec<PurchaseLine>> {
        let lines = purchase_lines::Entity::find()
            .filter(purchase_lines::Column::PurchaseId.eq(purchase_id))
            .order_by_asc(purchase_lines::Column::Name)
            .order_by_asc(purchase_lines::Column::Id)
            .all(db_tx)
            .await?;
        lines.into_iter().map(PurchaseLine::try_from).collect()
    }

    async fn load_purchase(
        &self,
        db_tx: &DatabaseTransaction,
        header: purchases::Model,
    ) -> ResultEngine<Purchase> {
        let lines = self.lines_of(db_tx, &header.id).await?;
        Purchase::try_from((header, lines))
    }
}
