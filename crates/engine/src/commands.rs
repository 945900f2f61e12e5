//! Command structs for engine write operations.
//!
//! These types group parameters for the create/update use-cases, keeping
//! call sites readable and avoiding long argument lists. Update commands use
//! `None` for "leave unchanged".

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    AccountSelection, EntryKind, FuelKind, MealKind, Money, Quantity, StockHandle, StockPlace,
};

/// Open a new account.
#[derive(Clone, Debug)]
pub struct NewAccount {
    pub name: String,
    pub owner: Option<String>,
    pub starting_balance: Money,
    pub rejects_negative: bool,
}

impl NewAccount {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: None,
            starting_balance: Money::ZERO,
            rejects_negative: false,
        }
    }

    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    #[must_use]
    pub fn starting_balance(mut self, amount: Money) -> Self {
        self.starting_balance = amount;
        self
    }

    #[must_use]
    pub fn rejects_negative(mut self, value: bool) -> Self {
        self.rejects_negative = value;
        self
    }
}

/// Create a manual ledger entry.
#[derive(Clone, Debug)]
pub struct NewEntry {
    pub account_id: Uuid,
    pub user_id: String,
    pub kind: EntryKind,
    pub amount: Money,
    pub occurred_on: NaiveDate,
    pub name: String,
    pub note: Option<String>,
    pub category: Option<String>,
}

impl NewEntry {
    #[must_use]
    pub fn new(
        account_id: Uuid,
        user_id: impl Into<String>,
        kind: EntryKind,
        amount: Money,
        occurred_on: NaiveDate,
        name: impl Into<String>,
    ) -> Self {
        Self {
            account_id,
            user_id: user_id.into(),
            kind,
            amount,
            occurred_on,
            name: name.into(),
            note: None,
            category: None,
        }
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct EntryUpdate {
    pub amount: Option<Money>,
    pub name: Option<String>,
    pub note: Option<String>,
    pub occurred_on: Option<NaiveDate>,
}

/// Intake of a brand-new stock row.
#[derive(Clone, Debug)]
pub struct NewStockItem {
    pub name: String,
    pub place: StockPlace,
    pub quantity: Quantity,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub unit_price: Option<Money>,
    pub min_quantity: Option<Quantity>,
    pub ideal_quantity: Option<Quantity>,
    pub expires_on: Option<NaiveDate>,
}

impl NewStockItem {
    #[must_use]
    pub fn new(name: impl Into<String>, place: StockPlace, quantity: Quantity) -> Self {
        Self {
            name: name.into(),
            place,
            quantity,
            category: None,
            unit: None,
            unit_price: None,
            min_quantity: None,
            ideal_quantity: None,
            expires_on: None,
        }
    }

    #[must_use]
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn unit_price(mut self, price: Money) -> Self {
        self.unit_price = Some(price);
        self
    }

    #[must_use]
    pub fn min_quantity(mut self, min: Quantity) -> Self {
        self.min_quantity = Some(min);
        self
    }

    #[must_use]
    pub fn ideal_quantity(mut self, ideal: Quantity) -> Self {
        self.ideal_quantity = Some(ideal);
        self
    }

    #[must_use]
    pub fn expires_on(mut self, date: NaiveDate) -> Self {
        self.expires_on = Some(date);
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct StockItemUpdate {
    pub name: Option<String>,
    pub place: Option<StockPlace>,
    /// Absolute new quantity.
    pub quantity: Option<Quantity>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub unit_price: Option<Money>,
    pub min_quantity: Option<Quantity>,
    pub ideal_quantity: Option<Quantity>,
    pub expires_on: Option<NaiveDate>,
}

/// Log a meal and consume stock for it.
#[derive(Clone, Debug)]
pub struct NewMeal {
    pub user_id: String,
    pub eaten_on: NaiveDate,
    pub kind: MealKind,
    pub notes: Option<String>,
    pub consumption: Vec<(StockHandle, Quantity)>,
}

#[derive(Clone, Debug)]
pub struct NewVehicle {
    pub owner_id: String,
    pub name: String,
    pub model: String,
    pub plate: Option<String>,
    pub odometer_km: i64,
}

#[derive(Clone, Debug)]
pub struct NewMaintenanceService {
    pub vehicle_id: Uuid,
    pub name: String,
    pub interval_km: Option<i64>,
    pub interval_days: Option<i64>,
    pub last_km: i64,
    pub last_on: NaiveDate,
}

#[derive(Clone, Debug)]
pub struct NewMaintenance {
    pub user_id: String,
    pub vehicle_id: Uuid,
    pub service_id: Option<Uuid>,
    pub description: String,
    pub performed_on: NaiveDate,
    pub odometer_km: i64,
    pub cost: Money,
    pub account: AccountSelection,
}

#[derive(Clone, Debug, Default)]
pub struct MaintenanceUpdate {
    pub description: Option<String>,
    pub performed_on: Option<NaiveDate>,
    pub odometer_km: Option<i64>,
    pub cost: Option<Money>,
}

#[derive(Clone, Debug)]
pub struct NewFuelPurchase {
    pub user_id: String,
    pub vehicle_id: Uuid,
    pub purchased_on: NaiveDate,
    pub odometer_km: i64,
    pub liters: Quantity,
    pub total: Money,
    pub fuel: FuelKind,
    pub account: AccountSelection,
}

#[derive(Clone, Debug, Default)]
pub struct FuelUpdate {
    pub purchased_on: Option<NaiveDate>,
    pub odometer_km: Option<i64>,
    pub liters: Option<Quantity>,
    pub total: Option<Money>,
    pub fuel: Option<FuelKind>,
}

/// Register a purchase with its lines.
#[derive(Clone, Debug)]
pub struct NewPurchase {
    pub user_id: String,
    pub store: String,
    pub city: Option<String>,
    pub purchased_on: NaiveDate,
    pub itemized: bool,
    /// Used as the total when `itemized` is false; ignored otherwise.
    pub declared_total: Money,
    pub lines: Vec<NewPurchaseLine>,
    pub account: AccountSelection,
}

impl NewPurchase {
    #[must_use]
    pub fn itemized(
        user_id: impl Into<String>,
        store: impl Into<String>,
        purchased_on: NaiveDate,
        lines: Vec<NewPurchaseLine>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            store: store.into(),
            city: None,
            purchased_on,
            itemized: true,
            declared_total: Money::ZERO,
            lines,
            account: AccountSelection::FirstOwned,
        }
    }

    #[must_use]
    pub fn declared(
        user_id: impl Into<String>,
        store: impl Into<String>,
        purchased_on: NaiveDate,
        total: Money,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            store: store.into(),
            city: None,
            purchased_on,
            itemized: false,
            declared_total: total,
            lines: Vec::new(),
            account: AccountSelection::FirstOwned,
        }
    }

    #[must_use]
    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    #[must_use]
    pub fn account(mut self, account: AccountSelection) -> Self {
        self.account = account;
        self
    }
}

#[derive(Clone, Debug)]
pub struct NewPurchaseLine {
    pub name: String,
    pub brand: Option<String>,
    pub quantity: Quantity,
    pub unit: Option<String>,
    pub unit_price: Money,
    /// Put the line away into a new stock row at this place.
    pub put_away: Option<StockPlace>,
}

impl NewPurchaseLine {
    #[must_use]
    pub fn new(name: impl Into<String>, quantity: Quantity, unit_price: Money) -> Self {
        Self {
            name: name.into(),
            brand: None,
            quantity,
            unit: None,
            unit_price,
            put_away: None,
        }
    }

    #[must_use]
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    #[must_use]
    pub fn put_away(mut self, place: StockPlace) -> Self {
        self.put_away = Some(place);
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct PurchaseUpdate {
    pub store: Option<String>,
    pub city: Option<String>,
    pub purchased_on: Option<NaiveDate>,
    /// Only accepted for non-itemized purchases.
    pub declared_total: Option<Money>,
}

#[derive(Clone, Debug, Default)]
pub struct PurchaseLineUpdate {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub quantity: Option<Quantity>,
    pub unit: Option<String>,
    pub unit_price: Option<Money>,
}
