//! Request and response bodies of the household HTTP API.
//!
//! Amounts travel as minor units (`*_minor`, cents) and quantities as
//! thousandths (`*_milli`).

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod account {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountNew {
        pub name: String,
        /// Shared accounts have no owner and are writable by every user.
        #[serde(default)]
        pub shared: bool,
        #[serde(default)]
        pub starting_balance_minor: i64,
        #[serde(default)]
        pub rejects_negative: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountCreated {
        pub id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Balance {
        pub account_id: Uuid,
        pub name: String,
        pub balance_minor: i64,
    }
}

pub mod entry {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum EntryKind {
        Income,
        Expense,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum EntryOrigin {
        Manual,
        Synchronized,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EntryNew {
        pub account_id: Uuid,
        pub kind: EntryKind,
        pub amount_minor: i64,
        pub occurred_on: NaiveDate,
        pub name: String,
        pub note: Option<String>,
        pub category: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct EntryUpdate {
        pub amount_minor: Option<i64>,
        pub name: Option<String>,
        pub note: Option<String>,
        pub occurred_on: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EntryCreated {
        pub id: Uuid,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct EntryList {
        pub account_id: Option<Uuid>,
        pub kinds: Option<Vec<EntryKind>>,
        pub origin: Option<EntryOrigin>,
        /// Inclusive.
        pub from: Option<NaiveDate>,
        /// Inclusive.
        pub to: Option<NaiveDate>,
        pub limit: Option<u64>,
    }

    /// Source event an entry mirrors.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct EntrySource {
        /// `maintenance`, `fuel` or `purchase`.
        pub kind: String,
        pub id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EntryView {
        pub id: Uuid,
        pub account_id: Uuid,
        pub kind: EntryKind,
        pub amount_minor: i64,
        pub occurred_on: NaiveDate,
        pub name: String,
        pub note: Option<String>,
        pub origin: EntryOrigin,
        pub source: Option<EntrySource>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EntryListResponse {
        pub entries: Vec<EntryView>,
    }
}

pub mod stock {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum StockKind {
        Household,
        Pet,
        Personal,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(tag = "kind", rename_all = "snake_case")]
    pub enum StockPlace {
        Household {
            room: Option<String>,
            spot: Option<String>,
        },
        Pet {
            pet: String,
        },
        Personal {
            owner: String,
        },
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Movement {
        Create,
        Withdraw,
        WithdrawReversal,
        Restock,
        Edit,
        Delete,
        PurchaseIntake,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct StockNew {
        pub name: String,
        pub place: StockPlace,
        pub quantity_milli: i64,
        pub category: Option<String>,
        pub unit: Option<String>,
        pub unit_price_minor: Option<i64>,
        pub min_quantity_milli: Option<i64>,
        pub ideal_quantity_milli: Option<i64>,
        pub expires_on: Option<NaiveDate>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct StockUpdate {
        pub name: Option<String>,
        /// Must keep the row's kind.
        pub place: Option<StockPlace>,
        /// Absolute new quantity.
        pub quantity_milli: Option<i64>,
        pub category: Option<String>,
        pub unit: Option<String>,
        pub unit_price_minor: Option<i64>,
        pub min_quantity_milli: Option<i64>,
        pub ideal_quantity_milli: Option<i64>,
        pub expires_on: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct StockCreated {
        pub id: Uuid,
    }

    /// Signed change: negative withdraws, positive restocks.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct StockAdjust {
        pub delta_milli: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct StockAdjusted {
        pub quantity_milli: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct StockView {
        pub id: Uuid,
        pub name: String,
        pub kind: StockKind,
        pub place: StockPlace,
        pub location: String,
        pub quantity_milli: i64,
        pub unit: Option<String>,
        pub category: Option<String>,
        pub unit_price_minor: Option<i64>,
        pub min_quantity_milli: Option<i64>,
        pub ideal_quantity_milli: Option<i64>,
        pub expires_on: Option<NaiveDate>,
        pub low: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct StockListResponse {
        pub items: Vec<StockView>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct LowStockQuery {
        pub kind: Option<StockKind>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct HistoryList {
        pub stock_kind: Option<StockKind>,
        pub movements: Option<Vec<Movement>>,
        pub actor: Option<String>,
        pub item_id: Option<Uuid>,
        /// RFC3339 timestamp, inclusive.
        pub from: Option<DateTime<FixedOffset>>,
        /// RFC3339 timestamp, exclusive.
        pub to: Option<DateTime<FixedOffset>>,
        pub limit: Option<u64>,
        /// Opaque pagination cursor, from `next_cursor`.
        pub cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HistoryEntryView {
        pub id: i64,
        pub item_id: Option<Uuid>,
        pub movement: Movement,
        pub stock_kind: StockKind,
        pub quantity_moved_milli: i64,
        pub quantity_before_milli: i64,
        pub quantity_after_milli: i64,
        pub item_name: String,
        pub location: String,
        pub note: Option<String>,
        pub actor: String,
        pub recorded_at: DateTime<FixedOffset>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HistoryListResponse {
        pub entries: Vec<HistoryEntryView>,
        /// Opaque cursor for fetching the next page (older items).
        pub next_cursor: Option<String>,
    }
}

pub mod meal {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum MealKind {
        Breakfast,
        Lunch,
        Snack,
        Dinner,
        Dessert,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Consumption {
        pub stock_id: Uuid,
        pub quantity_milli: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MealNew {
        pub eaten_on: NaiveDate,
        pub kind: MealKind,
        pub notes: Option<String>,
        #[serde(default)]
        pub consumption: Vec<Consumption>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MealCreated {
        pub id: Uuid,
        /// Notes after the consumption summary was appended.
        pub notes: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct MealDeleteQuery {
        /// Drop refunds whose stock row is gone instead of failing.
        pub forfeit_stale: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MealDeleted {
        pub refunded: Vec<Consumption>,
        pub forfeited: Vec<Consumption>,
    }
}

pub mod vehicle {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum FuelKind {
        Gasoline,
        PremiumGasoline,
        Ethanol,
        Diesel,
        Cng,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct VehicleNew {
        pub name: String,
        pub model: String,
        pub plate: Option<String>,
        #[serde(default)]
        pub odometer_km: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct VehicleCreated {
        pub id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ServiceNew {
        pub name: String,
        pub interval_km: Option<i64>,
        pub interval_days: Option<i64>,
        pub last_km: i64,
        pub last_on: NaiveDate,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ServiceCreated {
        pub id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MaintenanceNew {
        pub vehicle_id: Uuid,
        pub service_id: Option<Uuid>,
        pub description: String,
        pub performed_on: NaiveDate,
        pub odometer_km: i64,
        pub cost_minor: i64,
        /// Account to charge; the user's oldest account when absent.
        pub account_id: Option<Uuid>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct MaintenanceUpdate {
        pub description: Option<String>,
        pub performed_on: Option<NaiveDate>,
        pub odometer_km: Option<i64>,
        pub cost_minor: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MaintenanceView {
        pub id: Uuid,
        pub vehicle_id: Uuid,
        pub service_id: Option<Uuid>,
        pub description: String,
        pub performed_on: NaiveDate,
        pub odometer_km: i64,
        pub cost_minor: i64,
        pub ledger_entry_id: Option<Uuid>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FuelNew {
        pub vehicle_id: Uuid,
        pub purchased_on: NaiveDate,
        pub odometer_km: i64,
        pub liters_milli: i64,
        pub total_minor: i64,
        pub fuel: FuelKind,
        /// Account to charge; the user's oldest account when absent.
        pub account_id: Option<Uuid>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct FuelUpdate {
        pub purchased_on: Option<NaiveDate>,
        pub odometer_km: Option<i64>,
        pub liters_milli: Option<i64>,
        pub total_minor: Option<i64>,
        pub fuel: Option<FuelKind>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FuelView {
        pub id: Uuid,
        pub vehicle_id: Uuid,
        pub purchased_on: NaiveDate,
        pub odometer_km: i64,
        pub liters_milli: i64,
        pub total_minor: i64,
        pub fuel: FuelKind,
        pub ledger_entry_id: Option<Uuid>,
    }
}

pub mod purchase {
    use super::*;
    use crate::stock::StockPlace;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PurchaseLineNew {
        pub name: String,
        pub brand: Option<String>,
        pub quantity_milli: i64,
        pub unit: Option<String>,
        pub unit_price_minor: i64,
        /// Put the line away into a new stock row at this place.
        pub put_away: Option<StockPlace>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PurchaseNew {
        pub store: String,
        pub city: Option<String>,
        pub purchased_on: NaiveDate,
        #[serde(default)]
        pub lines: Vec<PurchaseLineNew>,
        /// Set for a purchase without itemized lines; the total then comes
        /// from the lines otherwise.
        pub declared_total_minor: Option<i64>,
        /// Account to charge; the user's oldest account when absent.
        pub account_id: Option<Uuid>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct PurchaseUpdate {
        pub store: Option<String>,
        pub city: Option<String>,
        pub purchased_on: Option<NaiveDate>,
        pub declared_total_minor: Option<i64>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct PurchaseLineUpdate {
        pub name: Option<String>,
        pub brand: Option<String>,
        pub quantity_milli: Option<i64>,
        pub unit: Option<String>,
        pub unit_price_minor: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PurchaseLineView {
        pub id: Uuid,
        pub name: String,
        pub brand: Option<String>,
        pub quantity_milli: i64,
        pub unit: Option<String>,
        pub unit_price_minor: i64,
        pub added_to_stock: bool,
        pub stock_id: Option<Uuid>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PurchaseView {
        pub id: Uuid,
        pub store: String,
        pub city: Option<String>,
        pub purchased_on: NaiveDate,
        pub total_minor: i64,
        pub itemized: bool,
        pub ledger_entry_id: Option<Uuid>,
        pub lines: Vec<PurchaseLineView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PurchaseExpense {
        pub account_id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpensePosted {
        pub entry_id: Uuid,
    }
}
