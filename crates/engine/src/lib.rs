//! Household ledger and stock engine.
//!
//! Two stores live side by side:
//!
//! - a **ledger** of accounts and entries, where balances are derived on read
//!   and operational events (vehicle maintenance, fuel, purchases) are
//!   mirrored into at most one entry each;
//! - a **stock store** of depletable quantities (household pantry, pet
//!   supplies, personal items) with row-locked decrements, meal-driven
//!   consumption and refunds, and an append-only history that survives row
//!   deletion.
//!
//! Every public operation on [`Engine`] runs in one database transaction.

pub use accounts::Account;
pub use commands::{
    EntryUpdate, FuelUpdate, MaintenanceUpdate, NewAccount, NewEntry, NewFuelPurchase,
    NewMaintenance, NewMaintenanceService, NewMeal, NewPurchase, NewPurchaseLine,
    NewStockItem, NewVehicle, PurchaseLineUpdate, PurchaseUpdate, StockItemUpdate,
};
pub use consumption_links::ConsumptionLink;
pub use error::EngineError;
pub use fuel_purchases::{FuelKind, FuelPurchase};
pub use ledger_categories::CostKind;
pub use ledger_entries::{EntryKind, EntryOrigin, LedgerEntry, SourceRef};
pub use maintenance_records::MaintenanceRecord;
pub use maintenance_services::MaintenanceService;
pub use meals::{Meal, MealKind};
pub use money::Money;
pub use ops::{
    AccountSelection, Engine, EngineBuilder, HistoryFilter, HistoryPage, LedgerListFilter,
    MAX_PAGE_SIZE, MealDeletion, Refund, StaleLinkPolicy, StockListFilter, SyncOutcome,
};
pub use purchase_lines::PurchaseLine;
pub use purchases::{Purchase, itemized_total};
pub use quantity::Quantity;
pub use stock_history::{HistoryEntry, Movement};
pub use stock_items::{StockHandle, StockItem, StockKind, StockPlace};
pub use vehicles::Vehicle;

mod accounts;
mod commands;
mod consumption_links;
mod error;
mod fuel_purchases;
mod ledger_categories;
mod ledger_entries;
mod maintenance_records;
mod maintenance_services;
mod meals;
mod money;
mod ops;
mod purchase_lines;
mod purchases;
mod quantity;
mod stock_history;
mod stock_items;
mod users;
mod util;
mod vehicles;

type ResultEngine<T> = Result<T, EngineError>;
