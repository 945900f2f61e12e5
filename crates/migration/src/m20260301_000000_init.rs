//! Initial schema: users, the ledger and the stock store.
//!
//! - `users`: authentication and ownership
//! - `accounts`: money accounts, balance derived from entries
//! - `ledger_categories`: entry categories, case-insensitive names
//! - `ledger_entries`: incomes and expenses, optionally mirroring a source
//! - `stock_items`: depletable quantities (household, pet, personal)
//! - `stock_history`: append-only log of every stock movement
//! - `meals`: the event that consumes stock
//! - `consumption_links`: how much of which row a meal consumed

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
pub(crate) enum Users {
    Table,
    Username,
    Password,
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
    Name,
    UserId,
    StartingBalanceMinor,
    RejectsNegative,
    CreatedAt,
}

#[derive(Iden)]
enum LedgerCategories {
    Table,
    Id,
    Name,
    NameNorm,
    CostKind,
}

#[derive(Iden)]
pub(crate) enum LedgerEntries {
    Table,
    Id,
    AccountId,
    UserId,
    Name,
    Note,
    Kind,
    AmountMinor,
    OccurredOn,
    CategoryId,
    SourceKind,
    SourceId,
    Origin,
    CreatedAt,
}

#[derive(Iden)]
pub(crate) enum StockItems {
    Table,
    Id,
    Kind,
    Name,
    Category,
    Unit,
    QuantityMilli,
    UnitPriceMinor,
    MinMilli,
    IdealMilli,
    ExpiresOn,
    Room,
    Spot,
    Pet,
    OwnerId,
    CreatedAt,
}

#[derive(Iden)]
enum StockHistory {
    Table,
    Id,
    StockItemId,
    Movement,
    KindSnapshot,
    QuantityMovedMilli,
    QuantityBeforeMilli,
    QuantityAfterMilli,
    ItemNameSnapshot,
    LocationSnapshot,
    Note,
    Actor,
    RecordedAt,
}

#[derive(Iden)]
enum Meals {
    Table,
    Id,
    UserId,
    EatenOn,
    Kind,
    Notes,
    CreatedAt,
}

#[derive(Iden)]
enum ConsumptionLinks {
    Table,
    Id,
    MealId,
    StockItemId,
    QuantityMilli,
    CreatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Accounts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Accounts::Name).string().not_null())
                    .col(ColumnDef::new(Accounts::UserId).string())
                    .col(
                        ColumnDef::new(Accounts::StartingBalanceMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Accounts::RejectsNegative)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Accounts::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-accounts-user_id")
                            .from(Accounts::Table, Accounts::UserId)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-accounts-user_id-created_at")
                    .table(Accounts::Table)
                    .col(Accounts::UserId)
                    .col(Accounts::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Ledger categories
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(LedgerCategories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LedgerCategories::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LedgerCategories::Name).string().not_null())
                    .col(
                        ColumnDef::new(LedgerCategories::NameNorm)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerCategories::CostKind)
                            .string()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-ledger_categories-name_norm-unique")
                    .table(LedgerCategories::Table)
                    .col(LedgerCategories::NameNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Ledger entries
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(LedgerEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LedgerEntries::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LedgerEntries::AccountId).string().not_null())
                    .col(ColumnDef::new(LedgerEntries::UserId).string().not_null())
                    .col(ColumnDef::new(LedgerEntries::Name).string().not_null())
                    .col(ColumnDef::new(LedgerEntries::Note).string())
                    .col(ColumnDef::new(LedgerEntries::Kind).string().not_null())
                    .col(
                        ColumnDef::new(LedgerEntries::AmountMinor)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(LedgerEntries::AmountMinor).gte(0)),
                    )
                    .col(ColumnDef::new(LedgerEntries::OccurredOn).date().not_null())
                    .col(ColumnDef::new(LedgerEntries::CategoryId).string())
                    .col(ColumnDef::new(LedgerEntries::SourceKind).string())
                    .col(ColumnDef::new(LedgerEntries::SourceId).string())
                    .col(ColumnDef::new(LedgerEntries::Origin).string().not_null())
                    .col(
                        ColumnDef::new(LedgerEntries::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-ledger_entries-account_id")
                            .from(LedgerEntries::Table, LedgerEntries::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-ledger_entries-category_id")
                            .from(LedgerEntries::Table, LedgerEntries::CategoryId)
                            .to(LedgerCategories::Table, LedgerCategories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-ledger_entries-account_id-occurred_on")
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::AccountId)
                    .col(LedgerEntries::OccurredOn)
                    .to_owned(),
            )
            .await?;

        // At most one entry per source event.
        manager
            .create_index(
                Index::create()
                    .name("idx-ledger_entries-source-unique")
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::SourceKind)
                    .col(LedgerEntries::SourceId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Stock items
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(StockItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StockItems::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StockItems::Kind).string().not_null())
                    .col(ColumnDef::new(StockItems::Name).string().not_null())
                    .col(ColumnDef::new(StockItems::Category).string())
                    .col(ColumnDef::new(StockItems::Unit).string())
                    .col(
                        ColumnDef::new(StockItems::QuantityMilli)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(StockItems::QuantityMilli).gte(0)),
                    )
                    .col(ColumnDef::new(StockItems::UnitPriceMinor).big_integer())
                    .col(ColumnDef::new(StockItems::MinMilli).big_integer())
                    .col(ColumnDef::new(StockItems::IdealMilli).big_integer())
                    .col(ColumnDef::new(StockItems::ExpiresOn).date())
                    .col(ColumnDef::new(StockItems::Room).string())
                    .col(ColumnDef::new(StockItems::Spot).string())
                    .col(ColumnDef::new(StockItems::Pet).string())
                    .col(ColumnDef::new(StockItems::OwnerId).string())
                    .col(ColumnDef::new(StockItems::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-stock_items-owner_id")
                            .from(StockItems::Table, StockItems::OwnerId)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-stock_items-kind-name")
                    .table(StockItems::Table)
                    .col(StockItems::Kind)
                    .col(StockItems::Name)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Stock history
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(StockHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StockHistory::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StockHistory::StockItemId).string())
                    .col(ColumnDef::new(StockHistory::Movement).string().not_null())
                    .col(
                        ColumnDef::new(StockHistory::KindSnapshot)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockHistory::QuantityMovedMilli)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockHistory::QuantityBeforeMilli)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockHistory::QuantityAfterMilli)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockHistory::ItemNameSnapshot)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockHistory::LocationSnapshot)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockHistory::Note).string())
                    .col(ColumnDef::new(StockHistory::Actor).string().not_null())
                    .col(
                        ColumnDef::new(StockHistory::RecordedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-stock_history-stock_item_id")
                            .from(StockHistory::Table, StockHistory::StockItemId)
                            .to(StockItems::Table, StockItems::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-stock_history-stock_item_id")
                    .table(StockHistory::Table)
                    .col(StockHistory::StockItemId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-stock_history-kind_snapshot-recorded_at")
                    .table(StockHistory::Table)
                    .col(StockHistory::KindSnapshot)
                    .col(StockHistory::RecordedAt)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Meals
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Meals::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Meals::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Meals::UserId).string().not_null())
                    .col(ColumnDef::new(Meals::EatenOn).date().not_null())
                    .col(ColumnDef::new(Meals::Kind).string().not_null())
                    .col(ColumnDef::new(Meals::Notes).string())
                    .col(ColumnDef::new(Meals::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-meals-user_id")
                            .from(Meals::Table, Meals::UserId)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 8. Consumption links
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(ConsumptionLinks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ConsumptionLinks::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ConsumptionLinks::MealId).string().not_null())
                    .col(
                        ColumnDef::new(ConsumptionLinks::StockItemId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ConsumptionLinks::QuantityMilli)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(ConsumptionLinks::QuantityMilli).gt(0)),
                    )
                    .col(
                        ColumnDef::new(ConsumptionLinks::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-consumption_links-meal_id")
                            .from(ConsumptionLinks::Table, ConsumptionLinks::MealId)
                            .to(Meals::Table, Meals::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-consumption_links-stock_item_id")
                            .from(ConsumptionLinks::Table, ConsumptionLinks::StockItemId)
                            .to(StockItems::Table, StockItems::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-consumption_links-meal_id")
                    .table(ConsumptionLinks::Table)
                    .col(ConsumptionLinks::MealId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-consumption_links-stock_item_id")
                    .table(ConsumptionLinks::Table)
                    .col(ConsumptionLinks::StockItemId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(ConsumptionLinks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Meals::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(StockHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(StockItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LedgerEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LedgerCategories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
