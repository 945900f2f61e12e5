//! Source events mirrored into the ledger.
//!
//! - `vehicles` and their `maintenance_services` catalog
//! - `maintenance_records` and `fuel_purchases`
//! - `purchases` with their `purchase_lines`
//!
//! Each source carries the id of the ledger entry it is bound to; deleting
//! the entry leaves the source unbound.

use sea_orm_migration::prelude::*;

use super::m20260301_000000_init::{LedgerEntries, StockItems, Users};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Vehicles {
    Table,
    Id,
    OwnerId,
    Name,
    Model,
    Plate,
    OdometerKm,
}

#[derive(Iden)]
enum MaintenanceServices {
    Table,
    Id,
    VehicleId,
    Name,
    IntervalKm,
    IntervalDays,
    LastKm,
    LastOn,
}

#[derive(Iden)]
enum MaintenanceRecords {
    Table,
    Id,
    UserId,
    VehicleId,
    ServiceId,
    Description,
    PerformedOn,
    OdometerKm,
    CostMinor,
    LedgerEntryId,
}

#[derive(Iden)]
enum FuelPurchases {
    Table,
    Id,
    UserId,
    VehicleId,
    PurchasedOn,
    OdometerKm,
    LitersMilli,
    TotalMinor,
    Fuel,
    LedgerEntryId,
}

#[derive(Iden)]
enum Purchases {
    Table,
    Id,
    UserId,
    Store,
    City,
    PurchasedOn,
    TotalMinor,
    Itemized,
    LedgerEntryId,
    CreatedAt,
}

#[derive(Iden)]
enum PurchaseLines {
    Table,
    Id,
    PurchaseId,
    Name,
    Brand,
    QuantityMilli,
    Unit,
    UnitPriceMinor,
    AddedToStock,
    StockItemId,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vehicles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Vehicles::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Vehicles::OwnerId).string().not_null())
                    .col(ColumnDef::new(Vehicles::Name).string().not_null())
                    .col(ColumnDef::new(Vehicles::Model).string().not_null())
                    .col(ColumnDef::new(Vehicles::Plate).string())
                    .col(
                        ColumnDef::new(Vehicles::OdometerKm)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-vehicles-owner_id")
                            .from(Vehicles::Table, Vehicles::OwnerId)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MaintenanceServices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MaintenanceServices::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MaintenanceServices::VehicleId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MaintenanceServices::Name).string().not_null())
                    .col(ColumnDef::new(MaintenanceServices::IntervalKm).big_integer())
                    .col(ColumnDef::new(MaintenanceServices::IntervalDays).big_integer())
                    .col(
                        ColumnDef::new(MaintenanceServices::LastKm)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MaintenanceServices::LastOn).date().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-maintenance_services-vehicle_id")
                            .from(MaintenanceServices::Table, MaintenanceServices::VehicleId)
                            .to(Vehicles::Table, Vehicles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MaintenanceRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MaintenanceRecords::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MaintenanceRecords::UserId).string().not_null())
                    .col(
                        ColumnDef::new(MaintenanceRecords::VehicleId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MaintenanceRecords::ServiceId).string())
                    .col(
                        ColumnDef::new(MaintenanceRecords::Description)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MaintenanceRecords::PerformedOn)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MaintenanceRecords::OdometerKm)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MaintenanceRecords::CostMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MaintenanceRecords::LedgerEntryId).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-maintenance_records-vehicle_id")
                            .from(MaintenanceRecords::Table, MaintenanceRecords::VehicleId)
                            .to(Vehicles::Table, Vehicles::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-maintenance_records-service_id")
                            .from(MaintenanceRecords::Table, MaintenanceRecords::ServiceId)
                            .to(MaintenanceServices::Table, MaintenanceServices::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-maintenance_records-ledger_entry_id")
                            .from(MaintenanceRecords::Table, MaintenanceRecords::LedgerEntryId)
                            .to(LedgerEntries::Table, LedgerEntries::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-maintenance_records-ledger_entry_id-unique")
                    .table(MaintenanceRecords::Table)
                    .col(MaintenanceRecords::LedgerEntryId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FuelPurchases::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FuelPurchases::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FuelPurchases::UserId).string().not_null())
                    .col(ColumnDef::new(FuelPurchases::VehicleId).string().not_null())
                    .col(ColumnDef::new(FuelPurchases::PurchasedOn).date().not_null())
                    .col(
                        ColumnDef::new(FuelPurchases::OdometerKm)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FuelPurchases::LitersMilli)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FuelPurchases::TotalMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(FuelPurchases::Fuel).string().not_null())
                    .col(ColumnDef::new(FuelPurchases::LedgerEntryId).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-fuel_purchases-vehicle_id")
                            .from(FuelPurchases::Table, FuelPurchases::VehicleId)
                            .to(Vehicles::Table, Vehicles::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-fuel_purchases-ledger_entry_id")
                            .from(FuelPurchases::Table, FuelPurchases::LedgerEntryId)
                            .to(LedgerEntries::Table, LedgerEntries::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-fuel_purchases-ledger_entry_id-unique")
                    .table(FuelPurchases::Table)
                    .col(FuelPurchases::LedgerEntryId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Purchases::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Purchases::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Purchases::UserId).string().not_null())
                    .col(ColumnDef::new(Purchases::Store).string().not_null())
                    .col(ColumnDef::new(Purchases::City).string())
                    .col(ColumnDef::new(Purchases::PurchasedOn).date().not_null())
                    .col(
                        ColumnDef::new(Purchases::TotalMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Purchases::Itemized)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Purchases::LedgerEntryId).string())
                    .col(ColumnDef::new(Purchases::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-purchases-user_id")
                            .from(Purchases::Table, Purchases::UserId)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-purchases-ledger_entry_id")
                            .from(Purchases::Table, Purchases::LedgerEntryId)
                            .to(LedgerEntries::Table, LedgerEntries::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-purchases-ledger_entry_id-unique")
                    .table(Purchases::Table)
                    .col(Purchases::LedgerEntryId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PurchaseLines::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseLines::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PurchaseLines::PurchaseId).string().not_null())
                    .col(ColumnDef::new(PurchaseLines::Name).string().not_null())
                    .col(ColumnDef::new(PurchaseLines::Brand).string())
                    .col(
                        ColumnDef::new(PurchaseLines::QuantityMilli)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(PurchaseLines::QuantityMilli).gt(0)),
                    )
                    .col(ColumnDef::new(PurchaseLines::Unit).string())
                    .col(
                        ColumnDef::new(PurchaseLines::UnitPriceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseLines::AddedToStock)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(PurchaseLines::StockItemId).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-purchase_lines-purchase_id")
                            .from(PurchaseLines::Table, PurchaseLines::PurchaseId)
                            .to(Purchases::Table, Purchases::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-purchase_lines-stock_item_id")
                            .from(PurchaseLines::Table, PurchaseLines::StockItemId)
                            .to(StockItems::Table, StockItems::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-purchase_lines-purchase_id")
                    .table(PurchaseLines::Table)
                    .col(PurchaseLines::PurchaseId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PurchaseLines::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Purchases::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FuelPurchases::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MaintenanceRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MaintenanceServices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Vehicles::Table).to_owned())
            .await?;
        Ok(())
    }
}
