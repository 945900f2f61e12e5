//! Fuel purchases, mirrored into the ledger as expenses.

use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money, Quantity,
    util::{parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelKind {
    Gasoline,
    PremiumGasoline,
    Ethanol,
    Diesel,
    Cng,
}

impl FuelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gasoline => "gasoline",
            Self::PremiumGasoline => "premium_gasoline",
            Self::Ethanol => "ethanol",
            Self::Diesel => "diesel",
            Self::Cng => "cng",
        }
    }

    /// Label used in ledger descriptions.
    pub fn label(self) -> &'static str {
        match self {
            Self::Gasoline => "gasoline",
            Self::PremiumGasoline => "premium gasoline",
            Self::Ethanol => "ethanol",
            Self::Diesel => "diesel",
            Self::Cng => "CNG",
        }
    }
}

impl TryFrom<&str> for FuelKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "gasoline" => Ok(Self::Gasoline),
            "premium_gasoline" => Ok(Self::PremiumGasoline),
            "ethanol" => Ok(Self::Ethanol),
            "diesel" => Ok(Self::Diesel),
            "cng" => Ok(Self::Cng),
            other => Err(EngineError::Validation(format!("invalid fuel kind: {other}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelPurchase {
    pub id: Uuid,
    pub user_id: String,
    pub vehicle_id: Uuid,
    pub purchased_on: NaiveDate,
    pub odometer_km: i64,
    pub liters: Quantity,
    pub total: Money,
    pub fuel: FuelKind,
    pub ledger_entry_id: Option<Uuid>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "fuel_purchases")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub vehicle_id: String,
    pub purchased_on: Date,
    pub odometer_km: i64,
    pub liters_milli: i64,
    pub total_minor: i64,
    pub fuel: String,
    pub ledger_entry_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vehicles::Entity",
        from = "Column::VehicleId",
        to = "super::vehicles::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Vehicle,
}

impl Related<super::vehicles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vehicle.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for FuelPurchase {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "fuel purchase")?,
            user_id: model.user_id,
            vehicle_id: parse_uuid(&model.vehicle_id, "vehicle")?,
            purchased_on: model.purchased_on,
            odometer_km: model.odometer_km,
            liters: Quantity::from_milli(model.liters_milli),
            total: Money::new(model.total_minor),
            fuel: FuelKind::try_from(model.fuel.as_str())?,
            ledger_entry_id: parse_optional_uuid(model.ledger_entry_id.as_deref(), "ledger entry")?,
        })
    }
}
