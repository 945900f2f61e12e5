//! Vehicle maintenance events, mirrored into the ledger as expenses.

use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money,
    util::{parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceRecord {
    pub id: Uuid,
    pub user_id: String,
    pub vehicle_id: Uuid,
    pub service_id: Option<Uuid>,
    pub description: String,
    pub performed_on: NaiveDate,
    pub odometer_km: i64,
    pub cost: Money,
    /// The synchronized ledger entry, if one was created.
    pub ledger_entry_id: Option<Uuid>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "maintenance_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub vehicle_id: String,
    pub service_id: Option<String>,
    pub description: String,
    pub performed_on: Date,
    pub odometer_km: i64,
    pub cost_minor: i64,
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

impl TryFrom<Model> for MaintenanceRecord {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "maintenance record")?,
            user_id: model.user_id,
            vehicle_id: parse_uuid(&model.vehicle_id, "vehicle")?,
            service_id: parse_optional_uuid(model.service_id.as_deref(), "maintenance service")?,
            description: model.description,
            performed_on: model.performed_on,
            odometer_km: model.odometer_km,
            cost: Money::new(model.cost_minor),
            ledger_entry_id: parse_optional_uuid(model.ledger_entry_id.as_deref(), "ledger entry")?,
        })
    }
}
