//! Per-vehicle maintenance catalog (oil change, tyre rotation, ...).
//!
//! Each service remembers when and at which odometer reading it was last
//! performed; recording a maintenance event against it moves both forward.

use chrono::{Days, NaiveDate};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceService {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub name: String,
    pub interval_km: Option<i64>,
    pub interval_days: Option<i64>,
    pub last_km: i64,
    pub last_on: NaiveDate,
}

impl MaintenanceService {
    pub fn next_due_km(&self) -> Option<i64> {
        self.interval_km.map(|km| self.last_km + km)
    }

    pub fn next_due_on(&self) -> Option<NaiveDate> {
        self.interval_days
            .and_then(|days| u64::try_from(days).ok())
            .and_then(|days| self.last_on.checked_add_days(Days::new(days)))
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "maintenance_services")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub vehicle_id: String,
    pub name: String,
    pub interval_km: Option<i64>,
    pub interval_days: Option<i64>,
    pub last_km: i64,
    pub last_on: Date,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vehicles::Entity",
        from = "Column::VehicleId",
        to = "super::vehicles::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Vehicle,
}

impl Related<super::vehicles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vehicle.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for MaintenanceService {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "maintenance service")?,
            vehicle_id: parse_uuid(&model.vehicle_id, "vehicle")?,
            name: model.name,
            interval_km: model.interval_km,
            interval_days: model.interval_days,
            last_km: model.last_km,
            last_on: model.last_on,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_due_adds_intervals() {
        let service = MaintenanceService {
            id: Uuid::new_v4(),
            vehicle_id: Uuid::new_v4(),
            name: "Oil change".to_string(),
            interval_km: Some(10_000),
            interval_days: Some(180),
            last_km: 42_000,
            last_on: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        };
        assert_eq!(service.next_due_km(), Some(52_000));
        assert_eq!(service.next_due_on(), NaiveDate::from_ymd_opt(2024, 7, 8));
    }
}
