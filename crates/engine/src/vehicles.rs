//! Vehicles. Only what the ledger synchronizers touch: identity for the entry
//! description and an odometer that maintenance and fuel events push forward.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub model: String,
    pub plate: Option<String>,
    pub odometer_km: i64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "vehicles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub model: String,
    pub plate: Option<String>,
    pub odometer_km: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::maintenance_services::Entity")]
    Services,
}

impl Related<super::maintenance_services::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Services.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Vehicle {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "vehicle")?,
            owner_id: model.owner_id,
            name: model.name,
            model: model.model,
            plate: model.plate,
            odometer_km: model.odometer_km,
        })
    }
}
