//! Meal-to-stock consumption links.
//!
//! A link records how much of one stock row a meal consumed. The stock side
//! is a restricting foreign key: a row cannot be deleted while a link points
//! at it, which is what makes a refund possible later.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Quantity, StockHandle, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionLink {
    pub id: Uuid,
    pub meal_id: Uuid,
    pub item: StockHandle,
    pub quantity: Quantity,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "consumption_links")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub meal_id: String,
    pub stock_item_id: String,
    pub quantity_milli: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::meals::Entity",
        from = "Column::MealId",
        to = "super::meals::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Meal,
    #[sea_orm(
        belongs_to = "super::stock_items::Entity",
        from = "Column::StockItemId",
        to = "super::stock_items::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    StockItem,
}

impl Related<super::meals::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Meal.def()
    }
}

impl Related<super::stock_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for ConsumptionLink {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "consumption link")?,
            meal_id: parse_uuid(&model.meal_id, "meal")?,
            item: StockHandle(parse_uuid(&model.stock_item_id, "stock item")?),
            quantity: Quantity::from_milli(model.quantity_milli),
            created_at: model.created_at,
        })
    }
}
