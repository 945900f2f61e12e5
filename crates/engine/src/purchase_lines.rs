//! Purchase lines.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money, Quantity, StockHandle,
    util::{parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub id: Uuid,
    pub purchase_id: Uuid,
    pub name: String,
    pub brand: Option<String>,
    pub quantity: Quantity,
    pub unit: Option<String>,
    pub unit_price: Money,
    pub added_to_stock: bool,
    /// Stock row the line was put away into. Cleared if that row is deleted.
    pub stock_item: Option<StockHandle>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "purchase_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub purchase_id: String,
    pub name: String,
    pub brand: Option<String>,
    pub quantity_milli: i64,
    pub unit: Option<String>,
    pub unit_price_minor: i64,
    pub added_to_stock: bool,
    pub stock_item_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::purchases::Entity",
        from = "Column::PurchaseId",
        to = "super::purchases::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Purchase,
}

impl Related<super::purchases::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Purchase.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for PurchaseLine {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "purchase line")?,
            purchase_id: parse_uuid(&model.purchase_id, "purchase")?,
            name: model.name,
            brand: model.brand,
            quantity: Quantity::from_milli(model.quantity_milli),
            unit: model.unit,
            unit_price: Money::new(model.unit_price_minor),
            added_to_stock: model.added_to_stock,
            stock_item: parse_optional_uuid(model.stock_item_id.as_deref(), "stock item")?
                .map(StockHandle),
        })
    }
}
