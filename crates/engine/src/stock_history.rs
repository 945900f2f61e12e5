//! Append-only stock movement log.
//!
//! Entries copy the row's name and location at write time, so they stay
//! readable after the row is deleted (the foreign key is set to NULL, the
//! snapshots are never touched). Nothing in the engine updates an entry once
//! written.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Quantity, StockHandle, StockKind, util::parse_optional_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Movement {
    /// First intake of a new row.
    Create,
    /// Manual or meal-driven decrement.
    Withdraw,
    /// Refund of a meal withdrawal.
    WithdrawReversal,
    /// Manual increment.
    Restock,
    Edit,
    Delete,
    /// Intake of a purchase line.
    PurchaseIntake,
}

impl Movement {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Withdraw => "withdraw",
            Self::WithdrawReversal => "withdraw_reversal",
            Self::Restock => "restock",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::PurchaseIntake => "purchase_intake",
        }
    }
}

impl TryFrom<&str> for Movement {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "create" => Ok(Self::Create),
            "withdraw" => Ok(Self::Withdraw),
            "withdraw_reversal" => Ok(Self::WithdrawReversal),
            "restock" => Ok(Self::Restock),
            "edit" => Ok(Self::Edit),
            "delete" => Ok(Self::Delete),
            "purchase_intake" => Ok(Self::PurchaseIntake),
            other => Err(EngineError::Validation(format!("invalid movement: {other}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    /// `None` once the row has been deleted.
    pub item: Option<StockHandle>,
    pub movement: Movement,
    pub stock_kind: StockKind,
    /// Magnitude of the movement.
    pub quantity_moved: Quantity,
    pub quantity_before: Quantity,
    pub quantity_after: Quantity,
    pub item_name: String,
    pub location: String,
    pub note: Option<String>,
    pub actor: String,
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// `after − before`; negative for withdrawals and deletions.
    pub fn signed_delta(&self) -> Quantity {
        self.quantity_after - self.quantity_before
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "stock_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub stock_item_id: Option<String>,
    pub movement: String,
    pub kind_snapshot: String,
    pub quantity_moved_milli: i64,
    pub quantity_before_milli: i64,
    pub quantity_after_milli: i64,
    pub item_name_snapshot: String,
    pub location_snapshot: String,
    pub note: Option<String>,
    pub actor: String,
    pub recorded_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stock_items::Entity",
        from = "Column::StockItemId",
        to = "super::stock_items::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    StockItem,
}

impl Related<super::stock_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for HistoryEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let item: Option<Uuid> = parse_optional_uuid(model.stock_item_id.as_deref(), "stock item")?;
        Ok(Self {
            id: model.id,
            item: item.map(StockHandle),
            movement: Movement::try_from(model.movement.as_str())?,
            stock_kind: StockKind::try_from(model.kind_snapshot.as_str())?,
            quantity_moved: Quantity::from_milli(model.quantity_moved_milli),
            quantity_before: Quantity::from_milli(model.quantity_before_milli),
            quantity_after: Quantity::from_milli(model.quantity_after_milli),
            item_name: model.item_name_snapshot,
            location: model.location_snapshot,
            note: model.note,
            actor: model.actor,
            recorded_at: model.recorded_at,
        })
    }
}
