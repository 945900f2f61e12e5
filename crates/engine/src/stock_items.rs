//! Stock rows.
//!
//! Household pantry, pet supplies and personal items share one table with a
//! kind discriminator. The columns that only make sense for one kind are
//! folded into [`StockPlace`] on the domain side, so a pet row without a pet
//! cannot be represented.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, Quantity, util::parse_uuid};

/// Opaque reference to one stock row, whatever its kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockHandle(pub Uuid);

impl StockHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StockHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockKind {
    Household,
    Pet,
    Personal,
}

impl StockKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Household => "household",
            Self::Pet => "pet",
            Self::Personal => "personal",
        }
    }
}

impl TryFrom<&str> for StockKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "household" => Ok(Self::Household),
            "pet" => Ok(Self::Pet),
            "personal" => Ok(Self::Personal),
            other => Err(EngineError::Validation(format!("invalid stock kind: {other}"))),
        }
    }
}

/// Where a stock row lives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StockPlace {
    Household {
        room: Option<String>,
        spot: Option<String>,
    },
    Pet {
        pet: String,
    },
    Personal {
        owner: String,
    },
}

impl StockPlace {
    pub fn kind(&self) -> StockKind {
        match self {
            Self::Household { .. } => StockKind::Household,
            Self::Pet { .. } => StockKind::Pet,
            Self::Personal { .. } => StockKind::Personal,
        }
    }

    /// Human-readable location, frozen into history entries.
    pub fn label(&self) -> String {
        match self {
            Self::Household { room, spot } => match (room.as_deref(), spot.as_deref()) {
                (Some(room), Some(spot)) => format!("{room} - {spot}"),
                (Some(only), None) | (None, Some(only)) => only.to_string(),
                (None, None) => "Household".to_string(),
            },
            Self::Pet { pet } => format!("Pet: {pet}"),
            Self::Personal { owner } => format!("User: {owner}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItem {
    pub handle: StockHandle,
    pub name: String,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub quantity: Quantity,
    pub unit_price: Option<Money>,
    pub min_quantity: Option<Quantity>,
    pub ideal_quantity: Option<Quantity>,
    pub expires_on: Option<NaiveDate>,
    pub place: StockPlace,
    pub created_at: DateTime<Utc>,
}

impl StockItem {
    pub fn kind(&self) -> StockKind {
        self.place.kind()
    }

    /// Below the configured minimum. Rows without a minimum are never low.
    pub fn is_low(&self) -> bool {
        self.min_quantity.is_some_and(|min| self.quantity < min)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "stock_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub kind: String,
    pub name: String,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub quantity_milli: i64,
    pub unit_price_minor: Option<i64>,
    pub min_milli: Option<i64>,
    pub ideal_milli: Option<i64>,
    pub expires_on: Option<Date>,
    pub room: Option<String>,
    pub spot: Option<String>,
    pub pet: Option<String>,
    pub owner_id: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::stock_history::Entity")]
    History,
    #[sea_orm(has_many = "super::consumption_links::Entity")]
    ConsumptionLinks,
}

impl Related<super::stock_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::History.def()
    }
}

impl Related<super::consumption_links::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ConsumptionLinks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub(crate) fn place(&self) -> Result<StockPlace, EngineError> {
        let kind = StockKind::try_from(self.kind.as_str())?;
        let mismatch = || {
            EngineError::Validation(format!(
                "stock row {} has place columns that do not match kind {}",
                self.id,
                kind.as_str()
            ))
        };
        match kind {
            StockKind::Household => Ok(StockPlace::Household {
                room: self.room.clone(),
                spot: self.spot.clone(),
            }),
            StockKind::Pet => self
                .pet
                .clone()
                .map(|pet| StockPlace::Pet { pet })
                .ok_or_else(mismatch),
            StockKind::Personal => self
                .owner_id
                .clone()
                .map(|owner| StockPlace::Personal { owner })
                .ok_or_else(mismatch),
        }
    }

    pub(crate) fn quantity(&self) -> Quantity {
        Quantity::from_milli(self.quantity_milli)
    }
}

impl From<&StockItem> for ActiveModel {
    fn from(item: &StockItem) -> Self {
        let (room, spot, pet, owner_id) = match &item.place {
            StockPlace::Household { room, spot } => (room.clone(), spot.clone(), None, None),
            StockPlace::Pet { pet } => (None, None, Some(pet.clone()), None),
            StockPlace::Personal { owner } => (None, None, None, Some(owner.clone())),
        };
        Self {
            id: ActiveValue::Set(item.handle.to_string()),
            kind: ActiveValue::Set(item.kind().as_str().to_string()),
            name: ActiveValue::Set(item.name.clone()),
            category: ActiveValue::Set(item.category.clone()),
            unit: ActiveValue::Set(item.unit.clone()),
            quantity_milli: ActiveValue::Set(item.quantity.milli()),
            unit_price_minor: ActiveValue::Set(item.unit_price.map(Money::minor)),
            min_milli: ActiveValue::Set(item.min_quantity.map(Quantity::milli)),
            ideal_milli: ActiveValue::Set(item.ideal_quantity.map(Quantity::milli)),
            expires_on: ActiveValue::Set(item.expires_on),
            room: ActiveValue::Set(room),
            spot: ActiveValue::Set(spot),
            pet: ActiveValue::Set(pet),
            owner_id: ActiveValue::Set(owner_id),
            created_at: ActiveValue::Set(item.created_at),
        }
    }
}

impl TryFrom<Model> for StockItem {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let place = model.place()?;
        Ok(Self {
            handle: StockHandle(parse_uuid(&model.id, "stock item")?),
            name: model.name,
            category: model.category,
            unit: model.unit,
            quantity: Quantity::from_milli(model.quantity_milli),
            unit_price: model.unit_price_minor.map(Money::new),
            min_quantity: model.min_milli.map(Quantity::from_milli),
            ideal_quantity: model.ideal_milli.map(Quantity::from_milli),
            expires_on: model.expires_on,
            place,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(kind: &str) -> Model {
        Model {
            id: Uuid::new_v4().to_string(),
            kind: kind.to_string(),
            name: "Kibble".to_string(),
            category: None,
            unit: Some("kg".to_string()),
            quantity_milli: 2_000,
            unit_price_minor: None,
            min_milli: Some(2_500),
            ideal_milli: None,
            expires_on: None,
            room: None,
            spot: None,
            pet: None,
            owner_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn pet_row_without_pet_is_rejected() {
        assert!(StockItem::try_from(model("pet")).is_err());
    }

    #[test]
    fn pet_row_maps_to_pet_place() {
        let mut row = model("pet");
        row.pet = Some("Rex".to_string());
        let item = StockItem::try_from(row).unwrap();
        assert_eq!(item.kind(), StockKind::Pet);
        assert_eq!(item.place.label(), "Pet: Rex");
        assert!(item.is_low());
    }

    #[test]
    fn household_label_joins_room_and_spot() {
        let place = StockPlace::Household {
            room: Some("Kitchen".to_string()),
            spot: Some("Pantry".to_string()),
        };
        assert_eq!(place.label(), "Kitchen - Pantry");
        let bare = StockPlace::Household {
            room: None,
            spot: None,
        };
        assert_eq!(bare.label(), "Household");
    }
}
