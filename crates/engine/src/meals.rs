//! Meals, the event that consumes pantry stock.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealKind {
    Breakfast,
    Lunch,
    Snack,
    Dinner,
    Dessert,
}

impl MealKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Snack => "snack",
            Self::Dinner => "dinner",
            Self::Dessert => "dessert",
        }
    }
}

impl TryFrom<&str> for MealKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "breakfast" => Ok(Self::Breakfast),
            "lunch" => Ok(Self::Lunch),
            "snack" => Ok(Self::Snack),
            "dinner" => Ok(Self::Dinner),
            "dessert" => Ok(Self::Dessert),
            other => Err(EngineError::Validation(format!("invalid meal kind: {other}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meal {
    pub id: Uuid,
    pub user_id: String,
    pub eaten_on: NaiveDate,
    pub kind: MealKind,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "meals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub eaten_on: Date,
    pub kind: String,
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::consumption_links::Entity")]
    ConsumptionLinks,
}

impl Related<super::consumption_links::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ConsumptionLinks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Meal> for ActiveModel {
    fn from(meal: &Meal) -> Self {
        Self {
            id: ActiveValue::Set(meal.id.to_string()),
            user_id: ActiveValue::Set(meal.user_id.clone()),
            eaten_on: ActiveValue::Set(meal.eaten_on),
            kind: ActiveValue::Set(meal.kind.as_str().to_string()),
            notes: ActiveValue::Set(meal.notes.clone()),
            created_at: ActiveValue::Set(meal.created_at),
        }
    }
}

impl TryFrom<Model> for Meal {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "meal")?,
            user_id: model.user_id,
            eaten_on: model.eaten_on,
            kind: MealKind::try_from(model.kind.as_str())?,
            notes: model.notes,
            created_at: model.created_at,
        })
    }
}
