//! Ledger entries.
//!
//! An entry is a signed money event against one account. Entries written by a
//! synchronizer carry a [`SourceRef`] naming the event they mirror; the pair
//! `(source_kind, source_id)` is unique, so every source event binds to at
//! most one entry.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money,
    util::{parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Income,
    Expense,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for EntryKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::Validation(format!("invalid entry kind: {other}"))),
        }
    }
}

/// Who wrote an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryOrigin {
    Manual,
    Synchronized,
}

impl EntryOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Synchronized => "synchronized",
        }
    }
}

impl TryFrom<&str> for EntryOrigin {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "manual" => Ok(Self::Manual),
            "synchronized" => Ok(Self::Synchronized),
            other => Err(EngineError::Validation(format!("invalid entry origin: {other}"))),
        }
    }
}

/// The source event an entry mirrors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SourceRef {
    Maintenance(Uuid),
    Fuel(Uuid),
    Purchase(Uuid),
}

impl SourceRef {
    pub fn kind_str(self) -> &'static str {
        match self {
            Self::Maintenance(_) => "maintenance",
            Self::Fuel(_) => "fuel",
            Self::Purchase(_) => "purchase",
        }
    }

    pub fn id(self) -> Uuid {
        match self {
            Self::Maintenance(id) | Self::Fuel(id) | Self::Purchase(id) => id,
        }
    }

    fn from_columns(kind: Option<&str>, id: Option<&str>) -> Result<Option<Self>, EngineError> {
        match (kind, id) {
            (None, None) => Ok(None),
            (Some(kind), Some(id)) => {
                let id = parse_uuid(id, "source")?;
                match kind {
                    "maintenance" => Ok(Some(Self::Maintenance(id))),
                    "fuel" => Ok(Some(Self::Fuel(id))),
                    "purchase" => Ok(Some(Self::Purchase(id))),
                    other => Err(EngineError::Validation(format!("invalid source kind: {other}"))),
                }
            }
            _ => Err(EngineError::Validation(
                "source kind and source id must be set together".to_string(),
            )),
        }
    }
}

impl std::fmt::Display for SourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind_str(), self.id())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub account_id: Uuid,
    pub user_id: String,
    pub name: String,
    pub note: Option<String>,
    pub kind: EntryKind,
    /// Always non-negative; the direction lives in `kind`.
    pub amount: Money,
    pub occurred_on: NaiveDate,
    pub category_id: Option<Uuid>,
    pub source: Option<SourceRef>,
    pub origin: EntryOrigin,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Contribution of this entry to its account balance.
    pub fn signed_amount(&self) -> Money {
        match self.kind {
            EntryKind::Income => self.amount,
            EntryKind::Expense => -self.amount,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub account_id: String,
    pub user_id: String,
    pub name: String,
    pub note: Option<String>,
    pub kind: String,
    pub amount_minor: i64,
    pub occurred_on: Date,
    pub category_id: Option<String>,
    pub source_kind: Option<String>,
    pub source_id: Option<String>,
    pub origin: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Account,
    #[sea_orm(
        belongs_to = "super::ledger_categories::Entity",
        from = "Column::CategoryId",
        to = "super::ledger_categories::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Category,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl Related<super::ledger_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&LedgerEntry> for ActiveModel {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id.to_string()),
            account_id: ActiveValue::Set(entry.account_id.to_string()),
            user_id: ActiveValue::Set(entry.user_id.clone()),
            name: ActiveValue::Set(entry.name.clone()),
            note: ActiveValue::Set(entry.note.clone()),
            kind: ActiveValue::Set(entry.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(entry.amount.minor()),
            occurred_on: ActiveValue::Set(entry.occurred_on),
            category_id: ActiveValue::Set(entry.category_id.map(|id| id.to_string())),
            source_kind: ActiveValue::Set(entry.source.map(|s| s.kind_str().to_string())),
            source_id: ActiveValue::Set(entry.source.map(|s| s.id().to_string())),
            origin: ActiveValue::Set(entry.origin.as_str().to_string()),
            created_at: ActiveValue::Set(entry.created_at),
        }
    }
}

impl TryFrom<Model> for LedgerEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "ledger entry")?,
            account_id: parse_uuid(&model.account_id, "account")?,
            user_id: model.user_id,
            name: model.name,
            note: model.note,
            kind: EntryKind::try_from(model.kind.as_str())?,
            amount: Money::new(model.amount_minor),
            occurred_on: model.occurred_on,
            category_id: parse_optional_uuid(model.category_id.as_deref(), "category")?,
            source: SourceRef::from_columns(model.source_kind.as_deref(), model.source_id.as_deref())?,
            origin: EntryOrigin::try_from(model.origin.as_str())?,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_columns_must_pair() {
        let id = Uuid::new_v4().to_string();
        assert!(SourceRef::from_columns(Some("fuel"), None).is_err());
        assert!(SourceRef::from_columns(None, Some(&id)).is_err());
        assert_eq!(SourceRef::from_columns(None, None), Ok(None));
    }

    #[test]
    fn source_columns_round_trip_kind() {
        let id = Uuid::new_v4();
        let parsed =
            SourceRef::from_columns(Some("maintenance"), Some(&id.to_string())).unwrap();
        assert_eq!(parsed, Some(SourceRef::Maintenance(id)));
        assert!(SourceRef::from_columns(Some("laundry"), Some(&id.to_string())).is_err());
    }
}
