//! The module contains `Account` struct and its storage model.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, util::parse_uuid};

/// A financial account: a bank account, a wallet, a card.
///
/// The balance is never stored. It is derived on read as
/// `starting_balance + Σ income − Σ expense` over the account's ledger
/// entries, see [`Engine::balance`](crate::Engine::balance).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    /// Owning user. `None` marks a shared household account.
    pub user_id: Option<String>,
    pub starting_balance: Money,
    /// When set, expense writes that would leave the balance below zero are
    /// rejected.
    pub rejects_negative: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(
        name: String,
        user_id: Option<String>,
        starting_balance: Money,
        rejects_negative: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            user_id,
            starting_balance,
            rejects_negative,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub user_id: Option<String>,
    pub starting_balance_minor: i64,
    pub rejects_negative: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ledger_entries::Entity")]
    Entries,
}

impl Related<super::ledger_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(value: &Account) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            user_id: ActiveValue::Set(value.user_id.clone()),
            starting_balance_minor: ActiveValue::Set(value.starting_balance.minor()),
            rejects_negative: ActiveValue::Set(value.rejects_negative),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "account")?,
            name: model.name,
            user_id: model.user_id,
            starting_balance: Money::new(model.starting_balance_minor),
            rejects_negative: model.rejects_negative,
            created_at: model.created_at,
        })
    }
}
