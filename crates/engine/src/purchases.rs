//! Purchase aggregate: a header plus its itemized lines.
//!
//! For an itemized purchase the header total is always
//! `round_half_up(Σ quantity × unit_price)`, with the sum taken exactly over
//! thousandths and rounded once.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money, PurchaseLine,
    quantity::MILLI,
    util::{div_round_half_up, parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: Uuid,
    pub user_id: String,
    pub store: String,
    pub city: Option<String>,
    pub purchased_on: NaiveDate,
    pub total: Money,
    /// When set, `total` is derived from the lines.
    pub itemized: bool,
    pub ledger_entry_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<PurchaseLine>,
}

/// Total of a set of lines, rounded once.
///
/// Fails with `InvalidAmount` when the total does not fit in [`Money`].
pub fn itemized_total<'a>(
    lines: impl IntoIterator<Item = &'a PurchaseLine>,
) -> Result<Money, EngineError> {
    let out_of_range = || EngineError::InvalidAmount("itemized total out of range".to_string());
    let exact = lines.into_iter().try_fold(0_i128, |acc, line| {
        acc.checked_add(i128::from(line.quantity.milli()) * i128::from(line.unit_price.minor()))
            .ok_or_else(out_of_range)
    })?;
    let rounded = div_round_half_up(exact, i128::from(MILLI));
    i64::try_from(rounded)
        .map(Money::new)
        .map_err(|_| out_of_range())
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "purchases")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub store: String,
    pub city: Option<String>,
    pub purchased_on: Date,
    pub total_minor: i64,
    pub itemized: bool,
    pub ledger_entry_id: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::purchase_lines::Entity")]
    Lines,
}

impl Related<super::purchase_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<(Model, Vec<PurchaseLine>)> for Purchase {
    type Error = EngineError;

    fn try_from((model, lines): (Model, Vec<PurchaseLine>)) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "purchase")?,
            user_id: model.user_id,
            store: model.store,
            city: model.city,
            purchased_on: model.purchased_on,
            total: Money::new(model.total_minor),
            itemized: model.itemized,
            ledger_entry_id: parse_optional_uuid(model.ledger_entry_id.as_deref(), "ledger entry")?,
            created_at: model.created_at,
            lines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Quantity;

    fn line(quantity_milli: i64, price_minor: i64) -> PurchaseLine {
        PurchaseLine {
            id: Uuid::new_v4(),
            purchase_id: Uuid::new_v4(),
            name: "x".to_string(),
            brand: None,
            quantity: Quantity::from_milli(quantity_milli),
            unit: None,
            unit_price: Money::new(price_minor),
            added_to_stock: false,
            stock_item: None,
        }
    }

    #[test]
    fn total_of_whole_units() {
        let lines = [line(2_000, 350), line(1_000, 1_000)];
        assert_eq!(itemized_total(&lines), Ok(Money::new(1_700)));
    }

    #[test]
    fn total_rounds_once_over_the_exact_sum() {
        // 0.333 × 0.05 = 0.01665 three times: rounding per line would give
        // 0.06, the exact sum 0.04995 rounds to 0.05.
        let lines = [line(333, 5), line(333, 5), line(333, 5)];
        assert_eq!(itemized_total(&lines), Ok(Money::new(5)));
    }

    #[test]
    fn total_of_no_lines_is_zero() {
        assert_eq!(itemized_total(&Vec::<PurchaseLine>::new()), Ok(Money::ZERO));
    }

    #[test]
    fn total_out_of_range_is_an_error() {
        let lines = [line(i64::MAX, i64::MAX)];
        assert_eq!(
            itemized_total(&lines),
            Err(EngineError::InvalidAmount("itemized total out of range".to_string()))
        );
        let huge = line(i64::MAX, i64::MAX);
        let lines = [huge.clone(), huge.clone(), huge];
        assert!(matches!(itemized_total(&lines), Err(EngineError::InvalidAmount(_))));
    }
}
