use uuid::Uuid;

use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, prelude::*};

use crate::{CostKind, ResultEngine, ledger_categories, util::parse_uuid};

use super::{Engine, normalize_required_name};

fn normalize_category_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl Engine {
    /// Looks a category up by name (case and spacing insensitive), creating it
    /// on first use.
    pub(super) async fn category_id_or_create(
        &self,
        db_tx: &DatabaseTransaction,
        name: &str,
        cost_kind: CostKind,
    ) -> ResultEngine<Uuid> {
        let name = normalize_required_name(name, "category")?;
        let name_norm = normalize_category_key(&name);

        if let Some(existing) = ledger_categories::Entity::find()
            .filter(ledger_categories::Column::NameNorm.eq(name_norm.clone()))
            .one(db_tx)
            .await?
        {
            return parse_uuid(&existing.id, "category");
        }

        let id = Uuid::new_v4();
        ledger_categories::ActiveModel {
            id: ActiveValue::Set(id.to_string()),
            name: ActiveValue::Set(name),
            name_norm: ActiveValue::Set(name_norm),
            cost_kind: ActiveValue::Set(cost_kind.as_str().to_string()),
        }
        .insert(db_tx)
        .await?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_key_folds_case_and_spacing() {
        assert_eq!(normalize_category_key("  Vehicle   Maintenance "), "vehicle maintenance");
        assert_eq!(normalize_category_key("FUEL"), "fuel");
    }
}
