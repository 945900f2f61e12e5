use sea_orm::DatabaseConnection;

use crate::{EngineError, ResultEngine};

mod accounts;
mod categories;
mod consumption;
mod fuel;
mod history;
mod ledger;
mod maintenance;
mod purchases;
mod stock;
mod sync;
mod vehicles;

pub use consumption::{MealDeletion, Refund, StaleLinkPolicy};
pub use history::{HistoryFilter, HistoryPage};
pub use ledger::LedgerListFilter;
pub use stock::StockListFilter;
pub use sync::{AccountSelection, SyncOutcome};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
///
/// Everything inside the block must go through `$tx`: the pool may hold a
/// single connection, so touching `self.database` while the transaction is
/// open would wait forever.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// Largest page any listing returns; bigger requests are clamped.
pub const MAX_PAGE_SIZE: u64 = 500;

fn page_size(limit: u64) -> ResultEngine<u64> {
    if limit == 0 {
        return Err(EngineError::Validation("limit must be > 0".to_string()));
    }
    Ok(limit.min(MAX_PAGE_SIZE))
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_name_is_trimmed() {
        assert_eq!(normalize_required_name("  Rice ", "stock"), Ok("Rice".to_string()));
        assert_eq!(
            normalize_required_name("   ", "stock"),
            Err(EngineError::Validation("stock name must not be empty".to_string()))
        );
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(page_size(20), Ok(20));
        assert_eq!(page_size(u64::MAX), Ok(MAX_PAGE_SIZE));
        assert!(matches!(page_size(0), Err(EngineError::Validation(_))));
    }

    #[test]
    fn optional_text_drops_blank() {
        assert_eq!(normalize_optional_text(Some("  ")), None);
        assert_eq!(normalize_optional_text(Some(" a ")), Some("a".to_string()));
        assert_eq!(normalize_optional_text(None), None);
    }
}
