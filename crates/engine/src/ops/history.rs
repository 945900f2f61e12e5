use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*,
};

use crate::{
    EngineError, HistoryEntry, Movement, Quantity, ResultEngine, StockHandle, StockKind,
    stock_history, stock_items,
};

use super::{Engine, page_size, with_tx};

/// Filters for reading the stock history.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct HistoryFilter {
    pub stock_kind: Option<StockKind>,
    /// If present, acts as an allow-list of movements to return.
    pub movements: Option<Vec<Movement>>,
    pub actor: Option<String>,
    pub item: Option<StockHandle>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryPage {
    pub entries: Vec<HistoryEntry>,
    /// Pass back to fetch the next (older) page. `None` on the last page.
    pub next_cursor: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct HistoryCursor {
    before_id: i64,
}

impl HistoryCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::Validation("invalid history cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::Validation("invalid history cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::Validation("invalid history cursor".to_string()))
    }
}

fn validate_history_filter(filter: &HistoryFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::Validation(
            "invalid range: from must be < to".to_string(),
        ));
    }
    if filter.movements.as_ref().is_some_and(|m| m.is_empty()) {
        return Err(EngineError::Validation(
            "movements must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// One movement about to be appended.
pub(super) struct HistoryRecord<'a> {
    /// Row as it should be described: after an edit, before a deletion.
    pub row: &'a stock_items::Model,
    pub movement: Movement,
    pub before: Quantity,
    pub after: Quantity,
    pub note: Option<String>,
    pub actor: &'a str,
}

impl Engine {
    /// Reads the stock history newest first, with cursor-based pagination.
    ///
    /// Entries of deleted rows are included and still carry the name and
    /// location they had when written.
    pub async fn stock_history(
        &self,
        filter: &HistoryFilter,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultEngine<HistoryPage> {
        validate_history_filter(filter)?;
        let limit = page_size(limit)?;
        let cursor = cursor.map(HistoryCursor::decode).transpose()?;

        with_tx!(self, |db_tx| {
            let mut query = stock_history::Entity::find();
            if let Some(kind) = filter.stock_kind {
                query = query.filter(stock_history::Column::KindSnapshot.eq(kind.as_str()));
            }
            if let Some(movements) = &filter.movements {
                let movements: Vec<&str> = movements.iter().map(|m| m.as_str()).collect();
                query = query.filter(stock_history::Column::Movement.is_in(movements));
            }
            if let Some(actor) = filter.actor.as_deref() {
                query = query.filter(stock_history::Column::Actor.eq(actor));
            }
            if let Some(item) = filter.item {
                query = query.filter(stock_history::Column::StockItemId.eq(item.to_string()));
            }
            if let Some(from) = filter.from {
                query = query.filter(stock_history::Column::RecordedAt.gte(from));
            }
            if let Some(to) = filter.to {
                query = query.filter(stock_history::Column::RecordedAt.lt(to));
            }
            if let Some(cursor) = &cursor {
                query = query.filter(stock_history::Column::Id.lt(cursor.before_id));
            }

            let mut models = query
                .order_by_desc(stock_history::Column::Id)
                .limit(limit.saturating_add(1))
                .all(&db_tx)
                .await?;

            let has_more = models.len() as u64 > limit;
            models.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
            let next_cursor = match (has_more, models.last()) {
                (true, Some(last)) => Some(HistoryCursor { before_id: last.id }.encode()?),
                _ => None,
            };

            let entries = models
                .into_iter()
                .map(HistoryEntry::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            Ok(HistoryPage {
                entries,
                next_cursor,
            })
        })
    }

    pub(super) async fn append_history(
        &self,
        db_tx: &DatabaseTransaction,
        record: HistoryRecord<'_>,
    ) -> ResultEngine<i64> {
        let location = record.row.place()?.label();
        let moved = (record.after - record.before).abs();
        let model = stock_history::ActiveModel {
            id: ActiveValue::NotSet,
            stock_item_id: ActiveValue::Set(Some(record.row.id.clone())),
            movement: ActiveValue::Set(record.movement.as_str().to_string()),
            kind_snapshot: ActiveValue::Set(record.row.kind.clone()),
            quantity_moved_milli: ActiveValue::Set(moved.milli()),
            quantity_before_milli: ActiveValue::Set(record.before.milli()),
            quantity_after_milli: ActiveValue::Set(record.after.milli()),
            item_name_snapshot: ActiveValue::Set(record.row.name.clone()),
            location_snapshot: ActiveValue::Set(location),
            note: ActiveValue::Set(record.note),
            actor: ActiveValue::Set(record.actor.to_string()),
            recorded_at: ActiveValue::Set(Utc::now()),
        }
        .insert(db_tx)
        .await?;
        Ok(model.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trips_and_rejects_garbage() {
        let encoded = HistoryCursor { before_id: 42 }.encode().unwrap();
        assert_eq!(HistoryCursor::decode(&encoded).unwrap().before_id, 42);
        assert!(HistoryCursor::decode("not-a-cursor").is_err());
    }

    #[test]
    fn empty_movement_list_is_rejected() {
        let filter = HistoryFilter {
            movements: Some(Vec::new()),
            ..Default::default()
        };
        assert!(validate_history_filter(&filter).is_err());
    }
}
