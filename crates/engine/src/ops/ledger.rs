use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*,
};

use crate::{
    CostKind, EngineError, EntryKind, EntryOrigin, EntryUpdate, LedgerEntry, Money, NewEntry,
    ResultEngine, SourceRef, ledger_entries,
    util::{parse_uuid, validate_date_range},
};

use super::{
    Engine, normalize_optional_text, normalize_required_name, page_size, with_tx,
};

/// Filters for listing ledger entries.
///
/// `from` and `to` are inclusive dates.
#[derive(Clone, Debug, Default)]
pub struct LedgerListFilter {
    pub account_id: Option<Uuid>,
    pub user_id: Option<String>,
    /// If present, acts as an allow-list of kinds to return.
    pub kinds: Option<Vec<EntryKind>>,
    pub origin: Option<EntryOrigin>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

trait ApplyLedgerFilters: QueryFilter + Sized {
    fn apply_ledger_filters(self, filter: &LedgerListFilter) -> Self;
}

impl<T> ApplyLedgerFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_ledger_filters(mut self, filter: &LedgerListFilter) -> Self {
        if let Some(account_id) = filter.account_id {
            self = self.filter(ledger_entries::Column::AccountId.eq(account_id.to_string()));
        }
        if let Some(user_id) = filter.user_id.as_deref() {
            self = self.filter(ledger_entries::Column::UserId.eq(user_id));
        }
        if let Some(kinds) = &filter.kinds {
            let kinds: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
            self = self.filter(ledger_entries::Column::Kind.is_in(kinds));
        }
        if let Some(origin) = filter.origin {
            self = self.filter(ledger_entries::Column::Origin.eq(origin.as_str()));
        }
        if let Some(from) = filter.from {
            self = self.filter(ledger_entries::Column::OccurredOn.gte(from));
        }
        if let Some(to) = filter.to {
            self = self.filter(ledger_entries::Column::OccurredOn.lte(to));
        }
        self
    }
}

fn validate_list_filter(filter: &LedgerListFilter) -> ResultEngine<()> {
    validate_date_range(filter.from, filter.to)?;
    if filter.kinds.as_ref().is_some_and(|k| k.is_empty()) {
        return Err(EngineError::Validation("kinds must not be empty".to_string()));
    }
    Ok(())
}

fn ensure_manual(model: &ledger_entries::Model) -> ResultEngine<()> {
    if model.origin != EntryOrigin::Manual.as_str() {
        return Err(EngineError::ManagedEntry(format!(
            "entry {} mirrors a {} and changes with it",
            model.id,
            model.source_kind.as_deref().unwrap_or("source event")
        )));
    }
    Ok(())
}

impl Engine {
    /// Records a manual income or expense.
    ///
    /// Expenses on an account with `rejects_negative` are checked against
    /// the current balance before anything is written.
    pub async fn new_entry(&self, cmd: NewEntry) -> ResultEngine<Uuid> {
        if !cmd.amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "amount must be > 0".to_string(),
            ));
        }
        let name = normalize_required_name(&cmd.name, "entry")?;
        let note = normalize_optional_text(cmd.note.as_deref());

        with_tx!(self, |db_tx| {
            let account = self.require_account(&db_tx, cmd.account_id).await?;
            self.ensure_account_writable(&account, &cmd.user_id)?;
            if cmd.kind == EntryKind::Expense {
                self.ensure_expense_allowed(&db_tx, &account, cmd.amount, None)
                    .await?;
            }

            let category_id = match cmd.category.as_deref() {
                Some(category) => Some(
                    self.category_id_or_create(&db_tx, category, CostKind::Variable)
                        .await?,
                ),
                None => None,
            };

            let entry = LedgerEntry {
                id: Uuid::new_v4(),
                account_id: cmd.account_id,
                user_id: cmd.user_id.clone(),
                name,
                note,
                kind: cmd.kind,
                amount: cmd.amount,
                occurred_on: cmd.occurred_on,
                category_id,
                source: None,
                origin: EntryOrigin::Manual,
                created_at: Utc::now(),
            };
            let model: ledger_entries::ActiveModel = (&entry).into();
            model.insert(&db_tx).await?;
            Ok(entry.id)
        })
    }

    /// Edits a manual entry. Synchronized entries are owned by their source
    /// event and are refused with `ManagedEntry`.
    pub async fn update_entry(
        &self,
        entry_id: Uuid,
        update: EntryUpdate,
        user_id: &str,
    ) -> ResultEngine<LedgerEntry> {
        if update.amount.is_some_and(|a| !a.is_positive()) {
            return Err(EngineError::InvalidAmount(
                "amount must be > 0".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let model = self.require_entry(&db_tx, entry_id).await?;
            ensure_manual(&model)?;
            let account = self
                .require_account(&db_tx, parse_uuid(&model.account_id, "account")?)
                .await?;
            self.ensure_account_writable(&account, user_id)?;

            let amount = update.amount.map_or(model.amount_minor, |a| a.minor());
            if model.kind == EntryKind::Expense.as_str() {
                self.ensure_expense_allowed(
                    &db_tx,
                    &account,
                    Money::new(amount),
                    Some(entry_id),
                )
                .await?;
            }

            let mut active: ledger_entries::ActiveModel = model.into();
            active.amount_minor = ActiveValue::Set(amount);
            if let Some(name) = update.name.as_deref() {
                active.name = ActiveValue::Set(normalize_required_name(name, "entry")?);
            }
            if update.note.is_some() {
                active.note = ActiveValue::Set(normalize_optional_text(update.note.as_deref()));
            }
            if let Some(date) = update.occurred_on {
                active.occurred_on = ActiveValue::Set(date);
            }
            let updated = active.update(&db_tx).await?;
            LedgerEntry::try_from(updated)
        })
    }

    /// Deletes a manual entry.
    pub async fn delete_entry(&self, entry_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self.require_entry(&db_tx, entry_id).await?;
            ensure_manual(&model)?;
            let account = self
                .require_account(&db_tx, parse_uuid(&model.account_id, "account")?)
                .await?;
            self.ensure_account_writable(&account, user_id)?;
            ledger_entries::Entity::delete_by_id(model.id)
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }

    pub async fn entry(&self, entry_id: Uuid) -> ResultEngine<LedgerEntry> {
        with_tx!(self, |db_tx| {
            let model = self.require_entry(&db_tx, entry_id).await?;
            LedgerEntry::try_from(model)
        })
    }

    /// The entry bound to a source event, if any.
    pub async fn entry_for_source(
        &self,
        source: SourceRef,
    ) -> ResultEngine<Option<LedgerEntry>> {
        with_tx!(self, |db_tx| {
            let model = self.entry_bound_to(&db_tx, source).await?;
            model.map(LedgerEntry::try_from).transpose()
        })
    }

    /// Lists entries newest first (`occurred_on DESC, created_at DESC`).
    pub async fn list_entries(
        &self,
        filter: &LedgerListFilter,
        limit: u64,
    ) -> ResultEngine<Vec<LedgerEntry>> {
        validate_list_filter(filter)?;
        let limit = page_size(limit)?;
        with_tx!(self, |db_tx| {
            let models = ledger_entries::Entity::find()
                .apply_ledger_filters(filter)
                .order_by_desc(ledger_entries::Column::OccurredOn)
                .order_by_desc(ledger_entries::Column::CreatedAt)
                .limit(limit)
                .all(&db_tx)
                .await?;
            models.into_iter().map(LedgerEntry::try_from).collect()
        })
    }

    pub(super) async fn require_entry(
        &self,
        db_tx: &DatabaseTransaction,
        entry_id: Uuid,
    ) -> ResultEngine<ledger_entries::Model> {
        ledger_entries::Entity::find_by_id(entry_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("ledger entry {entry_id}")))
    }
}
