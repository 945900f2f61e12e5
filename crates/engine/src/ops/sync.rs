//! Mirrors source events (maintenance, fuel, purchases) into the ledger.
//!
//! Each source use-case calls into the protocol at the end of its own
//! transaction: create binds at most one synchronized entry to the source,
//! update rewrites the bound entry in place, delete removes it. Update never
//! creates an entry for a source that was recorded while its owner had no
//! account.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, prelude::*};

use crate::{
    CostKind, EntryKind, EntryOrigin, LedgerEntry, Money, ResultEngine, SourceRef, accounts,
    ledger_entries, util::parse_uuid,
};

use super::{Engine, accounts::account_uuid};

/// Which account a newly recorded source event is charged to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "policy", content = "account_id")]
pub enum AccountSelection {
    /// The oldest account owned by the event's user.
    #[default]
    FirstOwned,
    Explicit(Uuid),
}

/// Result of mirroring a newly recorded source event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    Bound(Uuid),
    /// The user owns no account: the event is stored without a ledger entry.
    NoAccount,
}

impl SyncOutcome {
    pub fn entry_id(self) -> Option<Uuid> {
        match self {
            SyncOutcome::Bound(id) => Some(id),
            SyncOutcome::NoAccount => None,
        }
    }
}

/// What the bound entry should say.
pub(super) struct LedgerDraft {
    pub user_id: String,
    pub name: String,
    pub note: Option<String>,
    pub amount: Money,
    pub occurred_on: NaiveDate,
    pub category: &'static str,
}

pub(super) trait LedgerSource {
    fn source_ref(&self) -> ResultEngine<SourceRef>;

    /// Entry currently bound to the source, as stored on the source row.
    fn bound_entry(&self) -> ResultEngine<Option<Uuid>>;

    fn draft(&self) -> LedgerDraft;
}

impl Engine {
    /// Oldest account owned by `user_id` (ties broken by id).
    pub(super) async fn first_owned_account(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<Option<accounts::Model>> {
        Ok(accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .order_by_asc(accounts::Column::CreatedAt)
            .order_by_asc(accounts::Column::Id)
            .one(db_tx)
            .await?)
    }

    async fn resolve_account(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        selection: AccountSelection,
    ) -> ResultEngine<Option<accounts::Model>> {
        match selection {
            AccountSelection::FirstOwned => self.first_owned_account(db_tx, user_id).await,
            AccountSelection::Explicit(account_id) => {
                let account = self.require_account(db_tx, account_id).await?;
                self.ensure_account_writable(&account, user_id)?;
                Ok(Some(account))
            }
        }
    }

    /// Creates the synchronized expense for a new source event.
    ///
    /// Returns the existing binding when the source is already mirrored, so
    /// a source never ends up with two entries.
    pub(super) async fn sync_on_create(
        &self,
        db_tx: &DatabaseTransaction,
        source: &impl LedgerSource,
        selection: AccountSelection,
    ) -> ResultEngine<SyncOutcome> {
        let source_ref = source.source_ref()?;
        if let Some(existing) = source.bound_entry()? {
            return Ok(SyncOutcome::Bound(existing));
        }
        if let Some(existing) = self.entry_bound_to(db_tx, source_ref).await? {
            return Ok(SyncOutcome::Bound(parse_uuid(&existing.id, "ledger entry")?));
        }

        let draft = source.draft();
        let Some(account) = self
            .resolve_account(db_tx, &draft.user_id, selection)
            .await?
        else {
            tracing::debug!(
                source = %source_ref,
                user = %draft.user_id,
                "no account to charge, source stored without ledger entry"
            );
            return Ok(SyncOutcome::NoAccount);
        };
        self.ensure_expense_allowed(db_tx, &account, draft.amount, None)
            .await?;

        let category_id = self
            .category_id_or_create(db_tx, draft.category, CostKind::Variable)
            .await?;
        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            account_id: account_uuid(&account)?,
            user_id: draft.user_id,
            name: draft.name,
            note: draft.note,
            kind: EntryKind::Expense,
            amount: draft.amount,
            occurred_on: draft.occurred_on,
            category_id: Some(category_id),
            source: Some(source_ref),
            origin: EntryOrigin::Synchronized,
            created_at: Utc::now(),
        };
        let model: ledger_entries::ActiveModel = (&entry).into();
        model.insert(db_tx).await?;
        tracing::info!(
            source = %source_ref,
            entry = %entry.id,
            account = %entry.account_id,
            amount = %entry.amount,
            "source mirrored into ledger"
        );
        Ok(SyncOutcome::Bound(entry.id))
    }

    /// Rewrites the bound entry from the source's current values.
    ///
    /// An unbound source stays unbound.
    pub(super) async fn sync_on_update(
        &self,
        db_tx: &DatabaseTransaction,
        source: &impl LedgerSource,
    ) -> ResultEngine<()> {
        let Some(entry_id) = source.bound_entry()? else {
            return Ok(());
        };
        let entry = self.require_entry(db_tx, entry_id).await?;
        let account = self
            .require_account(db_tx, parse_uuid(&entry.account_id, "account")?)
            .await?;
        let draft = source.draft();
        self.ensure_expense_allowed(db_tx, &account, draft.amount, Some(entry_id))
            .await?;

        let mut active: ledger_entries::ActiveModel = entry.into();
        active.amount_minor = ActiveValue::Set(draft.amount.minor());
        active.name = ActiveValue::Set(draft.name);
        active.note = ActiveValue::Set(draft.note);
        active.occurred_on = ActiveValue::Set(draft.occurred_on);
        active.update(db_tx).await?;
        tracing::debug!(source = %source.source_ref()?, entry = %entry_id, "ledger entry resynced");
        Ok(())
    }

    /// Removes the bound entry, if any.
    pub(super) async fn sync_on_delete(
        &self,
        db_tx: &DatabaseTransaction,
        source: &impl LedgerSource,
    ) -> ResultEngine<()> {
        if let Some(entry_id) = source.bound_entry()? {
            ledger_entries::Entity::delete_by_id(entry_id.to_string())
                .exec(db_tx)
                .await?;
            tracing::debug!(source = %source.source_ref()?, entry = %entry_id, "ledger entry removed");
        }
        Ok(())
    }

    pub(super) async fn entry_bound_to(
        &self,
        db_tx: &DatabaseTransaction,
        source: SourceRef,
    ) -> ResultEngine<Option<ledger_entries::Model>> {
        Ok(ledger_entries::Entity::find()
            .filter(ledger_entries::Column::SourceKind.eq(source.kind_str()))
            .filter(ledger_entries::Column::SourceId.eq(source.id().to_string()))
            .one(db_tx)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_owned_is_the_default_policy() {
        assert_eq!(AccountSelection::default(), AccountSelection::FirstOwned);
    }

    #[test]
    fn outcome_exposes_bound_entry() {
        let id = Uuid::new_v4();
        assert_eq!(SyncOutcome::Bound(id).entry_id(), Some(id));
        assert_eq!(SyncOutcome::NoAccount.entry_id(), None);
    }
}
