use uuid::Uuid;

use sea_orm::{
    ConnectionTrait, DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, Statement,
    TransactionTrait, Value, prelude::*,
};

use crate::{
    Account, EngineError, EntryKind, Money, NewAccount, ResultEngine, accounts, ledger_entries,
    users, util::parse_uuid,
};

use super::{Engine, normalize_required_name, with_tx};

impl Engine {
    /// Opens an account. `owner`, when given, must be an existing user.
    pub async fn new_account(&self, cmd: NewAccount) -> ResultEngine<Uuid> {
        let name = normalize_required_name(&cmd.name, "account")?;
        with_tx!(self, |db_tx| {
            if let Some(owner) = cmd.owner.as_deref() {
                self.require_user(&db_tx, owner).await?;
            }

            let account = Account::new(
                name,
                cmd.owner.clone(),
                cmd.starting_balance,
                cmd.rejects_negative,
            );
            let model: accounts::ActiveModel = (&account).into();
            model.insert(&db_tx).await?;
            tracing::info!(account = %account.id, owner = ?account.user_id, "account opened");
            Ok(account.id)
        })
    }

    pub async fn account(&self, account_id: Uuid) -> ResultEngine<Account> {
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, account_id).await?;
            Account::try_from(model)
        })
    }

    /// Accounts owned by `owner`, or every account when `owner` is `None`,
    /// oldest first.
    pub async fn list_accounts(&self, owner: Option<&str>) -> ResultEngine<Vec<Account>> {
        with_tx!(self, |db_tx| {
            let mut query = accounts::Entity::find();
            if let Some(owner) = owner {
                query = query.filter(accounts::Column::UserId.eq(owner));
            }
            let models = query
                .order_by_asc(accounts::Column::CreatedAt)
                .order_by_asc(accounts::Column::Id)
                .all(&db_tx)
                .await?;
            models.into_iter().map(Account::try_from).collect()
        })
    }

    /// Deletes an account. Refused while any ledger entry references it.
    pub async fn delete_account(&self, account_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_account(&db_tx, account_id).await?;
            let entries = ledger_entries::Entity::find()
                .filter(ledger_entries::Column::AccountId.eq(account_id.to_string()))
                .count(&db_tx)
                .await?;
            if entries > 0 {
                return Err(EngineError::InUse(format!(
                    "account {account_id} still has {entries} ledger entries"
                )));
            }
            accounts::Entity::delete_by_id(account_id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }

    /// Current balance: `starting + Σ income − Σ expense`.
    pub async fn balance(&self, account_id: Uuid) -> ResultEngine<Money> {
        with_tx!(self, |db_tx| {
            let account = self.require_account(&db_tx, account_id).await?;
            self.account_balance(&db_tx, &account, None).await
        })
    }

    pub(super) async fn require_user(
        &self,
        db_tx: &DatabaseTransaction,
        username: &str,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(username.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("user {username}")))
    }

    pub(super) async fn require_account(
        &self,
        db_tx: &DatabaseTransaction,
        account_id: Uuid,
    ) -> ResultEngine<accounts::Model> {
        accounts::Entity::find_by_id(account_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("account {account_id}")))
    }

    /// Balance computed in SQL, optionally leaving one entry out.
    ///
    /// Leaving an entry out gives the balance an edit is checked against: the
    /// old amount of the entry being edited must not count twice.
    pub(super) async fn account_balance(
        &self,
        db_tx: &DatabaseTransaction,
        account: &accounts::Model,
        excluding_entry: Option<Uuid>,
    ) -> ResultEngine<Money> {
        let backend = db_tx.get_database_backend();
        let mut sql = String::from(
            "SELECT COALESCE(SUM(CASE WHEN kind = ? THEN amount_minor ELSE -amount_minor END), 0) \
             AS sum FROM ledger_entries WHERE account_id = ?",
        );
        let mut values: Vec<Value> = vec![
            EntryKind::Income.as_str().into(),
            account.id.clone().into(),
        ];
        if let Some(entry_id) = excluding_entry {
            sql.push_str(" AND id <> ?");
            values.push(entry_id.to_string().into());
        }

        let stmt = Statement::from_sql_and_values(backend, sql, values);
        let row = db_tx.query_one(stmt).await?;
        let movements: i64 = row.and_then(|r| r.try_get("", "sum").ok()).unwrap_or(0);
        Ok(Money::new(account.starting_balance_minor) + Money::new(movements))
    }

    /// Rejects an expense of `amount` on an account that refuses to go
    /// negative, when the balance without `excluding_entry` cannot cover it.
    pub(super) async fn ensure_expense_allowed(
        &self,
        db_tx: &DatabaseTransaction,
        account: &accounts::Model,
        amount: Money,
        excluding_entry: Option<Uuid>,
    ) -> ResultEngine<()> {
        if !account.rejects_negative {
            return Ok(());
        }
        let balance = self.account_balance(db_tx, account, excluding_entry).await?;
        if (balance - amount).is_negative() {
            return Err(EngineError::InsufficientBalance {
                account: account.name.clone(),
                balance,
                requested: amount,
            });
        }
        Ok(())
    }

    /// A user may write to their own accounts and to shared ones.
    pub(super) fn ensure_account_writable(
        &self,
        account: &accounts::Model,
        user_id: &str,
    ) -> ResultEngine<()> {
        match account.user_id.as_deref() {
            Some(owner) if owner != user_id => Err(EngineError::Forbidden(format!(
                "account {} belongs to another user",
                account.name
            ))),
            _ => Ok(()),
        }
    }
}

pub(super) fn account_uuid(account: &accounts::Model) -> ResultEngine<Uuid> {
    parse_uuid(&account.id, "account")
}
