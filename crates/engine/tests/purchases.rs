use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

use engine::{
    AccountSelection, Engine, EngineError, HistoryFilter, Money, Movement, NewAccount,
    NewPurchase, NewPurchaseLine, PurchaseLineUpdate, PurchaseUpdate, Quantity, SourceRef,
    StockPlace,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    for user in ["alice", "bob"] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password) VALUES (?, ?)",
            vec![user.into(), "password".into()],
        ))
        .await
        .unwrap();
    }
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 8).unwrap()
}

fn money(s: &str) -> Money {
    s.parse().unwrap()
}

fn qty(s: &str) -> Quantity {
    s.parse().unwrap()
}

fn pantry() -> StockPlace {
    StockPlace::Household {
        room: Some("Kitchen".to_string()),
        spot: None,
    }
}

async fn checking(engine: &Engine) -> Uuid {
    engine
        .new_account(
            NewAccount::new("Checking")
                .owner("alice")
                .starting_balance(money("200.00")),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn itemized_total_follows_lines_and_entry_follows_total() {
    let (engine, _db) = engine_with_db().await;
    let account = checking(&engine).await;

    let purchase = engine
        .new_purchase(
            NewPurchase::itemized(
                "alice",
                "Market",
                day(),
                vec![
                    NewPurchaseLine::new("Apples", qty("1.5"), money("2.00")),
                    NewPurchaseLine::new("Bread", qty("1"), money("3.20")),
                ],
            )
            .city("Turin"),
        )
        .await
        .unwrap();
    assert_eq!(purchase.total, money("6.20"));
    let entry_id = purchase.ledger_entry_id.unwrap();
    let entry = engine.entry(entry_id).await.unwrap();
    assert_eq!(entry.name, "Purchase: Market");
    assert_eq!(entry.note.as_deref(), Some("Turin"));
    assert_eq!(entry.amount, money("6.20"));
    assert_eq!(entry.source, Some(SourceRef::Purchase(purchase.id)));

    let milk = engine
        .add_purchase_line(
            purchase.id,
            NewPurchaseLine::new("Milk", qty("2"), money("1.10")),
            "alice",
        )
        .await
        .unwrap();
    assert_eq!(engine.entry(entry_id).await.unwrap().amount, money("8.40"));

    engine
        .update_purchase_line(
            milk.id,
            PurchaseLineUpdate {
                quantity: Some(qty("3")),
                ..Default::default()
            },
            "alice",
        )
        .await
        .unwrap();
    assert_eq!(engine.purchase(purchase.id).await.unwrap().total, money("9.50"));
    assert_eq!(engine.entry(entry_id).await.unwrap().amount, money("9.50"));

    let bread = purchase
        .lines
        .iter()
        .find(|line| line.name == "Bread")
        .unwrap();
    engine.delete_purchase_line(bread.id, "alice").await.unwrap();
    let reloaded = engine.purchase(purchase.id).await.unwrap();
    assert_eq!(reloaded.total, money("6.30"));
    assert_eq!(reloaded.lines.len(), 2);
    assert_eq!(engine.entry(entry_id).await.unwrap().amount, money("6.30"));
    assert_eq!(engine.balance(account).await.unwrap(), money("193.70"));

    // Running it again on a consistent purchase changes nothing.
    for _ in 0..2 {
        assert_eq!(
            engine.recompute_purchase_total(purchase.id).await.unwrap(),
            money("6.30")
        );
        assert_eq!(engine.entry(entry_id).await.unwrap().amount, money("6.30"));
        assert_eq!(engine.balance(account).await.unwrap(), money("193.70"));
    }
}

#[tokio::test]
async fn line_overflowing_the_total_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let account = checking(&engine).await;
    let purchase = engine
        .new_purchase(NewPurchase::itemized(
            "alice",
            "Market",
            day(),
            vec![NewPurchaseLine::new("Apples", qty("1"), money("2.00"))],
        ))
        .await
        .unwrap();

    let err = engine
        .add_purchase_line(
            purchase.id,
            NewPurchaseLine::new(
                "Gold",
                Quantity::from_milli(i64::MAX),
                Money::new(i64::MAX),
            ),
            "alice",
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidAmount("itemized total out of range".to_string())
    );

    let reloaded = engine.purchase(purchase.id).await.unwrap();
    assert_eq!(reloaded.total, money("2.00"));
    assert_eq!(reloaded.lines.len(), 1);
    let entry = engine
        .entry(purchase.ledger_entry_id.unwrap())
        .await
        .unwrap();
    assert_eq!(entry.amount, money("2.00"));
    assert_eq!(engine.balance(account).await.unwrap(), money("198.00"));
}

#[tokio::test]
async fn itemized_total_is_rounded_once() {
    let (engine, _db) = engine_with_db().await;
    let purchase = engine
        .new_purchase(NewPurchase::itemized(
            "alice",
            "Bulk store",
            day(),
            vec![
                NewPurchaseLine::new("Lentils", qty("0.333"), money("1.00")),
                NewPurchaseLine::new("Oats", qty("0.333"), money("1.00")),
            ],
        ))
        .await
        .unwrap();
    // 0.333 + 0.333 = 0.666, rounded half up.
    assert_eq!(purchase.total, money("0.67"));
    // No account yet: the purchase is stored unbound.
    assert_eq!(purchase.ledger_entry_id, None);
}

#[tokio::test]
async fn declared_total_only_on_non_itemized_purchases() {
    let (engine, _db) = engine_with_db().await;
    let account = checking(&engine).await;

    let itemized = engine
        .new_purchase(NewPurchase::itemized(
            "alice",
            "Market",
            day(),
            vec![NewPurchaseLine::new("Apples", qty("1"), money("2.00"))],
        ))
        .await
        .unwrap();
    let err = engine
        .update_purchase(
            itemized.id,
            PurchaseUpdate {
                declared_total: Some(money("10.00")),
                ..Default::default()
            },
            "alice",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let declared = engine
        .new_purchase(NewPurchase::declared("alice", "Hardware", day(), money("12.00")))
        .await
        .unwrap();
    let updated = engine
        .update_purchase(
            declared.id,
            PurchaseUpdate {
                declared_total: Some(money("15.00")),
                store: Some("Hardware shop".to_string()),
                ..Default::default()
            },
            "alice",
        )
        .await
        .unwrap();
    assert_eq!(updated.total, money("15.00"));
    let entry = engine
        .entry(updated.ledger_entry_id.unwrap())
        .await
        .unwrap();
    assert_eq!(entry.amount, money("15.00"));
    assert_eq!(entry.name, "Purchase: Hardware shop");
    assert_eq!(engine.balance(account).await.unwrap(), money("183.00"));
}

#[tokio::test]
async fn put_away_logs_purchase_intake() {
    let (engine, _db) = engine_with_db().await;
    let purchase = engine
        .new_purchase(NewPurchase::itemized(
            "alice",
            "Market",
            day(),
            vec![
                NewPurchaseLine::new("Rice", qty("2"), money("1.80"))
                    .unit("kg")
                    .put_away(pantry()),
                NewPurchaseLine::new("Soap", qty("1"), money("2.50")),
            ],
        ))
        .await
        .unwrap();

    let rice_line = purchase.lines.iter().find(|l| l.name == "Rice").unwrap();
    assert!(rice_line.added_to_stock);
    let rice = rice_line.stock_item.unwrap();
    let item = engine.stock_item(rice).await.unwrap();
    assert_eq!(item.quantity, qty("2"));
    assert_eq!(item.unit.as_deref(), Some("kg"));

    let soap_line = purchase.lines.iter().find(|l| l.name == "Soap").unwrap();
    assert!(!soap_line.added_to_stock);
    let soap = engine
        .put_away_line(soap_line.id, pantry(), "alice")
        .await
        .unwrap();
    let err = engine
        .put_away_line(soap_line.id, pantry(), "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    let intakes = engine
        .stock_history(
            &HistoryFilter {
                movements: Some(vec![Movement::PurchaseIntake]),
                ..Default::default()
            },
            10,
            None,
        )
        .await
        .unwrap();
    assert_eq!(intakes.entries.len(), 2);
    assert!(
        intakes
            .entries
            .iter()
            .all(|e| e.note.as_deref() == Some("purchase Market"))
    );
    let items: Vec<_> = intakes.entries.iter().filter_map(|e| e.item).collect();
    assert!(items.contains(&rice));
    assert!(items.contains(&soap));

    // Deleting the line leaves the stock where it is.
    engine
        .delete_purchase_line(rice_line.id, "alice")
        .await
        .unwrap();
    assert_eq!(engine.stock_item(rice).await.unwrap().quantity, qty("2"));
}

#[tokio::test]
async fn post_and_revert_expense() {
    let (engine, _db) = engine_with_db().await;
    let purchase = engine
        .new_purchase(NewPurchase::declared("alice", "Bakery", day(), money("4.50")))
        .await
        .unwrap();
    assert_eq!(purchase.ledger_entry_id, None);

    let err = engine
        .revert_purchase_expense(purchase.id, "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let account = checking(&engine).await;
    let entry_id = engine
        .post_purchase_expense(purchase.id, account, "alice")
        .await
        .unwrap();
    assert_eq!(
        engine.purchase(purchase.id).await.unwrap().ledger_entry_id,
        Some(entry_id)
    );
    assert_eq!(engine.balance(account).await.unwrap(), money("195.50"));

    let err = engine
        .post_purchase_expense(purchase.id, account, "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    engine
        .revert_purchase_expense(purchase.id, "alice")
        .await
        .unwrap();
    assert_eq!(
        engine.purchase(purchase.id).await.unwrap().ledger_entry_id,
        None
    );
    assert!(matches!(
        engine.entry(entry_id).await.unwrap_err(),
        EngineError::KeyNotFound(_)
    ));
    assert_eq!(engine.balance(account).await.unwrap(), money("200.00"));

    let rebound = engine
        .post_purchase_expense(purchase.id, account, "alice")
        .await
        .unwrap();
    assert_ne!(rebound, entry_id);
}

#[tokio::test]
async fn deleting_a_purchase_removes_its_entry() {
    let (engine, _db) = engine_with_db().await;
    let account = checking(&engine).await;
    let purchase = engine
        .new_purchase(
            NewPurchase::itemized(
                "alice",
                "Market",
                day(),
                vec![NewPurchaseLine::new("Apples", qty("1"), money("2.00"))],
            )
            .account(AccountSelection::Explicit(account)),
        )
        .await
        .unwrap();
    let entry_id = purchase.ledger_entry_id.unwrap();

    let err = engine.delete_purchase(purchase.id, "bob").await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    engine.delete_purchase(purchase.id, "alice").await.unwrap();
    assert!(engine.entry(entry_id).await.is_err());
    assert!(engine.purchase(purchase.id).await.is_err());
    assert_eq!(engine.balance(account).await.unwrap(), money("200.00"));
}
