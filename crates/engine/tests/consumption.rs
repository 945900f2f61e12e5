use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    Engine, EngineError, HistoryFilter, MealKind, Movement, NewMeal, NewStockItem, Quantity,
    Refund, StaleLinkPolicy, StockHandle, StockPlace,
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

fn pantry() -> StockPlace {
    StockPlace::Household {
        room: Some("Kitchen".to_string()),
        spot: None,
    }
}

fn qty(units: i64) -> Quantity {
    Quantity::units(units)
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
}

async fn stock(engine: &Engine, name: &str, quantity: Quantity) -> StockHandle {
    engine
        .add_stock_item(NewStockItem::new(name, pantry(), quantity), "alice")
        .await
        .unwrap()
}

fn meal(consumption: Vec<(StockHandle, Quantity)>) -> NewMeal {
    NewMeal {
        user_id: "alice".to_string(),
        eaten_on: day(),
        kind: MealKind::Dinner,
        notes: Some("Risotto".to_string()),
        consumption,
    }
}

/// Removes a stock row behind the engine's back, leaving its links stale.
async fn drop_row_unchecked(db: &DatabaseConnection, handle: StockHandle) {
    let backend = db.get_database_backend();
    db.execute_unprepared("PRAGMA foreign_keys = OFF").await.unwrap();
    db.execute(Statement::from_sql_and_values(
        backend,
        "DELETE FROM stock_items WHERE id = ?",
        vec![handle.to_string().into()],
    ))
    .await
    .unwrap();
    db.execute_unprepared("PRAGMA foreign_keys = ON").await.unwrap();
}

#[tokio::test]
async fn consume_then_delete_meal_restores_stock() {
    let (engine, _db) = engine_with_db().await;
    let rice = stock(&engine, "Rice", qty(5)).await;

    let logged = engine.log_meal(meal(vec![(rice, qty(2))])).await.unwrap();
    assert_eq!(engine.stock_item(rice).await.unwrap().quantity, qty(3));
    assert_eq!(
        logged.notes.as_deref(),
        Some("Risotto\nStock used: Rice 2.000")
    );

    let links = engine.meal_consumption(logged.id).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].item, rice);
    assert_eq!(links[0].quantity, qty(2));

    let deletion = engine
        .delete_meal(logged.id, "alice", StaleLinkPolicy::Fail)
        .await
        .unwrap();
    assert_eq!(
        deletion.refunded,
        vec![Refund {
            item: rice,
            quantity: qty(2)
        }]
    );
    assert!(deletion.forfeited.is_empty());
    assert_eq!(engine.stock_item(rice).await.unwrap().quantity, qty(5));

    let page = engine
        .stock_history(
            &HistoryFilter {
                item: Some(rice),
                ..Default::default()
            },
            10,
            None,
        )
        .await
        .unwrap();
    let movements: Vec<_> = page.entries.iter().map(|e| e.movement).collect();
    assert_eq!(
        movements,
        vec![Movement::WithdrawReversal, Movement::Withdraw, Movement::Create]
    );
    let note = format!("meal {}", logged.id);
    assert_eq!(page.entries[0].note.as_deref(), Some(note.as_str()));

    let reversal = &page.entries[0];
    let withdrawal = &page.entries[1];
    assert_eq!(
        (withdrawal.quantity_moved, withdrawal.quantity_before, withdrawal.quantity_after),
        (qty(2), qty(5), qty(3))
    );
    assert_eq!(
        (reversal.quantity_moved, reversal.quantity_before, reversal.quantity_after),
        (qty(2), qty(3), qty(5))
    );
    assert_eq!(withdrawal.signed_delta(), -qty(2));
    assert_eq!(reversal.signed_delta(), qty(2));
    assert_eq!(withdrawal.signed_delta() + reversal.signed_delta(), Quantity::ZERO);
    assert!(matches!(
        engine.meal(logged.id).await.unwrap_err(),
        EngineError::KeyNotFound(_)
    ));
}

#[tokio::test]
async fn repeated_items_are_merged_into_one_link() {
    let (engine, _db) = engine_with_db().await;
    let eggs = stock(&engine, "Eggs", qty(6)).await;

    let logged = engine
        .log_meal(meal(vec![(eggs, qty(1)), (eggs, qty(2))]))
        .await
        .unwrap();
    let links = engine.meal_consumption(logged.id).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].quantity, qty(3));
    assert_eq!(engine.stock_item(eggs).await.unwrap().quantity, qty(3));
}

#[tokio::test]
async fn failing_pair_rolls_back_the_whole_consumption() {
    let (engine, _db) = engine_with_db().await;
    let rice = stock(&engine, "Rice", qty(5)).await;
    let saffron = stock(&engine, "Saffron", Quantity::from_milli(100)).await;

    let err = engine
        .log_meal(meal(vec![(rice, qty(2)), (saffron, qty(1))]))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientStock { .. }));

    assert_eq!(engine.stock_item(rice).await.unwrap().quantity, qty(5));
    assert_eq!(
        engine.stock_item(saffron).await.unwrap().quantity,
        Quantity::from_milli(100)
    );
    let withdrawals = engine
        .stock_history(
            &HistoryFilter {
                movements: Some(vec![Movement::Withdraw]),
                ..Default::default()
            },
            10,
            None,
        )
        .await
        .unwrap();
    assert!(withdrawals.entries.is_empty());
}

#[tokio::test]
async fn record_then_reverse_conserves_quantities() {
    let (engine, _db) = engine_with_db().await;
    let rice = stock(&engine, "Rice", qty(5)).await;
    let beans = stock(&engine, "Beans", Quantity::from_milli(2_500)).await;

    let first = engine.log_meal(meal(Vec::new())).await.unwrap();
    assert_eq!(first.notes.as_deref(), Some("Risotto"));
    engine
        .record_consumption(
            first.id,
            &[(rice, Quantity::from_milli(750)), (beans, qty(1))],
            "alice",
        )
        .await
        .unwrap();
    let second = engine
        .log_meal(meal(vec![(rice, qty(1)), (beans, Quantity::from_milli(1_500))]))
        .await
        .unwrap();
    assert_eq!(
        engine.stock_item(beans).await.unwrap().quantity,
        Quantity::ZERO
    );

    let refunds = engine.reverse_consumption(first.id, "alice").await.unwrap();
    assert_eq!(refunds.len(), 2);
    engine.reverse_consumption(second.id, "alice").await.unwrap();

    assert_eq!(engine.stock_item(rice).await.unwrap().quantity, qty(5));
    assert_eq!(
        engine.stock_item(beans).await.unwrap().quantity,
        Quantity::from_milli(2_500)
    );
    assert!(engine.meal_consumption(first.id).await.unwrap().is_empty());

    for item in [rice, beans] {
        let page = engine
            .stock_history(
                &HistoryFilter {
                    item: Some(item),
                    movements: Some(vec![Movement::Withdraw, Movement::WithdrawReversal]),
                    ..Default::default()
                },
                10,
                None,
            )
            .await
            .unwrap();
        assert_eq!(page.entries.len(), 4);
        for meal_id in [first.id, second.id] {
            let note = format!("meal {meal_id}");
            let pair: Vec<_> = page
                .entries
                .iter()
                .filter(|e| e.note.as_deref() == Some(note.as_str()))
                .collect();
            assert_eq!(pair.len(), 2);
            let (withdrawal, reversal) = match pair[0].movement {
                Movement::Withdraw => (pair[0], pair[1]),
                _ => (pair[1], pair[0]),
            };
            assert_eq!(withdrawal.movement, Movement::Withdraw);
            assert_eq!(reversal.movement, Movement::WithdrawReversal);
            assert_eq!(withdrawal.quantity_moved, reversal.quantity_moved);
            assert_eq!(
                withdrawal.quantity_before - withdrawal.quantity_after,
                withdrawal.quantity_moved
            );
            assert_eq!(
                reversal.quantity_after - reversal.quantity_before,
                reversal.quantity_moved
            );
            assert_eq!(withdrawal.signed_delta() + reversal.signed_delta(), Quantity::ZERO);
        }
    }

    // Rice: 5.000 -> 4.250 -> 3.250, then back 4.000 -> 5.000.
    let rice_reversals = engine
        .stock_history(
            &HistoryFilter {
                item: Some(rice),
                movements: Some(vec![Movement::WithdrawReversal]),
                ..Default::default()
            },
            10,
            None,
        )
        .await
        .unwrap();
    let steps: Vec<_> = rice_reversals
        .entries
        .iter()
        .map(|e| (e.quantity_before, e.quantity_after))
        .collect();
    assert_eq!(
        steps,
        vec![
            (qty(4), qty(5)),
            (Quantity::from_milli(3_250), qty(4)),
        ]
    );
    // Reversal keeps the meal itself.
    assert_eq!(engine.meal(first.id).await.unwrap().id, first.id);
}

#[tokio::test]
async fn linked_stock_cannot_be_deleted() {
    let (engine, _db) = engine_with_db().await;
    let rice = stock(&engine, "Rice", qty(5)).await;
    let logged = engine.log_meal(meal(vec![(rice, qty(1))])).await.unwrap();

    let err = engine.delete_stock_item(rice, "alice").await.unwrap_err();
    assert!(matches!(err, EngineError::InUse(_)));

    engine
        .delete_meal(logged.id, "alice", StaleLinkPolicy::Fail)
        .await
        .unwrap();
    engine.delete_stock_item(rice, "alice").await.unwrap();
}

#[tokio::test]
async fn stale_link_aborts_deletion_by_default() {
    let (engine, db) = engine_with_db().await;
    let rice = stock(&engine, "Rice", qty(5)).await;
    let beans = stock(&engine, "Beans", qty(5)).await;
    let logged = engine
        .log_meal(meal(vec![(rice, qty(2)), (beans, qty(1))]))
        .await
        .unwrap();

    drop_row_unchecked(&db, rice).await;

    let err = engine
        .delete_meal(logged.id, "alice", StaleLinkPolicy::Fail)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StaleReference(_)));

    // Nothing moved: the live row was not refunded and the meal is intact.
    assert_eq!(engine.stock_item(beans).await.unwrap().quantity, qty(4));
    assert_eq!(engine.meal_consumption(logged.id).await.unwrap().len(), 2);

    let err = engine
        .reverse_consumption(logged.id, "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StaleReference(_)));
}

#[tokio::test]
async fn forfeit_policy_reports_what_could_not_be_refunded() {
    let (engine, db) = engine_with_db().await;
    let rice = stock(&engine, "Rice", qty(5)).await;
    let beans = stock(&engine, "Beans", qty(5)).await;
    let logged = engine
        .log_meal(meal(vec![(rice, qty(2)), (beans, qty(1))]))
        .await
        .unwrap();

    drop_row_unchecked(&db, rice).await;

    let deletion = engine
        .delete_meal(logged.id, "alice", StaleLinkPolicy::Forfeit)
        .await
        .unwrap();
    assert_eq!(
        deletion.refunded,
        vec![Refund {
            item: beans,
            quantity: qty(1)
        }]
    );
    assert_eq!(
        deletion.forfeited,
        vec![Refund {
            item: rice,
            quantity: qty(2)
        }]
    );
    assert_eq!(engine.stock_item(beans).await.unwrap().quantity, qty(5));
    assert!(engine.meal(logged.id).await.is_err());
}

#[tokio::test]
async fn only_the_owner_deletes_a_meal() {
    let (engine, _db) = engine_with_db().await;
    let rice = stock(&engine, "Rice", qty(5)).await;
    let logged = engine.log_meal(meal(vec![(rice, qty(1))])).await.unwrap();

    let err = engine
        .delete_meal(logged.id, "bob", StaleLinkPolicy::Fail)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
    assert_eq!(engine.stock_item(rice).await.unwrap().quantity, qty(4));
}
