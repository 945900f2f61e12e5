use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

use engine::{
    AccountSelection, Engine, EngineError, EntryKind, EntryOrigin, EntryUpdate, FuelKind,
    FuelUpdate, LedgerListFilter, MaintenanceUpdate, Money, NewAccount, NewEntry,
    NewFuelPurchase, NewMaintenance, NewMaintenanceService, NewVehicle, Quantity, SourceRef,
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

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

fn money(s: &str) -> Money {
    s.parse().unwrap()
}

async fn checking(engine: &Engine, starting: &str) -> Uuid {
    engine
        .new_account(
            NewAccount::new("Checking")
                .owner("alice")
                .starting_balance(money(starting)),
        )
        .await
        .unwrap()
}

async fn panda(engine: &Engine) -> Uuid {
    engine
        .new_vehicle(NewVehicle {
            owner_id: "alice".to_string(),
            name: "Family car".to_string(),
            model: "Panda".to_string(),
            plate: Some("AB123CD".to_string()),
            odometer_km: 40_000,
        })
        .await
        .unwrap()
}

fn oil_change(vehicle_id: Uuid, service_id: Option<Uuid>, cost: &str) -> NewMaintenance {
    NewMaintenance {
        user_id: "alice".to_string(),
        vehicle_id,
        service_id,
        description: "Oil change".to_string(),
        performed_on: day(14),
        odometer_km: 41_000,
        cost: money(cost),
        account: AccountSelection::FirstOwned,
    }
}

fn fill_up(vehicle_id: Uuid, total: &str) -> NewFuelPurchase {
    NewFuelPurchase {
        user_id: "alice".to_string(),
        vehicle_id,
        purchased_on: day(20),
        odometer_km: 41_500,
        liters: Quantity::units(40),
        total: money(total),
        fuel: FuelKind::Gasoline,
        account: AccountSelection::FirstOwned,
    }
}

#[tokio::test]
async fn balance_is_starting_plus_income_minus_expense() {
    let (engine, _db) = engine_with_db().await;
    let account = checking(&engine, "100.00").await;

    engine
        .new_entry(NewEntry::new(
            account,
            "alice",
            EntryKind::Income,
            money("50.25"),
            day(1),
            "Salary",
        ))
        .await
        .unwrap();
    engine
        .new_entry(
            NewEntry::new(
                account,
                "alice",
                EntryKind::Expense,
                money("20.10"),
                day(2),
                "Books",
            )
            .category("Leisure"),
        )
        .await
        .unwrap();

    assert_eq!(engine.balance(account).await.unwrap(), money("130.15"));
    assert!(matches!(
        engine.balance(Uuid::new_v4()).await.unwrap_err(),
        EngineError::KeyNotFound(_)
    ));
}

#[tokio::test]
async fn entry_listing_clamps_the_limit() {
    let (engine, _db) = engine_with_db().await;
    let account = checking(&engine, "100.00").await;
    for d in 1..=3 {
        engine
            .new_entry(NewEntry::new(
                account,
                "alice",
                EntryKind::Income,
                money("1.00"),
                day(d),
                "Tip",
            ))
            .await
            .unwrap();
    }

    let filter = LedgerListFilter {
        account_id: Some(account),
        ..Default::default()
    };
    let entries = engine.list_entries(&filter, u64::MAX).await.unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].occurred_on, day(3));
    assert!(matches!(
        engine.list_entries(&filter, 0).await.unwrap_err(),
        EngineError::Validation(_)
    ));
}

#[tokio::test]
async fn account_refusing_negative_rejects_overdraft() {
    let (engine, _db) = engine_with_db().await;
    let account = engine
        .new_account(
            NewAccount::new("Checking")
                .owner("alice")
                .starting_balance(money("10.00"))
                .rejects_negative(true),
        )
        .await
        .unwrap();

    let err = engine
        .new_entry(NewEntry::new(
            account,
            "alice",
            EntryKind::Expense,
            money("25.00"),
            day(3),
            "Groceries",
        ))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Insufficient balance on \"Checking\": balance 10.00, requested 25.00"
    );

    // Income is never checked, and afterwards the expense fits.
    engine
        .new_entry(NewEntry::new(
            account,
            "alice",
            EntryKind::Income,
            money("15.00"),
            day(3),
            "Refund",
        ))
        .await
        .unwrap();
    engine
        .new_entry(NewEntry::new(
            account,
            "alice",
            EntryKind::Expense,
            money("25.00"),
            day(3),
            "Groceries",
        ))
        .await
        .unwrap();
    assert_eq!(engine.balance(account).await.unwrap(), Money::ZERO);
}

#[tokio::test]
async fn editing_an_expense_is_checked_without_its_old_amount() {
    let (engine, _db) = engine_with_db().await;
    let account = engine
        .new_account(
            NewAccount::new("Wallet")
                .owner("alice")
                .starting_balance(money("30.00"))
                .rejects_negative(true),
        )
        .await
        .unwrap();
    let entry = engine
        .new_entry(NewEntry::new(
            account,
            "alice",
            EntryKind::Expense,
            money("20.00"),
            day(4),
            "Dinner",
        ))
        .await
        .unwrap();

    let updated = engine
        .update_entry(
            entry,
            EntryUpdate {
                amount: Some(money("30.00")),
                ..Default::default()
            },
            "alice",
        )
        .await
        .unwrap();
    assert_eq!(updated.amount, money("30.00"));

    let err = engine
        .update_entry(
            entry,
            EntryUpdate {
                amount: Some(money("30.01")),
                ..Default::default()
            },
            "alice",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientBalance { .. }));
}

#[tokio::test]
async fn other_users_cannot_write_to_a_private_account() {
    let (engine, _db) = engine_with_db().await;
    let account = checking(&engine, "0").await;
    let err = engine
        .new_entry(NewEntry::new(
            account,
            "bob",
            EntryKind::Income,
            money("1.00"),
            day(5),
            "Gift",
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let shared = engine
        .new_account(NewAccount::new("Household"))
        .await
        .unwrap();
    engine
        .new_entry(NewEntry::new(
            shared,
            "bob",
            EntryKind::Income,
            money("1.00"),
            day(5),
            "Gift",
        ))
        .await
        .unwrap();
}

#[tokio::test]
async fn maintenance_is_mirrored_updated_and_removed() {
    let (engine, _db) = engine_with_db().await;
    let account = checking(&engine, "1000.00").await;
    let vehicle = panda(&engine).await;
    let service = engine
        .new_maintenance_service(NewMaintenanceService {
            vehicle_id: vehicle,
            name: "Oil change".to_string(),
            interval_km: Some(10_000),
            interval_days: Some(365),
            last_km: 30_000,
            last_on: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        })
        .await
        .unwrap();

    let record = engine
        .record_maintenance(oil_change(vehicle, Some(service), "120.00"))
        .await
        .unwrap();
    let entry_id = record.ledger_entry_id.unwrap();
    let entry = engine.entry(entry_id).await.unwrap();
    assert_eq!(entry.name, "Maintenance Panda: Oil change");
    assert_eq!(entry.note.as_deref(), Some("odometer 41000 km"));
    assert_eq!(entry.amount, money("120.00"));
    assert_eq!(entry.kind, EntryKind::Expense);
    assert_eq!(entry.origin, EntryOrigin::Synchronized);
    assert_eq!(entry.source, Some(SourceRef::Maintenance(record.id)));
    assert_eq!(entry.account_id, account);
    assert!(entry.category_id.is_some());
    assert_eq!(engine.balance(account).await.unwrap(), money("880.00"));

    assert_eq!(engine.vehicle(vehicle).await.unwrap().odometer_km, 41_000);
    let catalog = engine.maintenance_service(service).await.unwrap();
    assert_eq!(catalog.last_km, 41_000);
    assert_eq!(catalog.last_on, day(14));
    assert_eq!(catalog.next_due_km(), Some(51_000));

    engine
        .update_maintenance(
            record.id,
            MaintenanceUpdate {
                cost: Some(money("150.00")),
                description: Some("Oil and filter".to_string()),
                ..Default::default()
            },
            "alice",
        )
        .await
        .unwrap();
    let entry = engine.entry(entry_id).await.unwrap();
    assert_eq!(entry.amount, money("150.00"));
    assert_eq!(entry.name, "Maintenance Panda: Oil and filter");
    assert_eq!(engine.balance(account).await.unwrap(), money("850.00"));
    let stored = engine.maintenance(record.id).await.unwrap();
    assert_eq!(stored.description, "Oil and filter");
    assert_eq!(stored.ledger_entry_id, Some(entry_id));

    engine.delete_maintenance(record.id, "alice").await.unwrap();
    assert!(matches!(
        engine.entry(entry_id).await.unwrap_err(),
        EngineError::KeyNotFound(_)
    ));
    assert!(matches!(
        engine.maintenance(record.id).await.unwrap_err(),
        EngineError::KeyNotFound(_)
    ));
    assert_eq!(engine.balance(account).await.unwrap(), money("1000.00"));
}

#[tokio::test]
async fn older_maintenance_does_not_move_the_catalog_back() {
    let (engine, _db) = engine_with_db().await;
    let vehicle = panda(&engine).await;
    let service = engine
        .new_maintenance_service(NewMaintenanceService {
            vehicle_id: vehicle,
            name: "Tyres".to_string(),
            interval_km: Some(20_000),
            interval_days: None,
            last_km: 39_000,
            last_on: day(20),
        })
        .await
        .unwrap();

    engine
        .record_maintenance(oil_change(vehicle, Some(service), "80.00"))
        .await
        .unwrap();
    let catalog = engine.maintenance_service(service).await.unwrap();
    assert_eq!(catalog.last_km, 39_000);
    assert_eq!(catalog.last_on, day(20));
}

#[tokio::test]
async fn source_without_account_stays_unbound_after_update() {
    let (engine, _db) = engine_with_db().await;
    let vehicle = panda(&engine).await;

    let record = engine
        .record_maintenance(oil_change(vehicle, None, "120.00"))
        .await
        .unwrap();
    assert_eq!(record.ledger_entry_id, None);

    // An account opened later is not picked up by an update.
    checking(&engine, "500.00").await;
    let updated = engine
        .update_maintenance(
            record.id,
            MaintenanceUpdate {
                cost: Some(money("130.00")),
                ..Default::default()
            },
            "alice",
        )
        .await
        .unwrap();
    assert_eq!(updated.ledger_entry_id, None);
    assert_eq!(updated.cost, money("130.00"));
    assert_eq!(
        engine
            .entry_for_source(SourceRef::Maintenance(record.id))
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn each_source_binds_at_most_one_entry() {
    let (engine, _db) = engine_with_db().await;
    let account = checking(&engine, "1000.00").await;
    let vehicle = panda(&engine).await;

    let first = engine.record_fuel(fill_up(vehicle, "60.00")).await.unwrap();
    engine.delete_fuel(first.id, "alice").await.unwrap();
    let second = engine.record_fuel(fill_up(vehicle, "55.00")).await.unwrap();

    let synchronized = engine
        .list_entries(
            &LedgerListFilter {
                account_id: Some(account),
                origin: Some(EntryOrigin::Synchronized),
                ..Default::default()
            },
            100,
        )
        .await
        .unwrap();
    assert_eq!(synchronized.len(), 1);
    assert_eq!(synchronized[0].source, Some(SourceRef::Fuel(second.id)));
    assert_eq!(synchronized[0].name, "Fuel: Panda (40.000 L gasoline)");
    assert_eq!(engine.balance(account).await.unwrap(), money("945.00"));
    assert_eq!(engine.vehicle(vehicle).await.unwrap().odometer_km, 41_500);

    engine
        .update_fuel(
            second.id,
            FuelUpdate {
                total: Some(money("58.00")),
                fuel: Some(FuelKind::PremiumGasoline),
                ..Default::default()
            },
            "alice",
        )
        .await
        .unwrap();
    let entry = engine
        .entry_for_source(SourceRef::Fuel(second.id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.amount, money("58.00"));
    assert_eq!(entry.name, "Fuel: Panda (40.000 L premium gasoline)");

    let stored = engine.fuel_purchase(second.id).await.unwrap();
    assert_eq!(stored.fuel, FuelKind::PremiumGasoline);
    assert_eq!(stored.ledger_entry_id, Some(entry.id));
    assert!(matches!(
        engine.fuel_purchase(first.id).await.unwrap_err(),
        EngineError::KeyNotFound(_)
    ));
}

#[tokio::test]
async fn synchronized_entries_are_managed_by_their_source() {
    let (engine, _db) = engine_with_db().await;
    checking(&engine, "1000.00").await;
    let vehicle = panda(&engine).await;
    let fuel = engine.record_fuel(fill_up(vehicle, "60.00")).await.unwrap();
    let entry_id = fuel.ledger_entry_id.unwrap();

    let err = engine
        .update_entry(
            entry_id,
            EntryUpdate {
                amount: Some(money("1.00")),
                ..Default::default()
            },
            "alice",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ManagedEntry(_)));
    let err = engine.delete_entry(entry_id, "alice").await.unwrap_err();
    assert!(matches!(err, EngineError::ManagedEntry(_)));
    assert_eq!(engine.entry(entry_id).await.unwrap().amount, money("60.00"));
}

#[tokio::test]
async fn first_owned_picks_the_oldest_account() {
    let (engine, _db) = engine_with_db().await;
    let oldest = checking(&engine, "100.00").await;
    let newer = engine
        .new_account(NewAccount::new("Savings").owner("alice"))
        .await
        .unwrap();
    let vehicle = panda(&engine).await;

    let implicit = engine.record_fuel(fill_up(vehicle, "10.00")).await.unwrap();
    let entry = engine
        .entry(implicit.ledger_entry_id.unwrap())
        .await
        .unwrap();
    assert_eq!(entry.account_id, oldest);

    let mut explicit = fill_up(vehicle, "10.00");
    explicit.account = AccountSelection::Explicit(newer);
    let explicit = engine.record_fuel(explicit).await.unwrap();
    let entry = engine
        .entry(explicit.ledger_entry_id.unwrap())
        .await
        .unwrap();
    assert_eq!(entry.account_id, newer);

    let mut missing = fill_up(vehicle, "10.00");
    missing.account = AccountSelection::Explicit(Uuid::new_v4());
    let err = engine.record_fuel(missing).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn synchronized_expense_respects_negative_protection() {
    let (engine, _db) = engine_with_db().await;
    engine
        .new_account(
            NewAccount::new("Prepaid")
                .owner("alice")
                .starting_balance(money("50.00"))
                .rejects_negative(true),
        )
        .await
        .unwrap();
    let vehicle = panda(&engine).await;

    let err = engine
        .record_fuel(fill_up(vehicle, "60.00"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientBalance { .. }));
    // The fill-up itself rolled back too.
    assert_eq!(engine.vehicle(vehicle).await.unwrap().odometer_km, 40_000);
}

#[tokio::test]
async fn account_with_entries_cannot_be_deleted() {
    let (engine, _db) = engine_with_db().await;
    let account = checking(&engine, "0").await;
    let entry = engine
        .new_entry(NewEntry::new(
            account,
            "alice",
            EntryKind::Income,
            money("5.00"),
            day(1),
            "Found",
        ))
        .await
        .unwrap();

    let err = engine.delete_account(account).await.unwrap_err();
    assert!(matches!(err, EngineError::InUse(_)));

    engine.delete_entry(entry, "alice").await.unwrap();
    engine.delete_account(account).await.unwrap();
    assert!(engine.list_accounts(Some("alice")).await.unwrap().is_empty());
}

#[tokio::test]
async fn vehicles_belong_to_their_owner() {
    let (engine, _db) = engine_with_db().await;
    let vehicle = panda(&engine).await;
    let mut record = oil_change(vehicle, None, "10.00");
    record.user_id = "bob".to_string();
    let err = engine.record_maintenance(record).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}
