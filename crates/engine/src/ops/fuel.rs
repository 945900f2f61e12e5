use uuid::Uuid;

use sea_orm::{ActiveValue, DatabaseTransaction, TransactionTrait, prelude::*};

use crate::{
    EngineError, FuelKind, FuelPurchase, FuelUpdate, Money, NewFuelPurchase, Quantity,
    ResultEngine, SourceRef, fuel_purchases, vehicles,
    util::{ensure_positive_quantity, parse_optional_uuid, parse_uuid},
};

use super::{
    Engine,
    sync::{LedgerDraft, LedgerSource},
    with_tx,
};

const CATEGORY: &str = "Fuel";

struct FuelSource<'a> {
    purchase: &'a fuel_purchases::Model,
    vehicle: &'a vehicles::Model,
}

impl LedgerSource for FuelSource<'_> {
    fn source_ref(&self) -> ResultEngine<SourceRef> {
        Ok(SourceRef::Fuel(parse_uuid(&self.purchase.id, "fuel purchase")?))
    }

    fn bound_entry(&self) -> ResultEngine<Option<Uuid>> {
        parse_optional_uuid(self.purchase.ledger_entry_id.as_deref(), "ledger entry")
    }

    fn draft(&self) -> LedgerDraft {
        let fuel = FuelKind::try_from(self.purchase.fuel.as_str())
            .map(FuelKind::label)
            .unwrap_or("fuel");
        LedgerDraft {
            user_id: self.purchase.user_id.clone(),
            name: format!(
                "Fuel: {} ({} L {fuel})",
                self.vehicle.model,
                Quantity::from_milli(self.purchase.liters_milli)
            ),
            note: Some(format!("odometer {} km", self.purchase.odometer_km)),
            amount: Money::new(self.purchase.total_minor),
            occurred_on: self.purchase.purchased_on,
            category: CATEGORY,
        }
    }
}

fn ensure_total(total: Money) -> ResultEngine<()> {
    if !total.is_positive() {
        return Err(EngineError::InvalidAmount(format!(
            "fuel total must be > 0, got {total}"
        )));
    }
    Ok(())
}

impl Engine {
    /// Records a fill-up, pushes the odometer forward and charges the total
    /// to the ledger.
    pub async fn record_fuel(&self, cmd: NewFuelPurchase) -> ResultEngine<FuelPurchase> {
        ensure_positive_quantity(cmd.liters, "liters")?;
        ensure_total(cmd.total)?;
        with_tx!(self, |db_tx| {
            let vehicle = self
                .require_owned_vehicle(&db_tx, cmd.vehicle_id, &cmd.user_id)
                .await?;
            let purchase = fuel_purchases::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4().to_string()),
                user_id: ActiveValue::Set(cmd.user_id.clone()),
                vehicle_id: ActiveValue::Set(vehicle.id.clone()),
                purchased_on: ActiveValue::Set(cmd.purchased_on),
                odometer_km: ActiveValue::Set(cmd.odometer_km),
                liters_milli: ActiveValue::Set(cmd.liters.milli()),
                total_minor: ActiveValue::Set(cmd.total.minor()),
                fuel: ActiveValue::Set(cmd.fuel.as_str().to_string()),
                ledger_entry_id: ActiveValue::Set(None),
            }
            .insert(&db_tx)
            .await?;
            self.raise_odometer(&db_tx, &vehicle, purchase.odometer_km)
                .await?;

            let outcome = self
                .sync_on_create(
                    &db_tx,
                    &FuelSource {
                        purchase: &purchase,
                        vehicle: &vehicle,
                    },
                    cmd.account,
                )
                .await?;
            let purchase = match outcome.entry_id() {
                Some(entry_id) => {
                    let mut active: fuel_purchases::ActiveModel = purchase.into();
                    active.ledger_entry_id = ActiveValue::Set(Some(entry_id.to_string()));
                    active.update(&db_tx).await?
                }
                None => purchase,
            };
            tracing::info!(fuel = %purchase.id, vehicle = %vehicle.id, "fuel purchase recorded");
            FuelPurchase::try_from(purchase)
        })
    }

    pub async fn update_fuel(
        &self,
        purchase_id: Uuid,
        update: FuelUpdate,
        user_id: &str,
    ) -> ResultEngine<FuelPurchase> {
        if let Some(liters) = update.liters {
            ensure_positive_quantity(liters, "liters")?;
        }
        if let Some(total) = update.total {
            ensure_total(total)?;
        }
        with_tx!(self, |db_tx| {
            let purchase = self
                .require_fuel_purchase(&db_tx, purchase_id, user_id)
                .await?;
            let vehicle = self
                .require_vehicle(&db_tx, parse_uuid(&purchase.vehicle_id, "vehicle")?)
                .await?;

            let mut active: fuel_purchases::ActiveModel = purchase.into();
            if let Some(date) = update.purchased_on {
                active.purchased_on = ActiveValue::Set(date);
            }
            if let Some(km) = update.odometer_km {
                active.odometer_km = ActiveValue::Set(km);
            }
            if let Some(liters) = update.liters {
                active.liters_milli = ActiveValue::Set(liters.milli());
            }
            if let Some(total) = update.total {
                active.total_minor = ActiveValue::Set(total.minor());
            }
            if let Some(fuel) = update.fuel {
                active.fuel = ActiveValue::Set(fuel.as_str().to_string());
            }
            let purchase = active.update(&db_tx).await?;
            self.raise_odometer(&db_tx, &vehicle, purchase.odometer_km)
                .await?;

            self.sync_on_update(
                &db_tx,
                &FuelSource {
                    purchase: &purchase,
                    vehicle: &vehicle,
                },
            )
            .await?;
            FuelPurchase::try_from(purchase)
        })
    }

    pub async fn delete_fuel(&self, purchase_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let purchase = self
                .require_fuel_purchase(&db_tx, purchase_id, user_id)
                .await?;
            let vehicle = self
                .require_vehicle(&db_tx, parse_uuid(&purchase.vehicle_id, "vehicle")?)
                .await?;
            self.sync_on_delete(
                &db_tx,
                &FuelSource {
                    purchase: &purchase,
                    vehicle: &vehicle,
                },
            )
            .await?;
            fuel_purchases::Entity::delete_by_id(purchase.id.clone())
                .exec(&db_tx)
                .await?;
            tracing::info!(fuel = %purchase.id, "fuel purchase deleted");
            Ok(())
        })
    }

    pub async fn fuel_purchase(&self, purchase_id: Uuid) -> ResultEngine<FuelPurchase> {
        with_tx!(self, |db_tx| {
            let model = fuel_purchases::Entity::find_by_id(purchase_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(format!("fuel purchase {purchase_id}")))?;
            FuelPurchase::try_from(model)
        })
    }

    async fn require_fuel_purchase(
        &self,
        db_tx: &DatabaseTransaction,
        purchase_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<fuel_purchases::Model> {
        let purchase = fuel_purchases::Entity::find_by_id(purchase_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("fuel purchase {purchase_id}")))?;
        if purchase.user_id != user_id {
            return Err(EngineError::Forbidden(format!(
                "fuel purchase {purchase_id} belongs to another user"
            )));
        }
        Ok(purchase)
    }
}
