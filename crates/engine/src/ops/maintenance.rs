use chrono::NaiveDate;
use uuid::Uuid;

use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*, sea_query::Expr,
};

use crate::{
    EngineError, MaintenanceRecord, MaintenanceUpdate, Money, NewMaintenance, ResultEngine,
    SourceRef, maintenance_records, maintenance_services, vehicles,
    util::{parse_optional_uuid, parse_uuid},
};

use super::{
    Engine, normalize_required_name,
    sync::{LedgerDraft, LedgerSource},
    with_tx,
};

const CATEGORY: &str = "Vehicle maintenance";

struct MaintenanceSource<'a> {
    record: &'a maintenance_records::Model,
    vehicle: &'a vehicles::Model,
}

impl LedgerSource for MaintenanceSource<'_> {
    fn source_ref(&self) -> ResultEngine<SourceRef> {
        Ok(SourceRef::Maintenance(parse_uuid(
            &self.record.id,
            "maintenance record",
        )?))
    }

    fn bound_entry(&self) -> ResultEngine<Option<Uuid>> {
        parse_optional_uuid(self.record.ledger_entry_id.as_deref(), "ledger entry")
    }

    fn draft(&self) -> LedgerDraft {
        LedgerDraft {
            user_id: self.record.user_id.clone(),
            name: format!(
                "Maintenance {}: {}",
                self.vehicle.model, self.record.description
            ),
            note: Some(format!("odometer {} km", self.record.odometer_km)),
            amount: Money::new(self.record.cost_minor),
            occurred_on: self.record.performed_on,
            category: CATEGORY,
        }
    }
}

fn ensure_cost(cost: Money) -> ResultEngine<()> {
    if cost.is_negative() {
        return Err(EngineError::InvalidAmount(format!(
            "cost must be >= 0, got {cost}"
        )));
    }
    Ok(())
}

impl Engine {
    /// Records a service done on a vehicle and charges it to the ledger.
    ///
    /// Pushes the odometer forward and, for a catalog service, its last
    /// performed mark.
    pub async fn record_maintenance(&self, cmd: NewMaintenance) -> ResultEngine<MaintenanceRecord> {
        let description = normalize_required_name(&cmd.description, "maintenance")?;
        ensure_cost(cmd.cost)?;
        with_tx!(self, |db_tx| {
            let vehicle = self
                .require_owned_vehicle(&db_tx, cmd.vehicle_id, &cmd.user_id)
                .await?;
            if let Some(service_id) = cmd.service_id {
                self.require_vehicle_service(&db_tx, service_id, &vehicle)
                    .await?;
            }

            let record = maintenance_records::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4().to_string()),
                user_id: ActiveValue::Set(cmd.user_id.clone()),
                vehicle_id: ActiveValue::Set(vehicle.id.clone()),
                service_id: ActiveValue::Set(cmd.service_id.map(|id| id.to_string())),
                description: ActiveValue::Set(description),
                performed_on: ActiveValue::Set(cmd.performed_on),
                odometer_km: ActiveValue::Set(cmd.odometer_km),
                cost_minor: ActiveValue::Set(cmd.cost.minor()),
                ledger_entry_id: ActiveValue::Set(None),
            }
            .insert(&db_tx)
            .await?;
            self.apply_maintenance_side_effects(&db_tx, &record, &vehicle)
                .await?;

            let outcome = self
                .sync_on_create(
                    &db_tx,
                    &MaintenanceSource {
                        record: &record,
                        vehicle: &vehicle,
                    },
                    cmd.account,
                )
                .await?;
            let record = match outcome.entry_id() {
                Some(entry_id) => {
                    let mut active: maintenance_records::ActiveModel = record.into();
                    active.ledger_entry_id = ActiveValue::Set(Some(entry_id.to_string()));
                    active.update(&db_tx).await?
                }
                None => record,
            };
            tracing::info!(record = %record.id, vehicle = %vehicle.id, "maintenance recorded");
            MaintenanceRecord::try_from(record)
        })
    }

    /// Edits a record and rewrites its ledger entry, if it has one.
    pub async fn update_maintenance(
        &self,
        record_id: Uuid,
        update: MaintenanceUpdate,
        user_id: &str,
    ) -> ResultEngine<MaintenanceRecord> {
        if let Some(cost) = update.cost {
            ensure_cost(cost)?;
        }
        with_tx!(self, |db_tx| {
            let record = self
                .require_maintenance_record(&db_tx, record_id, user_id)
                .await?;
            let vehicle = self
                .require_vehicle(&db_tx, parse_uuid(&record.vehicle_id, "vehicle")?)
                .await?;

            let mut active: maintenance_records::ActiveModel = record.into();
            if let Some(description) = update.description.as_deref() {
                active.description =
                    ActiveValue::Set(normalize_required_name(description, "maintenance")?);
            }
            if let Some(date) = update.performed_on {
                active.performed_on = ActiveValue::Set(date);
            }
            if let Some(km) = update.odometer_km {
                active.odometer_km = ActiveValue::Set(km);
            }
            if let Some(cost) = update.cost {
                active.cost_minor = ActiveValue::Set(cost.minor());
            }
            let record = active.update(&db_tx).await?;
            self.apply_maintenance_side_effects(&db_tx, &record, &vehicle)
                .await?;

            self.sync_on_update(
                &db_tx,
                &MaintenanceSource {
                    record: &record,
                    vehicle: &vehicle,
                },
            )
            .await?;
            MaintenanceRecord::try_from(record)
        })
    }

    /// Deletes a record together with its ledger entry.
    pub async fn delete_maintenance(&self, record_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let record = self
                .require_maintenance_record(&db_tx, record_id, user_id)
                .await?;
            let vehicle = self
                .require_vehicle(&db_tx, parse_uuid(&record.vehicle_id, "vehicle")?)
                .await?;
            self.sync_on_delete(
                &db_tx,
                &MaintenanceSource {
                    record: &record,
                    vehicle: &vehicle,
                },
            )
            .await?;
            maintenance_records::Entity::delete_by_id(record.id.clone())
                .exec(&db_tx)
                .await?;
            tracing::info!(record = %record.id, "maintenance deleted");
            Ok(())
        })
    }

    pub async fn maintenance(&self, record_id: Uuid) -> ResultEngine<MaintenanceRecord> {
        with_tx!(self, |db_tx| {
            let model = maintenance_records::Entity::find_by_id(record_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| {
                    EngineError::KeyNotFound(format!("maintenance record {record_id}"))
                })?;
            MaintenanceRecord::try_from(model)
        })
    }

    async fn require_maintenance_record(
        &self,
        db_tx: &DatabaseTransaction,
        record_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<maintenance_records::Model> {
        let record = maintenance_records::Entity::find_by_id(record_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("maintenance record {record_id}")))?;
        if record.user_id != user_id {
            return Err(EngineError::Forbidden(format!(
                "maintenance record {record_id} belongs to another user"
            )));
        }
        Ok(record)
    }

    async fn require_vehicle_service(
        &self,
        db_tx: &DatabaseTransaction,
        service_id: Uuid,
        vehicle: &vehicles::Model,
    ) -> ResultEngine<maintenance_services::Model> {
        let service = maintenance_services::Entity::find_by_id(service_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("maintenance service {service_id}")))?;
        if service.vehicle_id != vehicle.id {
            return Err(EngineError::Validation(format!(
                "service {} is not in the catalog of vehicle {}",
                service.name, vehicle.name
            )));
        }
        Ok(service)
    }

    async fn apply_maintenance_side_effects(
        &self,
        db_tx: &DatabaseTransaction,
        record: &maintenance_records::Model,
        vehicle: &vehicles::Model,
    ) -> ResultEngine<()> {
        self.raise_odometer(db_tx, vehicle, record.odometer_km)
            .await?;
        if let Some(service_id) = record.service_id.as_deref() {
            self.advance_service(db_tx, service_id, record.odometer_km, record.performed_on)
                .await?;
        }
        Ok(())
    }

    /// Marks a catalog service as last done at `km` on `performed_on`,
    /// unless it already has a later mark.
    async fn advance_service(
        &self,
        db_tx: &DatabaseTransaction,
        service_id: &str,
        km: i64,
        performed_on: NaiveDate,
    ) -> ResultEngine<()> {
        maintenance_services::Entity::update_many()
            .col_expr(maintenance_services::Column::LastKm, Expr::value(km))
            .col_expr(
                maintenance_services::Column::LastOn,
                Expr::value(performed_on),
            )
            .filter(maintenance_services::Column::Id.eq(service_id))
            .filter(maintenance_services::Column::LastOn.lte(performed_on))
            .exec(db_tx)
            .await?;
        Ok(())
    }
}
