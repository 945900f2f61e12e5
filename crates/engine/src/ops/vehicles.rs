use uuid::Uuid;

use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*, sea_query::Expr,
};

use crate::{
    EngineError, MaintenanceService, NewMaintenanceService, NewVehicle, ResultEngine, Vehicle,
    maintenance_services, vehicles,
};

use super::{Engine, normalize_optional_text, normalize_required_name, with_tx};

fn ensure_odometer(km: i64) -> ResultEngine<()> {
    if km < 0 {
        return Err(EngineError::Validation(format!(
            "odometer must be >= 0, got {km}"
        )));
    }
    Ok(())
}

impl Engine {
    pub async fn new_vehicle(&self, cmd: NewVehicle) -> ResultEngine<Uuid> {
        let name = normalize_required_name(&cmd.name, "vehicle")?;
        let model = normalize_required_name(&cmd.model, "vehicle model")?;
        ensure_odometer(cmd.odometer_km)?;
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, &cmd.owner_id).await?;
            let id = Uuid::new_v4();
            vehicles::ActiveModel {
                id: ActiveValue::Set(id.to_string()),
                owner_id: ActiveValue::Set(cmd.owner_id.clone()),
                name: ActiveValue::Set(name),
                model: ActiveValue::Set(model),
                plate: ActiveValue::Set(normalize_optional_text(cmd.plate.as_deref())),
                odometer_km: ActiveValue::Set(cmd.odometer_km),
            }
            .insert(&db_tx)
            .await?;
            Ok(id)
        })
    }

    pub async fn vehicle(&self, vehicle_id: Uuid) -> ResultEngine<Vehicle> {
        with_tx!(self, |db_tx| {
            let model = self.require_vehicle(&db_tx, vehicle_id).await?;
            Vehicle::try_from(model)
        })
    }

    /// Adds a recurring service to a vehicle's maintenance catalog.
    pub async fn new_maintenance_service(
        &self,
        cmd: NewMaintenanceService,
    ) -> ResultEngine<Uuid> {
        let name = normalize_required_name(&cmd.name, "service")?;
        ensure_odometer(cmd.last_km)?;
        if cmd.interval_km.is_some_and(|km| km <= 0)
            || cmd.interval_days.is_some_and(|days| days <= 0)
        {
            return Err(EngineError::Validation(
                "service intervals must be > 0".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            self.require_vehicle(&db_tx, cmd.vehicle_id).await?;
            let id = Uuid::new_v4();
            maintenance_services::ActiveModel {
                id: ActiveValue::Set(id.to_string()),
                vehicle_id: ActiveValue::Set(cmd.vehicle_id.to_string()),
                name: ActiveValue::Set(name),
                interval_km: ActiveValue::Set(cmd.interval_km),
                interval_days: ActiveValue::Set(cmd.interval_days),
                last_km: ActiveValue::Set(cmd.last_km),
                last_on: ActiveValue::Set(cmd.last_on),
            }
            .insert(&db_tx)
            .await?;
            Ok(id)
        })
    }

    pub async fn maintenance_service(&self, service_id: Uuid) -> ResultEngine<MaintenanceService> {
        with_tx!(self, |db_tx| {
            let model = maintenance_services::Entity::find_by_id(service_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| {
                    EngineError::KeyNotFound(format!("maintenance service {service_id}"))
                })?;
            MaintenanceService::try_from(model)
        })
    }

    pub(super) async fn require_vehicle(
        &self,
        db_tx: &DatabaseTransaction,
        vehicle_id: Uuid,
    ) -> ResultEngine<vehicles::Model> {
        vehicles::Entity::find_by_id(vehicle_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("vehicle {vehicle_id}")))
    }

    /// The vehicle, provided `user_id` owns it.
    pub(super) async fn require_owned_vehicle(
        &self,
        db_tx: &DatabaseTransaction,
        vehicle_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<vehicles::Model> {
        let vehicle = self.require_vehicle(db_tx, vehicle_id).await?;
        if vehicle.owner_id != user_id {
            return Err(EngineError::Forbidden(format!(
                "vehicle {} belongs to another user",
                vehicle.name
            )));
        }
        Ok(vehicle)
    }

    /// Moves the odometer forward to `km`; a lower reading leaves it alone.
    pub(super) async fn raise_odometer(
        &self,
        db_tx: &DatabaseTransaction,
        vehicle: &vehicles::Model,
        km: i64,
    ) -> ResultEngine<()> {
        ensure_odometer(km)?;
        let result = vehicles::Entity::update_many()
            .col_expr(vehicles::Column::OdometerKm, Expr::value(km))
            .filter(vehicles::Column::Id.eq(vehicle.id.clone()))
            .filter(vehicles::Column::OdometerKm.lt(km))
            .exec(db_tx)
            .await?;
        if result.rows_affected > 0 {
            tracing::debug!(vehicle = %vehicle.id, km, "odometer raised");
        }
        Ok(())
    }
}
