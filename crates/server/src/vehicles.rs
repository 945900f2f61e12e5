//! Vehicles, maintenance and fuel API endpoints.

use api_types::vehicle::{
    FuelKind as ApiFuel, FuelNew, FuelUpdate, FuelView, MaintenanceNew, MaintenanceUpdate,
    MaintenanceView, ServiceCreated, ServiceNew, VehicleCreated, VehicleNew,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{
    AccountSelection, EngineError, FuelKind, FuelPurchase, MaintenanceRecord, Money,
    NewFuelPurchase, NewMaintenance, NewMaintenanceService, NewVehicle, Quantity,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

pub(crate) fn account_selection(account_id: Option<Uuid>) -> AccountSelection {
    account_id.map_or(AccountSelection::FirstOwned, AccountSelection::Explicit)
}

fn map_fuel(fuel: ApiFuel) -> FuelKind {
    match fuel {
        ApiFuel::Gasoline => FuelKind::Gasoline,
        ApiFuel::PremiumGasoline => FuelKind::PremiumGasoline,
        ApiFuel::Ethanol => FuelKind::Ethanol,
        ApiFuel::Diesel => FuelKind::Diesel,
        ApiFuel::Cng => FuelKind::Cng,
    }
}

fn fuel_view_kind(fuel: FuelKind) -> ApiFuel {
    match fuel {
        FuelKind::Gasoline => ApiFuel::Gasoline,
        FuelKind::PremiumGasoline => ApiFuel::PremiumGasoline,
        FuelKind::Ethanol => ApiFuel::Ethanol,
        FuelKind::Diesel => ApiFuel::Diesel,
        FuelKind::Cng => ApiFuel::Cng,
    }
}

fn maintenance_view(record: MaintenanceRecord) -> MaintenanceView {
    MaintenanceView {
        id: record.id,
        vehicle_id: record.vehicle_id,
        service_id: record.service_id,
        description: record.description,
        performed_on: record.performed_on,
        odometer_km: record.odometer_km,
        cost_minor: record.cost.minor(),
        ledger_entry_id: record.ledger_entry_id,
    }
}

fn fuel_view(purchase: FuelPurchase) -> FuelView {
    FuelView {
        id: purchase.id,
        vehicle_id: purchase.vehicle_id,
        purchased_on: purchase.purchased_on,
        odometer_km: purchase.odometer_km,
        liters_milli: purchase.liters.milli(),
        total_minor: purchase.total.minor(),
        fuel: fuel_view_kind(purchase.fuel),
        ledger_entry_id: purchase.ledger_entry_id,
    }
}

pub async fn vehicle_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<VehicleNew>,
) -> Result<(StatusCode, Json<VehicleCreated>), ServerError> {
    let id = state
        .engine
        .new_vehicle(NewVehicle {
            owner_id: user.username,
            name: payload.name,
            model: payload.model,
            plate: payload.plate,
            odometer_km: payload.odometer_km,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(VehicleCreated { id })))
}

pub async fn service_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(vehicle_id): Path<Uuid>,
    Json(payload): Json<ServiceNew>,
) -> Result<(StatusCode, Json<ServiceCreated>), ServerError> {
    let vehicle = state.engine.vehicle(vehicle_id).await?;
    if vehicle.owner_id != user.username {
        return Err(ServerError::Engine(EngineError::Forbidden(format!(
            "vehicle {} belongs to another user",
            vehicle.name
        ))));
    }
    let id = state
        .engine
        .new_maintenance_service(NewMaintenanceService {
            vehicle_id,
            name: payload.name,
            interval_km: payload.interval_km,
            interval_days: payload.interval_days,
            last_km: payload.last_km,
            last_on: payload.last_on,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(ServiceCreated { id })))
}

pub async fn maintenance_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<MaintenanceNew>,
) -> Result<(StatusCode, Json<MaintenanceView>), ServerError> {
    let record = state
        .engine
        .record_maintenance(NewMaintenance {
            user_id: user.username,
            vehicle_id: payload.vehicle_id,
            service_id: payload.service_id,
            description: payload.description,
            performed_on: payload.performed_on,
            odometer_km: payload.odometer_km,
            cost: Money::new(payload.cost_minor),
            account: account_selection(payload.account_id),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(maintenance_view(record))))
}

pub async fn maintenance_update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MaintenanceUpdate>,
) -> Result<Json<MaintenanceView>, ServerError> {
    let update = engine::MaintenanceUpdate {
        description: payload.description,
        performed_on: payload.performed_on,
        odometer_km: payload.odometer_km,
        cost: payload.cost_minor.map(Money::new),
    };
    let record = state
        .engine
        .update_maintenance(id, update, &user.username)
        .await?;
    Ok(Json(maintenance_view(record)))
}

pub async fn maintenance_delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_maintenance(id, &user.username).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn fuel_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<FuelNew>,
) -> Result<(StatusCode, Json<FuelView>), ServerError> {
    let purchase = state
        .engine
        .record_fuel(NewFuelPurchase {
            user_id: user.username,
            vehicle_id: payload.vehicle_id,
            purchased_on: payload.purchased_on,
            odometer_km: payload.odometer_km,
            liters: Quantity::from_milli(payload.liters_milli),
            total: Money::new(payload.total_minor),
            fuel: map_fuel(payload.fuel),
            account: account_selection(payload.account_id),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(fuel_view(purchase))))
}

pub async fn fuel_update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FuelUpdate>,
) -> Result<Json<FuelView>, ServerError> {
    let update = engine::FuelUpdate {
        purchased_on: payload.purchased_on,
        odometer_km: payload.odometer_km,
        liters: payload.liters_milli.map(Quantity::from_milli),
        total: payload.total_minor.map(Money::new),
        fuel: payload.fuel.map(map_fuel),
    };
    let purchase = state.engine.update_fuel(id, update, &user.username).await?;
    Ok(Json(fuel_view(purchase)))
}

pub async fn fuel_delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_fuel(id, &user.username).await?;
    Ok(StatusCode::NO_CONTENT)
}
