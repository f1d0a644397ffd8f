//! HTTP handlers for warehouse and location management

use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::AppResult;
use crate::models::{Location, Warehouse};
use crate::services::warehouse::{
    CreateLocationInput, CreateWarehouseInput, LocationFilter, WarehouseService,
};
use crate::AppState;

/// Create a warehouse
pub async fn create_warehouse(
    State(state): State<AppState>,
    Json(input): Json<CreateWarehouseInput>,
) -> AppResult<Json<Warehouse>> {
    let service = WarehouseService::new(state.db);
    let warehouse = service.create_warehouse(input).await?;
    Ok(Json(warehouse))
}

/// List all warehouses
pub async fn list_warehouses(State(state): State<AppState>) -> AppResult<Json<Vec<Warehouse>>> {
    let service = WarehouseService::new(state.db);
    let warehouses = service.list_warehouses().await?;
    Ok(Json(warehouses))
}

/// Ensure the default warehouse and stock location exist
pub async fn initialize_warehouse(State(state): State<AppState>) -> AppResult<Json<Warehouse>> {
    let service = WarehouseService::new(state.db);
    let warehouse = service.initialize().await?;
    Ok(Json(warehouse))
}

/// Create a location
pub async fn create_location(
    State(state): State<AppState>,
    Json(input): Json<CreateLocationInput>,
) -> AppResult<Json<Location>> {
    let service = WarehouseService::new(state.db);
    let location = service.create_location(input).await?;
    Ok(Json(location))
}

/// List locations
pub async fn list_locations(
    State(state): State<AppState>,
    Query(filter): Query<LocationFilter>,
) -> AppResult<Json<Vec<Location>>> {
    let service = WarehouseService::new(state.db);
    let locations = service.list_locations(filter).await?;
    Ok(Json(locations))
}
