//! HTTP handlers for operation documents

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Operation, OperationStatus, OperationType};
use crate::services::operation::{
    CreateOperationInput, OperationFilter, OperationService, UpdateOperationInput,
};
use crate::AppState;
use shared::types::{PaginatedResponse, Pagination};

/// Query parameters for listing operations
#[derive(Debug, Default, Deserialize)]
pub struct ListOperationsQuery {
    pub op_type: Option<OperationType>,
    pub status: Option<OperationStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// List operations, newest first
pub async fn list_operations(
    State(state): State<AppState>,
    Query(query): Query<ListOperationsQuery>,
) -> AppResult<Json<PaginatedResponse<Operation>>> {
    let service = OperationService::new(state.db);
    let filter = OperationFilter {
        op_type: query.op_type,
        status: query.status,
    };
    let defaults = Pagination::default();
    let pagination = Pagination {
        page: query.page.unwrap_or(defaults.page),
        per_page: query.per_page.unwrap_or(defaults.per_page),
    };
    let page = service.list_operations(&filter, pagination).await?;
    Ok(Json(page))
}

/// Create a draft operation
pub async fn create_operation(
    State(state): State<AppState>,
    Json(input): Json<CreateOperationInput>,
) -> AppResult<Json<Operation>> {
    let service = OperationService::new(state.db);
    let operation = service.create_operation(input).await?;
    Ok(Json(operation))
}

/// Get an operation with its lines
pub async fn get_operation(
    State(state): State<AppState>,
    Path(operation_id): Path<Uuid>,
) -> AppResult<Json<Operation>> {
    let service = OperationService::new(state.db);
    let operation = service.get_operation(operation_id).await?;
    Ok(Json(operation))
}

/// Update a pending operation
pub async fn update_operation(
    State(state): State<AppState>,
    Path(operation_id): Path<Uuid>,
    Json(input): Json<UpdateOperationInput>,
) -> AppResult<Json<Operation>> {
    let service = OperationService::new(state.db);
    let operation = service.update_operation(operation_id, input).await?;
    Ok(Json(operation))
}

/// Commit an operation into the stock ledger
pub async fn validate_operation(
    State(state): State<AppState>,
    Path(operation_id): Path<Uuid>,
) -> AppResult<Json<Operation>> {
    let service = OperationService::new(state.db);
    service.validate_operation(operation_id).await?;
    let operation = service.get_operation(operation_id).await?;
    Ok(Json(operation))
}

/// Cancel a pending operation
pub async fn cancel_operation(
    State(state): State<AppState>,
    Path(operation_id): Path<Uuid>,
) -> AppResult<Json<Operation>> {
    let service = OperationService::new(state.db);
    let operation = service.cancel_operation(operation_id).await?;
    Ok(Json(operation))
}

/// Response of an availability check
#[derive(Debug, Serialize)]
pub struct CheckAvailabilityResponse {
    pub status: OperationStatus,
}

/// Re-classify a pending operation as ready or waiting
pub async fn check_operation_availability(
    State(state): State<AppState>,
    Path(operation_id): Path<Uuid>,
) -> AppResult<Json<CheckAvailabilityResponse>> {
    let service = OperationService::new(state.db);
    let status = service.check_availability(operation_id).await?;
    Ok(Json(CheckAvailabilityResponse { status }))
}

/// Completed movements, newest first
pub async fn move_history(State(state): State<AppState>) -> AppResult<Json<Vec<Operation>>> {
    let service = OperationService::new(state.db);
    let history = service.move_history().await?;
    Ok(Json(history))
}
