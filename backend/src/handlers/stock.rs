//! HTTP handlers for the stock ledger and adjustments

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Operation, OperationType};
use crate::services::operation::{OperationFilter, OperationService};
use crate::services::stock::{
    AdjustmentOutcome, CreateAdjustmentInput, QuantFilter, QuantView, ReconcileReport,
    StockService,
};
use crate::AppState;
use shared::types::Pagination;

/// Query for a single ledger balance
#[derive(Debug, Deserialize)]
pub struct StockLevelQuery {
    pub product_id: Uuid,
    pub location_id: Uuid,
}

/// A single ledger balance
#[derive(Debug, Serialize)]
pub struct StockLevelResponse {
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub quantity: i64,
}

/// Ledgered quantity of a product at a location (0 if never stocked)
pub async fn get_stock_level(
    State(state): State<AppState>,
    Query(query): Query<StockLevelQuery>,
) -> AppResult<Json<StockLevelResponse>> {
    let service = StockService::new(state.db);
    let quantity = service
        .get_quantity(query.product_id, query.location_id)
        .await?;
    Ok(Json(StockLevelResponse {
        product_id: query.product_id,
        location_id: query.location_id,
        quantity,
    }))
}

/// List stock quants
pub async fn list_quants(
    State(state): State<AppState>,
    Query(filter): Query<QuantFilter>,
) -> AppResult<Json<Vec<QuantView>>> {
    let service = StockService::new(state.db);
    let quants = service.list_quants(filter).await?;
    Ok(Json(quants))
}

/// Reconcile a counted quantity against the ledger
pub async fn create_adjustment(
    State(state): State<AppState>,
    Json(input): Json<CreateAdjustmentInput>,
) -> AppResult<Json<AdjustmentOutcome>> {
    let service = StockService::new(state.db);
    let outcome = service.create_adjustment(input).await?;
    Ok(Json(outcome))
}

/// List adjustment operations, newest first
pub async fn list_adjustments(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Operation>>> {
    let service = OperationService::new(state.db);
    let filter = OperationFilter {
        op_type: Some(OperationType::Adjustment),
        status: None,
    };
    let page = service
        .list_operations(&filter, Pagination::default())
        .await?;
    Ok(Json(page.data))
}

/// Query for a reconciliation run
#[derive(Debug, Default, Deserialize)]
pub struct ReconcileQuery {
    #[serde(default)]
    pub repair: bool,
}

/// Audit the aggregate counters against the summed quants
pub async fn reconcile_totals(
    State(state): State<AppState>,
    Query(query): Query<ReconcileQuery>,
) -> AppResult<Json<ReconcileReport>> {
    let service = StockService::new(state.db);
    let report = service.reconcile_totals(query.repair).await?;
    Ok(Json(report))
}
