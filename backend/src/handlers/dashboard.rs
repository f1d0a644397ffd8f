//! HTTP handlers for dashboard statistics

use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::AppResult;
use crate::services::dashboard::{DashboardFilter, DashboardService, DashboardStats};
use crate::AppState;

/// Dashboard statistics under the given filters
pub async fn get_dashboard_stats(
    State(state): State<AppState>,
    Query(filter): Query<DashboardFilter>,
) -> AppResult<Json<DashboardStats>> {
    let service = DashboardService::new(state.db);
    let stats = service.get_stats(&filter).await?;
    Ok(Json(stats))
}
