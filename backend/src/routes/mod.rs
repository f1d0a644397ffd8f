//! Route definitions for the Warehouse Management Platform

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Warehouse and location registry
        .nest("/warehouses", warehouse_routes())
        .route(
            "/locations",
            get(handlers::list_locations).post(handlers::create_location),
        )
        // Product catalog
        .nest("/products", product_routes())
        // Stock ledger and adjustments
        .nest("/stock", stock_routes())
        // Operation documents
        .nest("/operations", operation_routes())
        // Dashboard statistics
        .route("/dashboard/stats", get(handlers::get_dashboard_stats))
}

/// Warehouse registry routes
fn warehouse_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_warehouses).post(handlers::create_warehouse),
        )
        .route("/initialize", post(handlers::initialize_warehouse))
}

/// Product catalog routes
fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route("/check-stock", post(handlers::check_stock))
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::archive_product),
        )
}

/// Stock ledger routes
fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/quants", get(handlers::list_quants))
        .route("/level", get(handlers::get_stock_level))
        .route(
            "/adjustments",
            get(handlers::list_adjustments).post(handlers::create_adjustment),
        )
        .route("/reconcile", post(handlers::reconcile_totals))
}

/// Operation document routes
fn operation_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_operations).post(handlers::create_operation),
        )
        .route("/history", get(handlers::move_history))
        .route(
            "/:operation_id",
            get(handlers::get_operation).patch(handlers::update_operation),
        )
        .route("/:operation_id/validate", post(handlers::validate_operation))
        .route("/:operation_id/cancel", post(handlers::cancel_operation))
        .route(
            "/:operation_id/check",
            post(handlers::check_operation_availability),
        )
}
