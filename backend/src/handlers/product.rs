//! HTTP handlers for the product catalog

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Product, ProductWithForecast};
use crate::services::product::{
    CheckStockItem, CreateProductInput, ProductFilter, ProductService, StockCheckResult,
    UpdateProductInput,
};
use crate::AppState;

/// Create a product
pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<CreateProductInput>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.db);
    let product = service.create_product(input).await?;
    Ok(Json(product))
}

/// List products with forecasted stock
pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> AppResult<Json<Vec<ProductWithForecast>>> {
    let service = ProductService::new(state.db);
    let products = service.list_products_with_forecast(&filter).await?;
    Ok(Json(products))
}

/// Get a product
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.db);
    let product = service.get_product(product_id).await?;
    Ok(Json(product))
}

/// Update a product
pub async fn update_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.db);
    let product = service.update_product(product_id, input).await?;
    Ok(Json(product))
}

/// Archive a product
pub async fn archive_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = ProductService::new(state.db);
    service.archive_product(product_id).await?;
    Ok(Json(()))
}

/// Request body for a stock availability check
#[derive(Debug, Deserialize)]
pub struct CheckStockRequest {
    pub products: Vec<CheckStockItem>,
}

/// Check stock availability for a list of requested items
pub async fn check_stock(
    State(state): State<AppState>,
    Json(request): Json<CheckStockRequest>,
) -> AppResult<Json<Vec<StockCheckResult>>> {
    let service = ProductService::new(state.db);
    let results = service.check_stock(request.products).await?;
    Ok(Json(results))
}
