//! Product catalog service

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{OperationType, Product, ProductStatus, ProductWithForecast};
use shared::{ledger, validation};

/// Service managing the product catalog
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// Input for creating a product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub uom: Option<String>,
    pub cost: Option<Decimal>,
    pub price: Option<Decimal>,
    pub min_stock_rule: Option<i64>,
}

/// Input for updating a product
#[derive(Debug, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub category: Option<String>,
    pub uom: Option<String>,
    pub cost: Option<Decimal>,
    pub price: Option<Decimal>,
    pub min_stock_rule: Option<i64>,
    pub status: Option<ProductStatus>,
}

/// Filter for listing products
#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
    /// Case-insensitive match against name or SKU
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<ProductStatus>,
}

/// One item of a stock availability check
#[derive(Debug, Deserialize)]
pub struct CheckStockItem {
    pub name: String,
    pub quantity: i64,
}

/// Result of checking one item's availability
#[derive(Debug, Serialize)]
pub struct StockCheckResult {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<Uuid>,
    pub requested_quantity: i64,
    pub available_stock: i64,
    pub in_stock: bool,
    pub message: String,
}

/// Row for product queries
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    sku: String,
    name: String,
    category: Option<String>,
    uom: String,
    cost: Decimal,
    price: Decimal,
    min_stock_rule: i64,
    total_stock: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const PRODUCT_COLUMNS: &str = "id, sku, name, category, uom, cost, price, min_stock_rule, \
                               total_stock, status, created_at, updated_at";

impl ProductRow {
    fn into_product(self) -> AppResult<Product> {
        let status = ProductStatus::from_str(&self.status).ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!("unknown product status: {}", self.status))
        })?;
        Ok(Product {
            id: self.id,
            sku: self.sku,
            name: self.name,
            category: self.category,
            uom: self.uom,
            cost: self.cost,
            price: self.price,
            min_stock_rule: self.min_stock_rule,
            total_stock: self.total_stock,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a product
    pub async fn create_product(&self, input: CreateProductInput) -> AppResult<Product> {
        let sku = validation::normalize_sku(&input.sku);
        if let Err(message) = validation::validate_sku(&sku) {
            return Err(AppError::Validation {
                field: "sku".to_string(),
                message: message.to_string(),
            });
        }
        if input.name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Name must not be empty".to_string(),
            });
        }

        let cost = input.cost.unwrap_or(Decimal::ZERO);
        let price = input.price.unwrap_or(Decimal::ZERO);
        for (field, amount) in [("cost", cost), ("price", price)] {
            if let Err(message) = validation::validate_money(amount) {
                return Err(AppError::Validation {
                    field: field.to_string(),
                    message: message.to_string(),
                });
            }
        }

        let min_stock_rule = input.min_stock_rule.unwrap_or(10);
        if min_stock_rule < 0 {
            return Err(AppError::Validation {
                field: "min_stock_rule".to_string(),
                message: "Reorder threshold must not be negative".to_string(),
            });
        }

        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE sku = $1)")
                .bind(&sku)
                .fetch_one(&self.db)
                .await?;

        if exists {
            return Err(AppError::DuplicateEntry("sku".to_string()));
        }

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            INSERT INTO products (sku, name, category, uom, cost, price, min_stock_rule)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PRODUCT_COLUMNS}
            "#,
        ))
        .bind(&sku)
        .bind(input.name.trim())
        .bind(&input.category)
        .bind(input.uom.as_deref().unwrap_or("Units"))
        .bind(cost)
        .bind(price)
        .bind(min_stock_rule)
        .fetch_one(&self.db)
        .await?;

        row.into_product()
    }

    /// Get a product by id
    pub async fn get_product(&self, product_id: Uuid) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1",
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        row.into_product()
    }

    /// Update a product
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<Product> {
        let existing = self.get_product(product_id).await?;

        let name = input.name.unwrap_or(existing.name);
        if name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Name must not be empty".to_string(),
            });
        }
        let category = input.category.or(existing.category);
        let uom = input.uom.unwrap_or(existing.uom);
        let cost = input.cost.unwrap_or(existing.cost);
        let price = input.price.unwrap_or(existing.price);
        for (field, amount) in [("cost", cost), ("price", price)] {
            if let Err(message) = validation::validate_money(amount) {
                return Err(AppError::Validation {
                    field: field.to_string(),
                    message: message.to_string(),
                });
            }
        }
        let min_stock_rule = input.min_stock_rule.unwrap_or(existing.min_stock_rule);
        if min_stock_rule < 0 {
            return Err(AppError::Validation {
                field: "min_stock_rule".to_string(),
                message: "Reorder threshold must not be negative".to_string(),
            });
        }
        let status = input.status.unwrap_or(existing.status);

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            UPDATE products
            SET name = $1, category = $2, uom = $3, cost = $4, price = $5,
                min_stock_rule = $6, status = $7
            WHERE id = $8
            RETURNING {PRODUCT_COLUMNS}
            "#,
        ))
        .bind(name.trim())
        .bind(&category)
        .bind(&uom)
        .bind(cost)
        .bind(price)
        .bind(min_stock_rule)
        .bind(status.as_str())
        .bind(product_id)
        .fetch_one(&self.db)
        .await?;

        row.into_product()
    }

    /// Archive a product (kept for history, excluded from active listings)
    pub async fn archive_product(&self, product_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("UPDATE products SET status = 'archived' WHERE id = $1")
            .bind(product_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }

        Ok(())
    }

    /// List products matching the filter
    pub async fn list_products(&self, filter: &ProductFilter) -> AppResult<Vec<Product>> {
        let search = filter
            .search
            .as_ref()
            .map(|s| format!("%{}%", s.trim()));

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE ($1::text IS NULL OR name ILIKE $1 OR sku ILIKE $1)
              AND ($2::text IS NULL OR category = $2)
              AND ($3::text IS NULL OR status = $3)
            ORDER BY name
            "#,
        ))
        .bind(search)
        .bind(&filter.category)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(ProductRow::into_product).collect()
    }

    /// List products with their forecasted stock, projecting the lines of
    /// draft receipts and deliveries onto the current aggregate
    pub async fn list_products_with_forecast(
        &self,
        filter: &ProductFilter,
    ) -> AppResult<Vec<ProductWithForecast>> {
        let products = self.list_products(filter).await?;
        if products.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
        let draft_lines = sqlx::query_as::<_, (Uuid, String, i64)>(
            r#"
            SELECT ol.product_id, o.op_type, ol.quantity
            FROM operation_lines ol
            JOIN operations o ON o.id = ol.operation_id
            WHERE o.status = 'draft' AND ol.product_id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;

        let mut lines_by_product: HashMap<Uuid, Vec<(OperationType, i64)>> = HashMap::new();
        for (product_id, op_type, quantity) in draft_lines {
            let op_type = OperationType::from_str(&op_type).ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!("unknown operation type: {}", op_type))
            })?;
            lines_by_product
                .entry(product_id)
                .or_default()
                .push((op_type, quantity));
        }

        Ok(products
            .into_iter()
            .map(|product| {
                let lines = lines_by_product.remove(&product.id).unwrap_or_default();
                let forecasted = ledger::forecast_total(product.total_stock, lines);
                ProductWithForecast {
                    product,
                    forecasted,
                }
            })
            .collect())
    }

    /// Check availability of a list of requested items against the
    /// aggregate counters, matching products by name or SKU
    pub async fn check_stock(
        &self,
        items: Vec<CheckStockItem>,
    ) -> AppResult<Vec<StockCheckResult>> {
        let mut results = Vec::with_capacity(items.len());

        for item in items {
            if item.name.trim().is_empty() {
                results.push(StockCheckResult {
                    name: item.name,
                    product_id: None,
                    requested_quantity: item.quantity,
                    available_stock: 0,
                    in_stock: false,
                    message: "Product name not provided".to_string(),
                });
                continue;
            }

            let pattern = format!("%{}%", item.name.trim());
            let row = sqlx::query_as::<_, (Uuid, i64)>(
                r#"
                SELECT id, total_stock
                FROM products
                WHERE (name ILIKE $1 OR sku ILIKE $1) AND status = 'active'
                ORDER BY name
                LIMIT 1
                "#,
            )
            .bind(&pattern)
            .fetch_optional(&self.db)
            .await?;

            results.push(match row {
                None => StockCheckResult {
                    name: item.name,
                    product_id: None,
                    requested_quantity: item.quantity,
                    available_stock: 0,
                    in_stock: false,
                    message: "Product not found in inventory".to_string(),
                },
                Some((product_id, total_stock)) => {
                    let in_stock = total_stock >= item.quantity;
                    StockCheckResult {
                        name: item.name,
                        product_id: Some(product_id),
                        requested_quantity: item.quantity,
                        available_stock: total_stock,
                        in_stock,
                        message: if in_stock {
                            "In stock".to_string()
                        } else {
                            format!("Insufficient stock. Available: {}", total_stock)
                        },
                    }
                }
            });
        }

        Ok(results)
    }
}
