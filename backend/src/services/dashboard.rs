//! Dashboard KPI aggregation service
//!
//! Read-only: counts operations by status and type and classifies product
//! stock levels. Never mutates the ledger.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{OperationStatus, OperationType};

/// Service computing dashboard statistics
#[derive(Clone)]
pub struct DashboardService {
    db: PgPool,
}

/// Filters narrowing the dashboard scope
#[derive(Debug, Default, Deserialize)]
pub struct DashboardFilter {
    pub op_type: Option<OperationType>,
    pub status: Option<OperationStatus>,
    /// Expanded to the warehouse's locations
    pub warehouse_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    /// Product category; restricts both product KPIs and the operations
    /// that carry lines of matching products
    pub category: Option<String>,
}

/// Headline numbers for the dashboard
#[derive(Debug, Serialize)]
pub struct DashboardKpis {
    pub pending_receipts: i64,
    pub pending_deliveries: i64,
    pub pending_internal: i64,
    pub low_stock_items: i64,
    pub out_of_stock_items: i64,
    /// Sum of aggregate counters over the filtered products. A unit
    /// count, not a monetary valuation.
    pub total_units_on_hand: i64,
}

/// Operation count for one status
#[derive(Debug, Serialize)]
pub struct StatusCount {
    pub status: OperationStatus,
    pub count: i64,
}

/// Operation count for one type
#[derive(Debug, Serialize)]
pub struct TypeCount {
    pub op_type: OperationType,
    pub count: i64,
}

/// Full dashboard statistics payload
#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub kpis: DashboardKpis,
    pub by_status: Vec<StatusCount>,
    pub by_type: Vec<TypeCount>,
    pub total_operations: i64,
}

/// Row of the grouped operation count query
#[derive(Debug, sqlx::FromRow)]
struct GroupCountRow {
    op_type: String,
    status: String,
    count: i64,
}

impl DashboardService {
    /// Create a new DashboardService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Compute dashboard statistics under the given filters
    pub async fn get_stats(&self, filter: &DashboardFilter) -> AppResult<DashboardStats> {
        // Warehouse filter expands to its locations; an explicit location
        // narrows further
        let location_ids: Option<Vec<Uuid>> = match (filter.location_id, filter.warehouse_id) {
            (Some(location_id), _) => Some(vec![location_id]),
            (None, Some(warehouse_id)) => Some(
                sqlx::query_scalar::<_, Uuid>(
                    "SELECT id FROM locations WHERE warehouse_id = $1",
                )
                .bind(warehouse_id)
                .fetch_all(&self.db)
                .await?,
            ),
            (None, None) => None,
        };

        let rows = sqlx::query_as::<_, GroupCountRow>(
            r#"
            SELECT o.op_type, o.status, COUNT(*) AS count
            FROM operations o
            WHERE ($1::text IS NULL OR o.op_type = $1)
              AND ($2::text IS NULL OR o.status = $2)
              AND ($3::uuid[] IS NULL
                   OR o.source_location_id = ANY($3)
                   OR o.dest_location_id = ANY($3))
              AND ($4::text IS NULL OR EXISTS (
                    SELECT 1
                    FROM operation_lines ol
                    JOIN products p ON p.id = ol.product_id
                    WHERE ol.operation_id = o.id AND p.category = $4))
            GROUP BY o.op_type, o.status
            "#,
        )
        .bind(filter.op_type.map(|t| t.as_str()))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(&location_ids)
        .bind(&filter.category)
        .fetch_all(&self.db)
        .await?;

        let mut by_status: Vec<StatusCount> = Vec::new();
        let mut by_type: Vec<TypeCount> = Vec::new();
        let mut total_operations = 0;
        let mut pending_receipts = 0;
        let mut pending_deliveries = 0;
        let mut pending_internal = 0;

        for row in rows {
            let op_type = OperationType::from_str(&row.op_type).ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!(
                    "unknown operation type: {}",
                    row.op_type
                ))
            })?;
            let status = OperationStatus::from_str(&row.status).ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!(
                    "unknown operation status: {}",
                    row.status
                ))
            })?;

            total_operations += row.count;

            if status == OperationStatus::Draft {
                match op_type {
                    OperationType::Receipt => pending_receipts += row.count,
                    OperationType::Delivery => pending_deliveries += row.count,
                    OperationType::Internal => pending_internal += row.count,
                    OperationType::Adjustment => {}
                }
            }

            match by_status.iter_mut().find(|c| c.status == status) {
                Some(entry) => entry.count += row.count,
                None => by_status.push(StatusCount {
                    status,
                    count: row.count,
                }),
            }
            match by_type.iter_mut().find(|c| c.op_type == op_type) {
                Some(entry) => entry.count += row.count,
                None => by_type.push(TypeCount {
                    op_type,
                    count: row.count,
                }),
            }
        }

        // Product-side KPIs classify active products only
        let (low_stock_items, out_of_stock_items, total_units_on_hand) =
            sqlx::query_as::<_, (i64, i64, i64)>(
                r#"
                SELECT
                    COUNT(*) FILTER (WHERE total_stock > 0 AND total_stock < min_stock_rule),
                    COUNT(*) FILTER (WHERE total_stock = 0),
                    COALESCE(SUM(total_stock), 0)::bigint
                FROM products
                WHERE status = 'active'
                  AND ($1::text IS NULL OR category = $1)
                "#,
            )
            .bind(&filter.category)
            .fetch_one(&self.db)
            .await?;

        Ok(DashboardStats {
            kpis: DashboardKpis {
                pending_receipts,
                pending_deliveries,
                pending_internal,
                low_stock_items,
                out_of_stock_items,
                total_units_on_hand,
            },
            by_status,
            by_type,
            total_operations,
        })
    }
}
