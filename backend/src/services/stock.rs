//! Stock quant ledger service
//!
//! Read access to the per-(product, location) balances plus the adjustment
//! engine, which reconciles counted quantities against the ledger without
//! going through the draft/commit flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{LocationKind, OperationType, StockQuant};
use crate::services::operation::next_reference;
use shared::{ledger, validation};

/// Service over the stock quant ledger
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

/// Input for an inventory adjustment
#[derive(Debug, Deserialize)]
pub struct CreateAdjustmentInput {
    pub product_id: Uuid,
    pub location_id: Uuid,
    /// Counted quantity the ledger is reconciled to
    pub real_quantity: i64,
    pub reason: Option<String>,
}

/// Outcome of an adjustment
#[derive(Debug, Serialize)]
pub struct AdjustmentOutcome {
    /// Signed correction applied to the ledger (counted minus previous)
    pub diff: i64,
    /// Audit operation recording the correction; None when the count
    /// matched the ledger
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// A quant joined with its product and location labels
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct QuantView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub sku: String,
    pub product_name: String,
    pub location_id: Uuid,
    pub location_name: String,
    pub quantity: i64,
    pub updated_at: DateTime<Utc>,
}

/// Filter for listing quants
#[derive(Debug, Default, Deserialize)]
pub struct QuantFilter {
    pub product_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
}

/// Drift of a product's aggregate counter against its summed quants
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TotalStockDrift {
    pub product_id: Uuid,
    pub sku: String,
    pub total_stock: i64,
    pub ledger_sum: i64,
    pub drift: i64,
}

/// Report of a reconciliation run
#[derive(Debug, Serialize)]
pub struct ReconcileReport {
    pub drifted: Vec<TotalStockDrift>,
    pub repaired: bool,
}

impl StockService {
    /// Create a new StockService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// The quant row for a product at a location, if one has ever been
    /// created
    pub async fn get_quant(
        &self,
        product_id: Uuid,
        location_id: Uuid,
    ) -> AppResult<Option<StockQuant>> {
        let row = sqlx::query_as::<_, (Uuid, Uuid, Uuid, i64, DateTime<Utc>, DateTime<Utc>)>(
            r#"
            SELECT id, product_id, location_id, quantity, created_at, updated_at
            FROM stock_quants
            WHERE product_id = $1 AND location_id = $2
            "#,
        )
        .bind(product_id)
        .bind(location_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(
            |(id, product_id, location_id, quantity, created_at, updated_at)| StockQuant {
                id,
                product_id,
                location_id,
                quantity,
                created_at,
                updated_at,
            },
        ))
    }

    /// Ledgered quantity of a product at a location (0 if no quant exists)
    pub async fn get_quantity(&self, product_id: Uuid, location_id: Uuid) -> AppResult<i64> {
        let quant = self.get_quant(product_id, location_id).await?;
        Ok(quant.map(|q| q.quantity).unwrap_or(0))
    }

    /// List quants with product and location labels
    pub async fn list_quants(&self, filter: QuantFilter) -> AppResult<Vec<QuantView>> {
        let quants = sqlx::query_as::<_, QuantView>(
            r#"
            SELECT q.id, q.product_id, p.sku, p.name AS product_name,
                   q.location_id, l.name AS location_name, q.quantity, q.updated_at
            FROM stock_quants q
            JOIN products p ON p.id = q.product_id
            JOIN locations l ON l.id = q.location_id
            WHERE ($1::uuid IS NULL OR q.product_id = $1)
              AND ($2::uuid IS NULL OR q.location_id = $2)
            ORDER BY p.name, l.name
            "#,
        )
        .bind(filter.product_id)
        .bind(filter.location_id)
        .fetch_all(&self.db)
        .await?;

        Ok(quants)
    }

    /// Reconcile a counted quantity against the ledger
    ///
    /// Sets the quant to exactly the counted value, applies the signed
    /// difference to the product's aggregate counter, and records a `done`
    /// adjustment operation as the audit trail. A count matching the
    /// ledger is a no-op.
    pub async fn create_adjustment(
        &self,
        input: CreateAdjustmentInput,
    ) -> AppResult<AdjustmentOutcome> {
        if let Err(message) = validation::validate_counted_quantity(input.real_quantity) {
            return Err(AppError::Validation {
                field: "real_quantity".to_string(),
                message: message.to_string(),
            });
        }

        let mut tx = self.db.begin().await?;

        // Lock the product row so the counter update below cannot race a
        // concurrent validation
        let product_exists: Option<i64> =
            sqlx::query_scalar("SELECT total_stock FROM products WHERE id = $1 FOR UPDATE")
                .bind(input.product_id)
                .fetch_optional(&mut *tx)
                .await?;
        if product_exists.is_none() {
            return Err(AppError::NotFound("Product".to_string()));
        }

        let kind: String = sqlx::query_scalar("SELECT kind FROM locations WHERE id = $1")
            .bind(input.location_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Location".to_string()))?;
        let kind = LocationKind::from_str(&kind).ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!("unknown location kind: {}", kind))
        })?;
        if kind != LocationKind::Internal {
            return Err(AppError::Validation {
                field: "location_id".to_string(),
                message: "Adjustments require an internal location".to_string(),
            });
        }

        let current: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT quantity FROM stock_quants
            WHERE product_id = $1 AND location_id = $2
            FOR UPDATE
            "#,
        )
        .bind(input.product_id)
        .bind(input.location_id)
        .fetch_optional(&mut *tx)
        .await?;

        let plan = ledger::plan_adjustment(current.unwrap_or(0), input.real_quantity);
        if plan.is_noop() {
            return Ok(AdjustmentOutcome {
                diff: 0,
                operation_id: None,
                reference: None,
            });
        }

        // Absolute set, not an increment
        sqlx::query(
            r#"
            INSERT INTO stock_quants (product_id, location_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (product_id, location_id)
            DO UPDATE SET quantity = EXCLUDED.quantity
            "#,
        )
        .bind(input.product_id)
        .bind(input.location_id)
        .bind(plan.counted_quantity)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE products SET total_stock = total_stock + $2 WHERE id = $1")
            .bind(input.product_id)
            .bind(plan.diff)
            .execute(&mut *tx)
            .await?;

        let reference = next_reference(&mut tx, OperationType::Adjustment).await?;

        let operation_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO operations
                (reference, op_type, status, partner, source_location_id, dest_location_id)
            VALUES ($1, 'adjustment', 'done', $2, $3, $3)
            RETURNING id
            "#,
        )
        .bind(&reference)
        .bind(input.reason.as_deref().unwrap_or("Inventory Adjustment"))
        .bind(input.location_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO operation_lines
                (operation_id, product_id, quantity, previous_quantity, counted_quantity)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(operation_id)
        .bind(input.product_id)
        .bind(plan.audit_quantity())
        .bind(plan.previous_quantity)
        .bind(plan.counted_quantity)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "Adjustment {} reconciled product {} at {} by {}",
            reference,
            input.product_id,
            input.location_id,
            plan.diff
        );

        Ok(AdjustmentOutcome {
            diff: plan.diff,
            operation_id: Some(operation_id),
            reference: Some(reference),
        })
    }

    /// Compare each product's aggregate counter against its summed quants
    /// and optionally repair drifted counters
    pub async fn reconcile_totals(&self, repair: bool) -> AppResult<ReconcileReport> {
        let mut tx = self.db.begin().await?;

        let drifted = sqlx::query_as::<_, TotalStockDrift>(
            r#"
            SELECT p.id AS product_id, p.sku, p.total_stock,
                   COALESCE(SUM(q.quantity), 0)::bigint AS ledger_sum,
                   (p.total_stock - COALESCE(SUM(q.quantity), 0))::bigint AS drift
            FROM products p
            LEFT JOIN stock_quants q ON q.product_id = p.id
            GROUP BY p.id, p.sku, p.total_stock
            HAVING p.total_stock <> COALESCE(SUM(q.quantity), 0)
            ORDER BY p.sku
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        if repair {
            for drift in &drifted {
                sqlx::query("UPDATE products SET total_stock = $2 WHERE id = $1")
                    .bind(drift.product_id)
                    .bind(drift.ledger_sum)
                    .execute(&mut *tx)
                    .await?;
            }
            tx.commit().await?;
        }

        if !drifted.is_empty() {
            tracing::warn!(
                "Found {} product(s) with drifted stock counters (repair = {})",
                drifted.len(),
                repair
            );
        }

        Ok(ReconcileReport { drifted, repaired: repair })
    }
}
