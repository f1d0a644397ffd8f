//! Operation document service
//!
//! Owns the movement-document lifecycle: creation with generated
//! references, draft edits, availability checks, cancellation, and the
//! validation engine that commits a document into the stock ledger.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    LocationKind, Operation, OperationLine, OperationStatus, OperationType,
};
use shared::ledger::{self, MovementSide, PlanError};
use shared::types::{PaginatedResponse, Pagination, PaginationMeta};
use shared::validation;

/// Service managing operation documents and their commits
#[derive(Clone)]
pub struct OperationService {
    db: PgPool,
}

/// A line item on an operation create/update request
#[derive(Debug, Deserialize)]
pub struct OperationLineInput {
    pub product_id: Uuid,
    pub quantity: i64,
}

/// Input for creating an operation
#[derive(Debug, Deserialize)]
pub struct CreateOperationInput {
    pub op_type: OperationType,
    pub source_location_id: Option<Uuid>,
    pub dest_location_id: Option<Uuid>,
    pub partner: Option<String>,
    pub responsible: Option<String>,
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub lines: Vec<OperationLineInput>,
}

/// Input for updating a not-yet-terminal operation
#[derive(Debug, Deserialize)]
pub struct UpdateOperationInput {
    pub partner: Option<String>,
    pub responsible: Option<String>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub lines: Option<Vec<OperationLineInput>>,
}

/// Filter for listing operations
#[derive(Debug, Default, Deserialize)]
pub struct OperationFilter {
    pub op_type: Option<OperationType>,
    pub status: Option<OperationStatus>,
}

/// Row for operation header queries
#[derive(Debug, sqlx::FromRow)]
struct OperationRow {
    id: Uuid,
    reference: String,
    op_type: String,
    status: String,
    partner: Option<String>,
    responsible: Option<String>,
    source_location_id: Option<Uuid>,
    dest_location_id: Option<Uuid>,
    scheduled_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const OPERATION_COLUMNS: &str = "id, reference, op_type, status, partner, responsible, \
                                 source_location_id, dest_location_id, scheduled_date, \
                                 created_at, updated_at";

impl OperationRow {
    fn into_operation(self, lines: Vec<OperationLine>) -> AppResult<Operation> {
        Ok(Operation {
            id: self.id,
            reference: self.reference,
            op_type: parse_op_type(&self.op_type)?,
            status: parse_status(&self.status)?,
            partner: self.partner,
            responsible: self.responsible,
            source_location_id: self.source_location_id,
            dest_location_id: self.dest_location_id,
            lines,
            scheduled_date: self.scheduled_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn parse_op_type(s: &str) -> AppResult<OperationType> {
    OperationType::from_str(s)
        .ok_or_else(|| AppError::InternalError(anyhow::anyhow!("unknown operation type: {}", s)))
}

fn parse_status(s: &str) -> AppResult<OperationStatus> {
    OperationStatus::from_str(s)
        .ok_or_else(|| AppError::InternalError(anyhow::anyhow!("unknown operation status: {}", s)))
}

/// Draw the next reference for an operation type from its atomic
/// per-type sequence (e.g., "WH/IN/0001")
pub(crate) async fn next_reference(
    tx: &mut Transaction<'_, Postgres>,
    op_type: OperationType,
) -> Result<String, sqlx::Error> {
    let sequence: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO operation_sequences (op_type, next_value)
        VALUES ($1, 1)
        ON CONFLICT (op_type)
        DO UPDATE SET next_value = operation_sequences.next_value + 1
        RETURNING next_value
        "#,
    )
    .bind(op_type.as_str())
    .fetch_one(&mut **tx)
    .await?;

    Ok(validation::format_reference(
        op_type.reference_prefix(),
        sequence,
    ))
}

/// Resolve an optional location reference to a movement side
async fn resolve_side(
    tx: &mut Transaction<'_, Postgres>,
    location_id: Option<Uuid>,
) -> AppResult<Option<MovementSide>> {
    let Some(location_id) = location_id else {
        return Ok(None);
    };

    let kind: String = sqlx::query_scalar("SELECT kind FROM locations WHERE id = $1")
        .bind(location_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Location".to_string()))?;

    let kind = LocationKind::from_str(&kind)
        .ok_or_else(|| AppError::InternalError(anyhow::anyhow!("unknown location kind: {}", kind)))?;

    Ok(Some(MovementSide { location_id, kind }))
}

impl OperationService {
    /// Create a new OperationService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a draft operation with a generated reference
    ///
    /// Lines with non-positive quantities or unknown products are dropped,
    /// not rejected. Adjustment documents are not created here: the
    /// adjustment engine writes them directly in `done`.
    pub async fn create_operation(&self, input: CreateOperationInput) -> AppResult<Operation> {
        if input.op_type == OperationType::Adjustment {
            return Err(AppError::Validation {
                field: "op_type".to_string(),
                message: "Adjustments are created through the stock adjustment endpoint"
                    .to_string(),
            });
        }

        for location_id in [input.source_location_id, input.dest_location_id]
            .into_iter()
            .flatten()
        {
            let exists =
                sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM locations WHERE id = $1)")
                    .bind(location_id)
                    .fetch_one(&self.db)
                    .await?;
            if !exists {
                return Err(AppError::NotFound("Location".to_string()));
            }
        }

        let lines = self.resolve_lines(&input.lines).await?;

        let mut tx = self.db.begin().await?;

        let reference = next_reference(&mut tx, input.op_type).await?;

        let operation_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO operations
                (reference, op_type, partner, responsible, source_location_id,
                 dest_location_id, scheduled_date)
            VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, now()))
            RETURNING id
            "#,
        )
        .bind(&reference)
        .bind(input.op_type.as_str())
        .bind(&input.partner)
        .bind(&input.responsible)
        .bind(input.source_location_id)
        .bind(input.dest_location_id)
        .bind(input.scheduled_date)
        .fetch_one(&mut *tx)
        .await?;

        insert_lines(&mut tx, operation_id, &lines).await?;

        tx.commit().await?;

        tracing::info!("Created {} operation {}", input.op_type, reference);
        self.get_operation(operation_id).await
    }

    /// Get an operation with its lines
    pub async fn get_operation(&self, operation_id: Uuid) -> AppResult<Operation> {
        let row = sqlx::query_as::<_, OperationRow>(&format!(
            "SELECT {OPERATION_COLUMNS} FROM operations WHERE id = $1",
        ))
        .bind(operation_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Operation".to_string()))?;

        let lines = sqlx::query_as::<_, (Uuid, i64, Option<i64>, Option<i64>)>(
            r#"
            SELECT product_id, quantity, previous_quantity, counted_quantity
            FROM operation_lines
            WHERE operation_id = $1
            ORDER BY position
            "#,
        )
        .bind(operation_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(
            |(product_id, quantity, previous_quantity, counted_quantity)| OperationLine {
                product_id,
                quantity,
                previous_quantity,
                counted_quantity,
            },
        )
        .collect();

        row.into_operation(lines)
    }

    /// List operations matching the filter, newest first
    pub async fn list_operations(
        &self,
        filter: &OperationFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<Operation>> {
        let op_type = filter.op_type.map(|t| t.as_str());
        let status = filter.status.map(|s| s.as_str());

        let total_items: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM operations
            WHERE ($1::text IS NULL OR op_type = $1)
              AND ($2::text IS NULL OR status = $2)
            "#,
        )
        .bind(op_type)
        .bind(status)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, OperationRow>(&format!(
            r#"
            SELECT {OPERATION_COLUMNS}
            FROM operations
            WHERE ($1::text IS NULL OR op_type = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        ))
        .bind(op_type)
        .bind(status)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let operations = self.attach_lines(rows).await?;

        Ok(PaginatedResponse {
            data: operations,
            pagination: PaginationMeta::new(pagination, total_items as u64),
        })
    }

    /// Completed movements, newest first
    pub async fn move_history(&self) -> AppResult<Vec<Operation>> {
        let rows = sqlx::query_as::<_, OperationRow>(&format!(
            r#"
            SELECT {OPERATION_COLUMNS}
            FROM operations
            WHERE status = 'done'
            ORDER BY created_at DESC
            "#,
        ))
        .fetch_all(&self.db)
        .await?;

        self.attach_lines(rows).await
    }

    /// Update a not-yet-terminal operation
    pub async fn update_operation(
        &self,
        operation_id: Uuid,
        input: UpdateOperationInput,
    ) -> AppResult<Operation> {
        let existing = self.get_operation(operation_id).await?;
        if existing.status.is_terminal() {
            return Err(AppError::InvalidStateTransition(format!(
                "operation {} is {} and can no longer be modified",
                existing.reference, existing.status
            )));
        }

        let new_lines = match &input.lines {
            Some(lines) => Some(self.resolve_lines(lines).await?),
            None => None,
        };

        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            UPDATE operations
            SET partner = COALESCE($1, partner),
                responsible = COALESCE($2, responsible),
                scheduled_date = COALESCE($3, scheduled_date)
            WHERE id = $4
            "#,
        )
        .bind(&input.partner)
        .bind(&input.responsible)
        .bind(input.scheduled_date)
        .bind(operation_id)
        .execute(&mut *tx)
        .await?;

        if let Some(lines) = new_lines {
            sqlx::query("DELETE FROM operation_lines WHERE operation_id = $1")
                .bind(operation_id)
                .execute(&mut *tx)
                .await?;
            insert_lines(&mut tx, operation_id, &lines).await?;
        }

        tx.commit().await?;

        self.get_operation(operation_id).await
    }

    /// Re-classify a pending operation as ready or waiting based on
    /// source-side availability
    ///
    /// An operation with no internal source has nothing to wait for and
    /// always comes out ready.
    pub async fn check_availability(&self, operation_id: Uuid) -> AppResult<OperationStatus> {
        let mut tx = self.db.begin().await?;

        let (reference, status, source_location_id, dest_location_id) = lock_operation(
            &mut tx,
            operation_id,
        )
        .await?;

        if status.is_terminal() {
            return Err(AppError::InvalidStateTransition(format!(
                "operation {} is {} and can no longer be checked",
                reference, status
            )));
        }

        let source = resolve_side(&mut tx, source_location_id).await?;
        let dest = resolve_side(&mut tx, dest_location_id).await?;
        let lines = load_resolved_lines(&mut tx, operation_id).await?;
        let source_quants = read_source_quants(&mut tx, &lines, source, false).await?;

        let new_status = match ledger::plan_commit(&lines, source, dest, &source_quants) {
            Ok(_) => OperationStatus::Ready,
            Err(PlanError::InsufficientStock { .. }) => OperationStatus::Waiting,
        };

        sqlx::query("UPDATE operations SET status = $1 WHERE id = $2")
            .bind(new_status.as_str())
            .bind(operation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(new_status)
    }

    /// Cancel a pending operation
    pub async fn cancel_operation(&self, operation_id: Uuid) -> AppResult<Operation> {
        let existing = self.get_operation(operation_id).await?;
        if existing.status.is_terminal() {
            return Err(AppError::InvalidStateTransition(format!(
                "operation {} is {} and cannot be cancelled",
                existing.reference, existing.status
            )));
        }

        sqlx::query("UPDATE operations SET status = 'cancelled' WHERE id = $1")
            .bind(operation_id)
            .execute(&self.db)
            .await?;

        tracing::info!("Cancelled operation {}", existing.reference);
        self.get_operation(operation_id).await
    }

    /// Commit an operation into the stock ledger and mark it done
    ///
    /// The whole commit runs in one transaction: the operation row and the
    /// source-side quant rows are locked, every line is planned against the
    /// locked balances, and only a complete plan is applied. A shortfall on
    /// any line rolls the entire attempt back.
    pub async fn validate_operation(&self, operation_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let (reference, status, source_location_id, dest_location_id) = lock_operation(
            &mut tx,
            operation_id,
        )
        .await?;

        match status {
            OperationStatus::Done => {
                return Err(AppError::AlreadyValidated(reference));
            }
            OperationStatus::Cancelled => {
                return Err(AppError::InvalidStateTransition(format!(
                    "operation {} is cancelled and cannot be validated",
                    reference
                )));
            }
            _ => {}
        }

        // Internal-ness is resolved once for the whole operation
        let source = resolve_side(&mut tx, source_location_id).await?;
        let dest = resolve_side(&mut tx, dest_location_id).await?;

        let lines = load_resolved_lines(&mut tx, operation_id).await?;

        // Lock order across engines: product rows before quant rows
        lock_products(&mut tx, &lines).await?;
        let source_quants = read_source_quants(&mut tx, &lines, source, true).await?;

        let plan = match ledger::plan_commit(&lines, source, dest, &source_quants) {
            Ok(plan) => plan,
            Err(PlanError::InsufficientStock {
                product_id,
                requested,
                available,
            }) => {
                let product: Option<String> =
                    sqlx::query_scalar("SELECT sku FROM products WHERE id = $1")
                        .bind(product_id)
                        .fetch_optional(&mut *tx)
                        .await?;
                return Err(AppError::InsufficientStock {
                    product: product.unwrap_or_else(|| product_id.to_string()),
                    requested,
                    available,
                });
            }
        };

        apply_plan(&mut tx, &plan).await?;

        sqlx::query("UPDATE operations SET status = 'done' WHERE id = $1")
            .bind(operation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!("Validated operation {}", reference);
        Ok(())
    }

    /// Drop lines with non-positive quantities or unknown products
    async fn resolve_lines(
        &self,
        lines: &[OperationLineInput],
    ) -> AppResult<Vec<(Uuid, i64)>> {
        let candidate_ids: Vec<Uuid> = lines
            .iter()
            .filter(|l| l.quantity > 0)
            .map(|l| l.product_id)
            .collect();
        if candidate_ids.is_empty() {
            return Ok(Vec::new());
        }

        let known: HashSet<Uuid> =
            sqlx::query_scalar::<_, Uuid>("SELECT id FROM products WHERE id = ANY($1)")
                .bind(&candidate_ids)
                .fetch_all(&self.db)
                .await?
                .into_iter()
                .collect();

        Ok(lines
            .iter()
            .filter(|l| l.quantity > 0 && known.contains(&l.product_id))
            .map(|l| (l.product_id, l.quantity))
            .collect())
    }

    /// Fetch lines for a page of operations and zip them back together
    async fn attach_lines(&self, rows: Vec<OperationRow>) -> AppResult<Vec<Operation>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut lines_by_operation: HashMap<Uuid, Vec<OperationLine>> = HashMap::new();

        if !ids.is_empty() {
            let line_rows = sqlx::query_as::<_, (Uuid, Uuid, i64, Option<i64>, Option<i64>)>(
                r#"
                SELECT operation_id, product_id, quantity, previous_quantity, counted_quantity
                FROM operation_lines
                WHERE operation_id = ANY($1)
                ORDER BY operation_id, position
                "#,
            )
            .bind(&ids)
            .fetch_all(&self.db)
            .await?;

            for (operation_id, product_id, quantity, previous_quantity, counted_quantity) in
                line_rows
            {
                lines_by_operation
                    .entry(operation_id)
                    .or_default()
                    .push(OperationLine {
                        product_id,
                        quantity,
                        previous_quantity,
                        counted_quantity,
                    });
            }
        }

        rows.into_iter()
            .map(|row| {
                let lines = lines_by_operation.remove(&row.id).unwrap_or_default();
                row.into_operation(lines)
            })
            .collect()
    }
}

/// Lock an operation row for the duration of a status transition
async fn lock_operation(
    tx: &mut Transaction<'_, Postgres>,
    operation_id: Uuid,
) -> AppResult<(String, OperationStatus, Option<Uuid>, Option<Uuid>)> {
    let row = sqlx::query_as::<_, (String, String, Option<Uuid>, Option<Uuid>)>(
        r#"
        SELECT reference, status, source_location_id, dest_location_id
        FROM operations
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(operation_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Operation".to_string()))?;

    let (reference, status, source_location_id, dest_location_id) = row;
    let status = parse_status(&status)?;
    Ok((reference, status, source_location_id, dest_location_id))
}

/// Lock the product rows behind the given lines in sorted id order, so
/// concurrent commits and adjustments serialize on the products they share
async fn lock_products(
    tx: &mut Transaction<'_, Postgres>,
    lines: &[(Uuid, i64)],
) -> Result<(), sqlx::Error> {
    let mut product_ids: Vec<Uuid> = lines.iter().map(|&(product_id, _)| product_id).collect();
    product_ids.sort();
    product_ids.dedup();
    if product_ids.is_empty() {
        return Ok(());
    }

    sqlx::query("SELECT id FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE")
        .bind(&product_ids)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

/// Load an operation's lines in document order, dropping any whose
/// product no longer resolves
async fn load_resolved_lines(
    tx: &mut Transaction<'_, Postgres>,
    operation_id: Uuid,
) -> AppResult<Vec<(Uuid, i64)>> {
    let lines = sqlx::query_as::<_, (Uuid, i64)>(
        r#"
        SELECT ol.product_id, ol.quantity
        FROM operation_lines ol
        JOIN products p ON p.id = ol.product_id
        WHERE ol.operation_id = $1
        ORDER BY ol.position
        "#,
    )
    .bind(operation_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(lines)
}

/// Read the source-side balances for the products on the given lines,
/// optionally locking the quant rows for the rest of the transaction.
/// Rows are visited in sorted product order so concurrent commits take
/// locks in the same order.
async fn read_source_quants(
    tx: &mut Transaction<'_, Postgres>,
    lines: &[(Uuid, i64)],
    source: Option<MovementSide>,
    lock: bool,
) -> AppResult<BTreeMap<Uuid, i64>> {
    let mut quants = BTreeMap::new();

    let Some(source) = source.filter(|s| s.kind == LocationKind::Internal) else {
        return Ok(quants);
    };

    let mut product_ids: Vec<Uuid> = lines.iter().map(|&(product_id, _)| product_id).collect();
    product_ids.sort();
    product_ids.dedup();

    let query = if lock {
        "SELECT quantity FROM stock_quants WHERE product_id = $1 AND location_id = $2 FOR UPDATE"
    } else {
        "SELECT quantity FROM stock_quants WHERE product_id = $1 AND location_id = $2"
    };

    for product_id in product_ids {
        let quantity: Option<i64> = sqlx::query_scalar(query)
            .bind(product_id)
            .bind(source.location_id)
            .fetch_optional(&mut **tx)
            .await?;
        quants.insert(product_id, quantity.unwrap_or(0));
    }

    Ok(quants)
}

/// Apply a validated commit plan: upsert quant deltas and adjust the
/// aggregate counters
async fn apply_plan(
    tx: &mut Transaction<'_, Postgres>,
    plan: &ledger::CommitPlan,
) -> AppResult<()> {
    for delta in &plan.quant_deltas {
        sqlx::query(
            r#"
            INSERT INTO stock_quants (product_id, location_id, quantity)
            VALUES ($1, $2, GREATEST($3, 0))
            ON CONFLICT (product_id, location_id)
            DO UPDATE SET quantity = stock_quants.quantity + $3
            "#,
        )
        .bind(delta.product_id)
        .bind(delta.location_id)
        .bind(delta.delta)
        .execute(&mut **tx)
        .await?;
    }

    for delta in &plan.total_stock_deltas {
        sqlx::query("UPDATE products SET total_stock = total_stock + $2 WHERE id = $1")
            .bind(delta.product_id)
            .bind(delta.delta)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

/// Insert resolved lines preserving document order
async fn insert_lines(
    tx: &mut Transaction<'_, Postgres>,
    operation_id: Uuid,
    lines: &[(Uuid, i64)],
) -> Result<(), sqlx::Error> {
    for (position, &(product_id, quantity)) in lines.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO operation_lines (operation_id, product_id, quantity, position)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(operation_id)
        .bind(product_id)
        .bind(quantity)
        .bind(position as i32)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}
