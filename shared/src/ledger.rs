//! Pure stock-ledger logic
//!
//! The commit planner walks an operation's lines against a snapshot of the
//! source-side balances and produces either a complete set of ledger deltas
//! or an error. No mutation happens here; the backend applies a returned
//! plan inside a single database transaction, so a commit is all-or-nothing
//! by construction.

use std::collections::BTreeMap;

use thiserror::Error;
use uuid::Uuid;

use crate::models::{LocationKind, OperationType};

/// One side of a movement: a location and its classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementSide {
    pub location_id: Uuid,
    pub kind: LocationKind,
}

impl MovementSide {
    pub fn internal(location_id: Uuid) -> Self {
        Self {
            location_id,
            kind: LocationKind::Internal,
        }
    }

    pub fn external(location_id: Uuid) -> Self {
        Self {
            location_id,
            kind: LocationKind::External,
        }
    }

    fn is_internal(&self) -> bool {
        self.kind == LocationKind::Internal
    }
}

/// A pending change to one quant row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantDelta {
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub delta: i64,
}

/// A pending change to one product's aggregate counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotalStockDelta {
    pub product_id: Uuid,
    pub delta: i64,
}

/// Complete, validated set of ledger mutations for one commit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitPlan {
    pub quant_deltas: Vec<QuantDelta>,
    pub total_stock_deltas: Vec<TotalStockDelta>,
}

impl CommitPlan {
    pub fn is_empty(&self) -> bool {
        self.quant_deltas.is_empty() && self.total_stock_deltas.is_empty()
    }
}

/// Planner failure: a line asked for more than the source holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        requested: i64,
        available: i64,
    },
}

/// Plan the ledger mutations for committing an operation's lines.
///
/// `lines` are already-resolved `(product_id, quantity)` pairs in document
/// order; lines with `quantity <= 0` are skipped. `source_quants` holds the
/// current balance per product at the source location (missing entry means
/// zero) and is only consulted when the source is internal.
///
/// Boundary-crossing rules:
/// - internal source: quant decremented; if the destination is external the
///   product's aggregate counter drops too (true depletion)
/// - internal destination: quant incremented; if the source is external the
///   aggregate counter rises too (true receipt)
/// - both internal: lateral transfer, aggregate untouched
/// - neither internal: no ledger mutation
///
/// Availability is checked cumulatively: two lines drawing on the same
/// product share the same source balance. The first shortfall aborts the
/// whole plan.
pub fn plan_commit(
    lines: &[(Uuid, i64)],
    source: Option<MovementSide>,
    dest: Option<MovementSide>,
    source_quants: &BTreeMap<Uuid, i64>,
) -> Result<CommitPlan, PlanError> {
    // Classified once for the whole operation, not per line
    let internal_source = source.filter(MovementSide::is_internal);
    let internal_dest = dest.filter(MovementSide::is_internal);

    let mut remaining = source_quants.clone();
    let mut quant_deltas: BTreeMap<(Uuid, Uuid), i64> = BTreeMap::new();
    let mut total_deltas: BTreeMap<Uuid, i64> = BTreeMap::new();

    for &(product_id, quantity) in lines {
        if quantity <= 0 {
            continue;
        }

        if let Some(src) = internal_source {
            let available = remaining.entry(product_id).or_insert(0);
            if *available < quantity {
                return Err(PlanError::InsufficientStock {
                    product_id,
                    requested: quantity,
                    available: *available,
                });
            }
            *available -= quantity;
            *quant_deltas
                .entry((product_id, src.location_id))
                .or_insert(0) -= quantity;
            if internal_dest.is_none() {
                *total_deltas.entry(product_id).or_insert(0) -= quantity;
            }
        }

        if let Some(dst) = internal_dest {
            *quant_deltas
                .entry((product_id, dst.location_id))
                .or_insert(0) += quantity;
            if internal_source.is_none() {
                *total_deltas.entry(product_id).or_insert(0) += quantity;
            }
        }
    }

    Ok(CommitPlan {
        quant_deltas: quant_deltas
            .into_iter()
            .filter(|&(_, delta)| delta != 0)
            .map(|((product_id, location_id), delta)| QuantDelta {
                product_id,
                location_id,
                delta,
            })
            .collect(),
        total_stock_deltas: total_deltas
            .into_iter()
            .filter(|&(_, delta)| delta != 0)
            .map(|(product_id, delta)| TotalStockDelta { product_id, delta })
            .collect(),
    })
}

// ============================================================================
// Adjustments
// ============================================================================

/// Outcome of reconciling a counted quantity against the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjustmentPlan {
    /// Signed correction: counted minus ledgered
    pub diff: i64,
    pub previous_quantity: i64,
    pub counted_quantity: i64,
}

impl AdjustmentPlan {
    pub fn is_noop(&self) -> bool {
        self.diff == 0
    }

    /// Magnitude recorded on the audit operation line
    pub fn audit_quantity(&self) -> i64 {
        self.diff.abs()
    }
}

/// Compute the correction needed to bring a ledgered balance to the
/// counted quantity. The caller must have rejected negative counts.
pub fn plan_adjustment(current_quantity: i64, counted_quantity: i64) -> AdjustmentPlan {
    AdjustmentPlan {
        diff: counted_quantity - current_quantity,
        previous_quantity: current_quantity,
        counted_quantity,
    }
}

// ============================================================================
// Forecast & stock classification
// ============================================================================

/// Project future stock from the current aggregate and the lines of draft
/// operations: receipts add, deliveries subtract, everything else is
/// neutral.
pub fn forecast_total<I>(total_stock: i64, draft_lines: I) -> i64
where
    I: IntoIterator<Item = (OperationType, i64)>,
{
    draft_lines
        .into_iter()
        .fold(total_stock, |acc, (op_type, quantity)| {
            acc + op_type.forecast_direction() * quantity
        })
}

/// Stock sits below the reorder threshold but is not exhausted
pub fn is_low_stock(total_stock: i64, min_stock_rule: i64) -> bool {
    total_stock > 0 && total_stock < min_stock_rule
}

pub fn is_out_of_stock(total_stock: i64) -> bool {
    total_stock == 0
}
