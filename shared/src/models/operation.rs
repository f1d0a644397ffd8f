//! Operation (movement document) models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Types of stock operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    /// Goods arriving from an external party
    Receipt,
    /// Goods leaving to an external party
    Delivery,
    /// Transfer between two internal locations
    Internal,
    /// Inventory count reconciliation, created directly in `done`
    Adjustment,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Receipt => "receipt",
            OperationType::Delivery => "delivery",
            OperationType::Internal => "internal",
            OperationType::Adjustment => "adjustment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "receipt" => Some(OperationType::Receipt),
            "delivery" => Some(OperationType::Delivery),
            "internal" => Some(OperationType::Internal),
            "adjustment" => Some(OperationType::Adjustment),
            _ => None,
        }
    }

    /// Reference prefix for this operation type (e.g., "WH/IN")
    pub fn reference_prefix(&self) -> &'static str {
        match self {
            OperationType::Receipt => "WH/IN",
            OperationType::Delivery => "WH/OUT",
            OperationType::Internal => "WH/INT",
            OperationType::Adjustment => "WH/ADJ",
        }
    }

    /// Contribution sign of a draft operation of this type to forecasted
    /// stock: receipts add, deliveries subtract, the rest are neutral
    pub fn forecast_direction(&self) -> i64 {
        match self {
            OperationType::Receipt => 1,
            OperationType::Delivery => -1,
            OperationType::Internal | OperationType::Adjustment => 0,
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an operation
///
/// ```text
/// draft ----> ready | waiting ----> done      (terminal)
/// draft | waiting | ready ----> cancelled     (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Draft,
    Waiting,
    Ready,
    Done,
    Cancelled,
}

impl OperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Draft => "draft",
            OperationStatus::Waiting => "waiting",
            OperationStatus::Ready => "ready",
            OperationStatus::Done => "done",
            OperationStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(OperationStatus::Draft),
            "waiting" => Some(OperationStatus::Waiting),
            "ready" => Some(OperationStatus::Ready),
            "done" => Some(OperationStatus::Done),
            "cancelled" => Some(OperationStatus::Cancelled),
            _ => None,
        }
    }

    /// Terminal statuses admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationStatus::Done | OperationStatus::Cancelled)
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line item on an operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationLine {
    pub product_id: Uuid,
    pub quantity: i64,
    /// Ledger quantity before an adjustment; None for movement lines
    pub previous_quantity: Option<i64>,
    /// Counted quantity an adjustment reconciled to; None for movement lines
    pub counted_quantity: Option<i64>,
}

/// A movement document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub id: Uuid,
    /// Unique human-readable reference (e.g., "WH/IN/0001")
    pub reference: String,
    pub op_type: OperationType,
    pub status: OperationStatus,
    /// Counterparty label for receipts/deliveries, reason for adjustments
    pub partner: Option<String>,
    pub responsible: Option<String>,
    pub source_location_id: Option<Uuid>,
    pub dest_location_id: Option<Uuid>,
    pub lines: Vec<OperationLine>,
    pub scheduled_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
