//! Product catalog models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger;

/// A stocked item in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    /// Unique stock-keeping unit, normalized to upper-case
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    /// Unit of measure (e.g., "Units", "kg", "liters")
    pub uom: String,
    pub cost: Decimal,
    pub price: Decimal,
    /// Reorder threshold for the low-stock classification
    pub min_stock_rule: i64,
    /// Aggregate on-hand counter, mutated only on internal/external
    /// boundary crossings
    pub total_stock: i64,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn is_low_stock(&self) -> bool {
        ledger::is_low_stock(self.total_stock, self.min_stock_rule)
    }

    pub fn is_out_of_stock(&self) -> bool {
        ledger::is_out_of_stock(self.total_stock)
    }
}

/// Product lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Archived,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Archived => "archived",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ProductStatus::Active),
            "archived" => Some(ProductStatus::Archived),
            _ => None,
        }
    }
}

/// A product decorated with its forecasted stock level
#[derive(Debug, Clone, Serialize)]
pub struct ProductWithForecast {
    #[serde(flatten)]
    pub product: Product,
    /// Projected on-hand quantity assuming all draft receipts and
    /// deliveries commit
    pub forecasted: i64,
}
