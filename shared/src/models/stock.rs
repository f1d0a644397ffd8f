//! Stock ledger models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ledgered balance of one product at one internal location
///
/// Created lazily on first movement into a location; never deleted, may
/// sit at zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockQuant {
    pub id: Uuid,
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
