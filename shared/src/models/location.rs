//! Location models
//!
//! Locations come in two kinds: internal locations belong to a warehouse
//! and carry ledgered stock; external locations stand for vendors and
//! customers and are never ledgered.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A place goods can sit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: Uuid,
    pub name: String,
    pub kind: LocationKind,
    /// Set iff `kind` is internal
    pub warehouse_id: Option<Uuid>,
    pub address: Option<String>,
    pub status: LocationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Location {
    pub fn is_internal(&self) -> bool {
        self.kind == LocationKind::Internal
    }
}

/// Classification of a location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    /// Owned by a warehouse, subject to ledgering
    Internal,
    /// Vendor or customer side, never ledgered
    External,
}

impl LocationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationKind::Internal => "internal",
            LocationKind::External => "external",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "internal" => Some(LocationKind::Internal),
            "external" => Some(LocationKind::External),
            _ => None,
        }
    }
}

/// Location lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationStatus {
    Active,
    Archived,
}

impl LocationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationStatus::Active => "active",
            LocationStatus::Archived => "archived",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(LocationStatus::Active),
            "archived" => Some(LocationStatus::Archived),
            _ => None,
        }
    }
}
