//! Warehouse and location registry service

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Location, LocationKind, LocationStatus, Warehouse};
use shared::validation;

/// Service managing warehouses and the locations they own
#[derive(Clone)]
pub struct WarehouseService {
    db: PgPool,
}

/// Input for creating a warehouse
#[derive(Debug, Deserialize)]
pub struct CreateWarehouseInput {
    pub name: String,
    pub short_code: String,
    pub address: Option<String>,
}

/// Input for creating a location
#[derive(Debug, Deserialize)]
pub struct CreateLocationInput {
    pub name: String,
    pub kind: LocationKind,
    pub warehouse_id: Option<Uuid>,
    pub address: Option<String>,
}

/// Filter for listing locations
#[derive(Debug, Default, Deserialize)]
pub struct LocationFilter {
    pub warehouse_id: Option<Uuid>,
    pub kind: Option<LocationKind>,
}

type WarehouseTuple = (
    Uuid,
    String,
    String,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

fn warehouse_from_tuple(row: WarehouseTuple) -> Warehouse {
    Warehouse {
        id: row.0,
        name: row.1,
        short_code: row.2,
        address: row.3,
        created_at: row.4,
        updated_at: row.5,
    }
}

/// Row for location queries
#[derive(Debug, sqlx::FromRow)]
struct LocationRow {
    id: Uuid,
    name: String,
    kind: String,
    warehouse_id: Option<Uuid>,
    address: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LocationRow {
    fn into_location(self) -> AppResult<Location> {
        let kind = LocationKind::from_str(&self.kind).ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!("unknown location kind: {}", self.kind))
        })?;
        let status = LocationStatus::from_str(&self.status).ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!("unknown location status: {}", self.status))
        })?;
        Ok(Location {
            id: self.id,
            name: self.name,
            kind,
            warehouse_id: self.warehouse_id,
            address: self.address,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl WarehouseService {
    /// Create a new WarehouseService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a warehouse
    pub async fn create_warehouse(&self, input: CreateWarehouseInput) -> AppResult<Warehouse> {
        let short_code = input.short_code.trim().to_ascii_uppercase();
        if let Err(message) = validation::validate_short_code(&short_code) {
            return Err(AppError::Validation {
                field: "short_code".to_string(),
                message: message.to_string(),
            });
        }
        if input.name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Name must not be empty".to_string(),
            });
        }

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM warehouses WHERE short_code = $1)",
        )
        .bind(&short_code)
        .fetch_one(&self.db)
        .await?;

        if exists {
            return Err(AppError::DuplicateEntry("short_code".to_string()));
        }

        let row = sqlx::query_as::<_, WarehouseTuple>(
            r#"
            INSERT INTO warehouses (name, short_code, address)
            VALUES ($1, $2, $3)
            RETURNING id, name, short_code, address, created_at, updated_at
            "#,
        )
        .bind(input.name.trim())
        .bind(&short_code)
        .bind(&input.address)
        .fetch_one(&self.db)
        .await?;

        Ok(warehouse_from_tuple(row))
    }

    /// List all warehouses
    pub async fn list_warehouses(&self) -> AppResult<Vec<Warehouse>> {
        let rows = sqlx::query_as::<_, WarehouseTuple>(
            r#"
            SELECT id, name, short_code, address, created_at, updated_at
            FROM warehouses
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(warehouse_from_tuple).collect())
    }

    /// Idempotent bootstrap: ensure a default warehouse with one internal
    /// stock location exists, creating both on first call
    pub async fn initialize(&self) -> AppResult<Warehouse> {
        let existing = sqlx::query_as::<_, WarehouseTuple>(
            r#"
            SELECT id, name, short_code, address, created_at, updated_at
            FROM warehouses
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.db)
        .await?;

        if let Some(row) = existing {
            return Ok(warehouse_from_tuple(row));
        }

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, WarehouseTuple>(
            r#"
            INSERT INTO warehouses (name, short_code, address)
            VALUES ('Main Warehouse', 'WH01', 'Default warehouse location')
            RETURNING id, name, short_code, address, created_at, updated_at
            "#,
        )
        .fetch_one(&mut *tx)
        .await?;

        let warehouse = warehouse_from_tuple(row);

        sqlx::query(
            r#"
            INSERT INTO locations (name, kind, warehouse_id)
            VALUES ($1, 'internal', $2)
            "#,
        )
        .bind(format!("{}/Stock", warehouse.short_code))
        .bind(warehouse.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!("Initialized default warehouse {}", warehouse.short_code);
        Ok(warehouse)
    }

    /// Create a location
    ///
    /// Internal locations require a warehouse; external locations must not
    /// carry one.
    pub async fn create_location(&self, input: CreateLocationInput) -> AppResult<Location> {
        if input.name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Name must not be empty".to_string(),
            });
        }

        match input.kind {
            LocationKind::Internal => {
                let warehouse_id = input.warehouse_id.ok_or_else(|| AppError::Validation {
                    field: "warehouse_id".to_string(),
                    message: "Internal locations require a warehouse".to_string(),
                })?;

                let exists = sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS(SELECT 1 FROM warehouses WHERE id = $1)",
                )
                .bind(warehouse_id)
                .fetch_one(&self.db)
                .await?;

                if !exists {
                    return Err(AppError::NotFound("Warehouse".to_string()));
                }
            }
            LocationKind::External => {
                if input.warehouse_id.is_some() {
                    return Err(AppError::Validation {
                        field: "warehouse_id".to_string(),
                        message: "External locations must not reference a warehouse".to_string(),
                    });
                }
            }
        }

        let row = sqlx::query_as::<_, LocationRow>(
            r#"
            INSERT INTO locations (name, kind, warehouse_id, address)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, kind, warehouse_id, address, status, created_at, updated_at
            "#,
        )
        .bind(input.name.trim())
        .bind(input.kind.as_str())
        .bind(input.warehouse_id)
        .bind(&input.address)
        .fetch_one(&self.db)
        .await?;

        row.into_location()
    }

    /// Get a location by id
    pub async fn get_location(&self, location_id: Uuid) -> AppResult<Location> {
        let row = sqlx::query_as::<_, LocationRow>(
            r#"
            SELECT id, name, kind, warehouse_id, address, status, created_at, updated_at
            FROM locations
            WHERE id = $1
            "#,
        )
        .bind(location_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Location".to_string()))?;

        row.into_location()
    }

    /// List locations, optionally filtered by warehouse or kind
    pub async fn list_locations(&self, filter: LocationFilter) -> AppResult<Vec<Location>> {
        let rows = sqlx::query_as::<_, LocationRow>(
            r#"
            SELECT id, name, kind, warehouse_id, address, status, created_at, updated_at
            FROM locations
            WHERE ($1::uuid IS NULL OR warehouse_id = $1)
              AND ($2::text IS NULL OR kind = $2)
            ORDER BY name
            "#,
        )
        .bind(filter.warehouse_id)
        .bind(filter.kind.map(|k| k.as_str()))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(LocationRow::into_location).collect()
    }
}
