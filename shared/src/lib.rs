//! Shared types and domain logic for the Warehouse Management Platform
//!
//! This crate contains the domain models and the pure stock-ledger logic
//! shared between the backend service and its tests.

pub mod ledger;
pub mod models;
pub mod types;
pub mod validation;

pub use ledger::*;
pub use models::*;
pub use types::*;
pub use validation::*;
