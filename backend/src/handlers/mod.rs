//! HTTP handlers for the Warehouse Management Platform

pub mod dashboard;
pub mod health;
pub mod operation;
pub mod product;
pub mod stock;
pub mod warehouse;

pub use dashboard::*;
pub use health::*;
pub use operation::*;
pub use product::*;
pub use stock::*;
pub use warehouse::*;
