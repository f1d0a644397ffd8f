//! Domain models for the Warehouse Management Platform

mod location;
mod operation;
mod product;
mod stock;
mod warehouse;

pub use location::*;
pub use operation::*;
pub use product::*;
pub use stock::*;
pub use warehouse::*;
