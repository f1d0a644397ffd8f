//! Business logic services for the Warehouse Management Platform

pub mod dashboard;
pub mod operation;
pub mod product;
pub mod stock;
pub mod warehouse;

pub use dashboard::DashboardService;
pub use operation::OperationService;
pub use product::ProductService;
pub use stock::StockService;
pub use warehouse::WarehouseService;
