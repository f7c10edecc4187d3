//! Business logic services for the reagent stockroom

pub mod catalog;
pub mod inventory;
pub mod report;
pub mod supplier;

pub use catalog::CatalogService;
pub use inventory::InventoryService;
pub use supplier::SupplierService;
