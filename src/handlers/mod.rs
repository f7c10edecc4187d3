//! HTTP handlers: thin adapters between axum and the services

pub mod health;
pub mod movements;
pub mod reagents;
pub mod reports;
pub mod suppliers;

pub use health::health_check;
pub use movements::{
    csv_template, import_csv, list_recent_movements, record_inbound, record_outbound,
    search_movements,
};
pub use reagents::{
    deactivate_reagent, get_batch_history, get_reagent, get_reagent_movements,
    get_receiving_defaults, get_stock, list_reagents, low_stock_reagents, reagent_suggestions,
    register_reagent, update_reagent,
};
pub use reports::{receipt_pdf, stock_report_pdf};
pub use suppliers::{create_supplier, list_suppliers};
