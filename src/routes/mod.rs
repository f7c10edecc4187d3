//! Route definitions for the reagent stockroom service

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Reagent catalog
        .nest("/reagents", reagent_routes())
        // Movement ledger
        .nest("/movements", movement_routes())
        // Supplier directory
        .nest("/suppliers", supplier_routes())
        // PDF downloads
        .nest("/reports", report_routes())
}

/// Reagent catalog routes
fn reagent_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_reagents).post(handlers::register_reagent),
        )
        .route("/suggestions", get(handlers::reagent_suggestions))
        .route("/low-stock", get(handlers::low_stock_reagents))
        .route(
            "/:reagent_id",
            get(handlers::get_reagent)
                .put(handlers::update_reagent)
                .delete(handlers::deactivate_reagent),
        )
        .route("/:reagent_id/stock", get(handlers::get_stock))
        .route("/:reagent_id/movements", get(handlers::get_reagent_movements))
        .route("/:reagent_id/batches", get(handlers::get_batch_history))
        .route("/:reagent_id/defaults", get(handlers::get_receiving_defaults))
}

/// Movement ledger routes
fn movement_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_recent_movements))
        .route("/in", post(handlers::record_inbound))
        .route("/out", post(handlers::record_outbound))
        .route("/search", get(handlers::search_movements))
        .route("/import", post(handlers::import_csv))
        .route("/template", get(handlers::csv_template))
}

/// Supplier directory routes
fn supplier_routes() -> Router<AppState> {
    Router::new().route(
        "/",
        get(handlers::list_suppliers).post(handlers::create_supplier),
    )
}

/// PDF download routes
fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/stock.pdf", get(handlers::stock_report_pdf))
        .route("/receipts/:movement_id", get(handlers::receipt_pdf))
}
