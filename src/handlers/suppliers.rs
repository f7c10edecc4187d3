//! HTTP handlers for the supplier directory

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::models::{CreateSupplierInput, Supplier};
use crate::services::SupplierService;
use crate::AppState;

/// List all suppliers
pub async fn list_suppliers(State(state): State<AppState>) -> AppResult<Json<Vec<Supplier>>> {
    let service = SupplierService::new(state.db);
    let suppliers = service.list_suppliers().await?;
    Ok(Json(suppliers))
}

/// Add a supplier; adding an existing name returns the existing row
pub async fn create_supplier(
    State(state): State<AppState>,
    Json(input): Json<CreateSupplierInput>,
) -> AppResult<Json<Supplier>> {
    let service = SupplierService::new(state.db);
    let supplier = service.add_supplier(&input.name).await?;
    Ok(Json(supplier))
}
