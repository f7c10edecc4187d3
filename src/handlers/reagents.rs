//! HTTP handlers for the reagent catalog

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::models::{
    BatchSummary, LowStockReagent, Reagent, ReagentFilter, ReceivingDefaults,
    RegisterReagentInput, StockLevel, StockMovement, UpdateReagentInput,
};
use crate::services::{CatalogService, InventoryService};
use crate::AppState;

#[derive(Deserialize)]
pub struct SuggestionQuery {
    pub q: Option<String>,
}

#[derive(Deserialize)]
pub struct DateRangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Register a new reagent
pub async fn register_reagent(
    State(state): State<AppState>,
    Json(input): Json<RegisterReagentInput>,
) -> AppResult<Json<Reagent>> {
    let service = CatalogService::new(state.db);
    let reagent = service.register_reagent(input).await?;
    Ok(Json(reagent))
}

/// List reagents matching a filter
pub async fn list_reagents(
    State(state): State<AppState>,
    Query(filter): Query<ReagentFilter>,
) -> AppResult<Json<Vec<Reagent>>> {
    let service = CatalogService::new(state.db);
    let reagents = service.list_reagents(&filter).await?;
    Ok(Json(reagents))
}

/// Get a single reagent
pub async fn get_reagent(
    State(state): State<AppState>,
    Path(reagent_id): Path<i64>,
) -> AppResult<Json<Reagent>> {
    let service = CatalogService::new(state.db);
    let reagent = service.get_reagent(reagent_id).await?;
    Ok(Json(reagent))
}

/// Edit a reagent
pub async fn update_reagent(
    State(state): State<AppState>,
    Path(reagent_id): Path<i64>,
    Json(input): Json<UpdateReagentInput>,
) -> AppResult<Json<Reagent>> {
    let service = CatalogService::new(state.db);
    let reagent = service.update_reagent(reagent_id, input).await?;
    Ok(Json(reagent))
}

/// Deactivate a reagent, keeping its movement history
pub async fn deactivate_reagent(
    State(state): State<AppState>,
    Path(reagent_id): Path<i64>,
) -> AppResult<Json<Reagent>> {
    let service = CatalogService::new(state.db);
    let reagent = service.deactivate_reagent(reagent_id).await?;
    Ok(Json(reagent))
}

/// Suggest reagent names for a partial query
pub async fn reagent_suggestions(
    State(state): State<AppState>,
    Query(query): Query<SuggestionQuery>,
) -> AppResult<Json<Vec<String>>> {
    let service = CatalogService::new(state.db);
    let suggestions = service
        .name_suggestions(query.q.as_deref().unwrap_or(""))
        .await?;
    Ok(Json(suggestions))
}

/// Reagents at or below their minimum-stock threshold
pub async fn low_stock_reagents(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<LowStockReagent>>> {
    let service = InventoryService::new(state.db);
    let reagents = service.low_stock_reagents().await?;
    Ok(Json(reagents))
}

/// Current on-hand quantity for a reagent
pub async fn get_stock(
    State(state): State<AppState>,
    Path(reagent_id): Path<i64>,
) -> AppResult<Json<StockLevel>> {
    let service = InventoryService::new(state.db);
    let on_hand = service.current_stock(reagent_id).await?;
    Ok(Json(StockLevel {
        reagent_id,
        on_hand,
    }))
}

/// Movement ledger for a reagent, optionally date-bounded
pub async fn get_reagent_movements(
    State(state): State<AppState>,
    Path(reagent_id): Path<i64>,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Json<Vec<StockMovement>>> {
    let service = InventoryService::new(state.db);
    let from = query.from.and_then(|s| s.parse().ok());
    let to = query.to.and_then(|s| s.parse().ok());
    let movements = service.list_movements(reagent_id, from, to).await?;
    Ok(Json(movements))
}

/// Distinct batches received for a reagent
pub async fn get_batch_history(
    State(state): State<AppState>,
    Path(reagent_id): Path<i64>,
) -> AppResult<Json<Vec<BatchSummary>>> {
    let service = InventoryService::new(state.db);
    let batches = service.batch_history(reagent_id).await?;
    Ok(Json(batches))
}

/// Form pre-fill data from past inbound movements
pub async fn get_receiving_defaults(
    State(state): State<AppState>,
    Path(reagent_id): Path<i64>,
) -> AppResult<Json<ReceivingDefaults>> {
    let service = CatalogService::new(state.db);
    let defaults = service.receiving_defaults(reagent_id).await?;
    Ok(Json(defaults))
}
